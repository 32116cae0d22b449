// MinIO Rust Library for Amazon S3 Compatible Cloud Storage
// Copyright 2025 MinIO, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Snapshot selection and lineage walks

use crate::error::{Error, Result};
use crate::spec::snapshot::{MAIN_BRANCH, Snapshot};
use crate::spec::table_metadata::TableMetadata;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Which snapshot a scan reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SnapshotSelector {
    /// The table's current snapshot
    #[default]
    Current,
    /// A snapshot by id
    Id(i64),
    /// The latest ancestor of the current snapshot committed at or before
    /// this time, in milliseconds since epoch
    AsOfTimestamp(i64),
    /// The snapshot a branch or tag points to
    Ref(String),
}

impl fmt::Display for SnapshotSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotSelector::Current => write!(f, "current snapshot"),
            SnapshotSelector::Id(id) => write!(f, "snapshot id {id}"),
            SnapshotSelector::AsOfTimestamp(ts) => write!(f, "snapshot as of {ts} ms"),
            SnapshotSelector::Ref(name) => write!(f, "reference '{name}'"),
        }
    }
}

impl SnapshotSelector {
    /// Resolves the selector against loaded metadata
    ///
    /// Fails with `SnapshotNotFound` when nothing matches and with
    /// `MetadataCorrupt` when the parent chain loops.
    pub fn resolve(&self, metadata: &TableMetadata) -> Result<Arc<Snapshot>> {
        let not_found = || Error::SnapshotNotFound {
            selector: self.to_string(),
        };
        let snapshot = match self {
            SnapshotSelector::Current => metadata.current_snapshot().cloned(),
            SnapshotSelector::Id(id) => metadata.snapshot_by_id(*id).cloned(),
            SnapshotSelector::AsOfTimestamp(ts) => {
                let Some(current) = metadata.current_snapshot_id() else {
                    return Err(not_found());
                };
                let lineage = SnapshotLineage::new(metadata);
                let mut found = None;
                for id in lineage.ancestors_of(current) {
                    let id = id?;
                    match metadata.snapshot_by_id(id) {
                        Some(s) if s.timestamp_ms <= *ts => {
                            found = Some(s.clone());
                            break;
                        }
                        _ => {}
                    }
                }
                found
            }
            SnapshotSelector::Ref(name) => {
                let id = match metadata.refs().get(name) {
                    Some(reference) => Some(reference.snapshot_id),
                    None if name == MAIN_BRANCH => metadata.current_snapshot_id(),
                    None => None,
                };
                id.and_then(|id| metadata.snapshot_by_id(id)).cloned()
            }
        };
        let snapshot = snapshot.ok_or_else(not_found)?;
        log::debug!("{self} resolved to snapshot {}", snapshot.snapshot_id);
        Ok(snapshot)
    }
}

/// Parent links of every snapshot in a table
///
/// Ancestors that were expired from the metadata end the walk; a loop in
/// the parent chain is reported as `MetadataCorrupt`.
#[derive(Debug, Clone)]
pub struct SnapshotLineage {
    parents: HashMap<i64, Option<i64>>,
}

impl SnapshotLineage {
    pub fn new(metadata: &TableMetadata) -> Self {
        let parents = metadata
            .snapshots()
            .map(|s| (s.snapshot_id, s.parent_snapshot_id))
            .collect();
        SnapshotLineage { parents }
    }

    pub fn parent_of(&self, snapshot_id: i64) -> Option<i64> {
        self.parents.get(&snapshot_id).copied().flatten()
    }

    /// Walks from `snapshot_id` (inclusive) to the oldest known ancestor
    pub fn ancestors_of(&self, snapshot_id: i64) -> Ancestors<'_> {
        Ancestors {
            lineage: self,
            next: self.parents.contains_key(&snapshot_id).then_some(snapshot_id),
            seen: HashSet::new(),
        }
    }

    /// Whether `ancestor` is `snapshot_id` or one of its ancestors
    pub fn is_ancestor_of(&self, ancestor: i64, snapshot_id: i64) -> Result<bool> {
        for id in self.ancestors_of(snapshot_id) {
            if id? == ancestor {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Iterator over a snapshot and its ancestors, newest first
#[derive(Debug)]
pub struct Ancestors<'a> {
    lineage: &'a SnapshotLineage,
    next: Option<i64>,
    seen: HashSet<i64>,
}

impl Iterator for Ancestors<'_> {
    type Item = Result<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        if !self.seen.insert(id) {
            return Some(Err(Error::metadata_corrupt(format!(
                "snapshot {id} is its own ancestor"
            ))));
        }
        self.next = self
            .lineage
            .parent_of(id)
            .filter(|parent| self.lineage.parents.contains_key(parent));
        Some(Ok(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(id: i64, parent: Option<i64>, ts: i64) -> serde_json::Value {
        let mut s = json!({
            "snapshot-id": id,
            "sequence-number": id,
            "timestamp-ms": ts,
            "manifest-list": format!("mem://t/snap-{id}.avro"),
            "summary": {"operation": "append"}
        });
        if let Some(parent) = parent {
            s["parent-snapshot-id"] = json!(parent);
        }
        s
    }

    fn metadata(snapshots: Vec<serde_json::Value>, current: i64) -> TableMetadata {
        let doc = json!({
            "format-version": 2,
            "table-uuid": "9c12d441-03fe-4693-9a96-a0705ddf69c1",
            "location": "mem://t",
            "last-sequence-number": 10,
            "last-updated-ms": 1,
            "last-column-id": 1,
            "current-schema-id": 0,
            "schemas": [{"type": "struct", "schema-id": 0, "fields": [
                {"id": 1, "name": "x", "required": false, "type": "int"}
            ]}],
            "default-spec-id": 0,
            "partition-specs": [{"spec-id": 0, "fields": []}],
            "last-partition-id": 999,
            "default-sort-order-id": 0,
            "sort-orders": [{"order-id": 0, "fields": []}],
            "current-snapshot-id": current,
            "snapshots": snapshots,
            "refs": {
                "audit": {"snapshot-id": 1, "type": "tag"}
            }
        });
        TableMetadata::from_json_slice(&serde_json::to_vec(&doc).unwrap()).unwrap()
    }

    fn three_snapshots() -> TableMetadata {
        metadata(
            vec![
                snapshot(1, None, 1000),
                snapshot(2, Some(1), 2000),
                snapshot(3, Some(2), 3000),
            ],
            3,
        )
    }

    fn resolve(selector: SnapshotSelector, metadata: &TableMetadata) -> Result<i64> {
        selector.resolve(metadata).map(|s| s.snapshot_id)
    }

    #[test]
    fn test_resolve_current_and_id() {
        let m = three_snapshots();
        assert_eq!(resolve(SnapshotSelector::Current, &m).unwrap(), 3);
        assert_eq!(resolve(SnapshotSelector::Id(2), &m).unwrap(), 2);

        let err = resolve(SnapshotSelector::Id(999), &m).unwrap_err();
        assert!(matches!(err, Error::SnapshotNotFound { .. }));
        assert_eq!(err.to_string(), "snapshot not found: snapshot id 999");
    }

    #[test]
    fn test_resolve_as_of_timestamp() {
        let m = three_snapshots();
        assert_eq!(resolve(SnapshotSelector::AsOfTimestamp(2000), &m).unwrap(), 2);
        assert_eq!(resolve(SnapshotSelector::AsOfTimestamp(2999), &m).unwrap(), 2);
        assert_eq!(resolve(SnapshotSelector::AsOfTimestamp(i64::MAX), &m).unwrap(), 3);
        assert!(matches!(
            resolve(SnapshotSelector::AsOfTimestamp(999), &m),
            Err(Error::SnapshotNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_refs() {
        let m = three_snapshots();
        assert_eq!(resolve(SnapshotSelector::Ref("audit".into()), &m).unwrap(), 1);
        // main is implied by the current snapshot
        assert_eq!(resolve(SnapshotSelector::Ref("main".into()), &m).unwrap(), 3);
        assert!(matches!(
            resolve(SnapshotSelector::Ref("dev".into()), &m),
            Err(Error::SnapshotNotFound { .. })
        ));
    }

    #[test]
    fn test_lineage() {
        let m = three_snapshots();
        let lineage = SnapshotLineage::new(&m);
        let chain: Vec<i64> = lineage.ancestors_of(3).map(|r| r.unwrap()).collect();
        assert_eq!(chain, vec![3, 2, 1]);
        assert!(lineage.is_ancestor_of(1, 3).unwrap());
        assert!(!lineage.is_ancestor_of(3, 1).unwrap());
        assert_eq!(lineage.ancestors_of(42).count(), 0);
    }

    #[test]
    fn test_expired_parent_ends_walk() {
        let m = metadata(vec![snapshot(5, Some(4), 1000), snapshot(6, Some(5), 2000)], 6);
        let chain: Vec<i64> = SnapshotLineage::new(&m)
            .ancestors_of(6)
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(chain, vec![6, 5]);
    }

    #[test]
    fn test_parent_cycle_is_corrupt() {
        let m = metadata(
            vec![snapshot(1, Some(2), 1000), snapshot(2, Some(1), 2000)],
            2,
        );
        let err = resolve(SnapshotSelector::AsOfTimestamp(500), &m).unwrap_err();
        assert!(matches!(err, Error::MetadataCorrupt { .. }));
    }
}
