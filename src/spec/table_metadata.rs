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

//! Table metadata documents
//!
//! [`TableMetadata::from_json_slice`] parses a root metadata document of
//! format version 1 or 2 into one normalized, immutable model and checks
//! that its ids reference each other consistently. [`TableMetadata::to_json`]
//! writes it back in the document's own format version; parsing that output
//! yields an identical value.
//!
//! # References
//!
//! - [Table Metadata](https://iceberg.apache.org/spec/#table-metadata)

use crate::error::{Error, Result};
use crate::spec::datatypes::StructType;
use crate::spec::partition::{PARTITION_DATA_ID_START, PartitionFieldV1, PartitionSpec};
use crate::spec::schema::Schema;
use crate::spec::snapshot::{
    MetadataLog, Snapshot, SnapshotLog, SnapshotReference, SnapshotV1,
};
use crate::spec::sort::SortOrder;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Table properties map
pub type Properties = HashMap<String, String>;

/// Table format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatVersion {
    /// Analytic data tables
    V1 = 1,
    /// Row-level deletes
    V2 = 2,
}

impl FormatVersion {
    /// Highest format version this crate reads
    pub const MAX_SUPPORTED: u8 = 2;

    /// Maps a version number found in a document or manifest
    pub fn try_from_number(version: i64) -> Result<FormatVersion> {
        match version {
            1 => Ok(FormatVersion::V1),
            2 => Ok(FormatVersion::V2),
            v if v > i64::from(Self::MAX_SUPPORTED) => Err(Error::UnsupportedVersion {
                version: v,
                supported: Self::MAX_SUPPORTED,
            }),
            v => Err(Error::metadata_corrupt(format!(
                "invalid format-version {v}"
            ))),
        }
    }
}

/// Parsed table metadata
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    format_version: FormatVersion,
    table_uuid: Option<Uuid>,
    location: String,
    last_sequence_number: i64,
    last_updated_ms: i64,
    last_column_id: i32,
    schemas: BTreeMap<i32, Arc<Schema>>,
    current_schema: Arc<Schema>,
    partition_specs: BTreeMap<i32, Arc<PartitionSpec>>,
    default_spec_id: i32,
    last_partition_id: i32,
    properties: Properties,
    current_snapshot_id: Option<i64>,
    snapshots: Vec<Arc<Snapshot>>,
    snapshot_index: HashMap<i64, usize>,
    snapshot_log: Vec<SnapshotLog>,
    metadata_log: Vec<MetadataLog>,
    sort_orders: BTreeMap<i64, Arc<SortOrder>>,
    default_sort_order_id: i64,
    refs: HashMap<String, SnapshotReference>,
}

impl TableMetadata {
    /// Parses and validates a metadata document
    ///
    /// Fails with `UnsupportedVersion` for format versions above 2 and with
    /// `MetadataCorrupt` for anything structurally wrong.
    pub fn from_json_slice(bytes: &[u8]) -> Result<TableMetadata> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let version = value
            .get("format-version")
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| Error::metadata_corrupt("missing or non-integer format-version"))?;

        let metadata = match FormatVersion::try_from_number(version)? {
            FormatVersion::V1 => {
                TableMetadata::try_from(serde_json::from_value::<TableMetadataV1>(value)?)?
            }
            FormatVersion::V2 => {
                TableMetadata::try_from(serde_json::from_value::<TableMetadataV2>(value)?)?
            }
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Parses a metadata document read from `location`
    pub fn from_json_slice_at(bytes: &[u8], location: &str) -> Result<TableMetadata> {
        Self::from_json_slice(bytes).map_err(|e| e.with_location(location))
    }

    /// Serializes the document in its own format version
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(Error::from)
    }

    fn validate(&self) -> Result<()> {
        if !self.partition_specs.contains_key(&self.default_spec_id) {
            return Err(Error::metadata_corrupt(format!(
                "default-spec-id {} does not match any partition spec",
                self.default_spec_id
            )));
        }
        if !self.sort_orders.is_empty() && !self.sort_orders.contains_key(&self.default_sort_order_id)
        {
            return Err(Error::metadata_corrupt(format!(
                "default-sort-order-id {} does not match any sort order",
                self.default_sort_order_id
            )));
        }
        for snapshot in &self.snapshots {
            if let Some(schema_id) = snapshot.schema_id {
                if !self.schemas.contains_key(&schema_id) {
                    return Err(Error::metadata_corrupt(format!(
                        "snapshot {} references unknown schema {schema_id}",
                        snapshot.snapshot_id
                    )));
                }
            }
        }
        if let Some(id) = self.current_snapshot_id {
            if !self.snapshot_index.contains_key(&id) {
                return Err(Error::metadata_corrupt(format!(
                    "current-snapshot-id {id} does not match any snapshot"
                )));
            }
        }
        for (name, reference) in &self.refs {
            if !self.snapshot_index.contains_key(&reference.snapshot_id) {
                return Err(Error::metadata_corrupt(format!(
                    "ref '{name}' points to unknown snapshot {}",
                    reference.snapshot_id
                )));
            }
        }

        let data_ids: HashSet<i32> = self.schemas.values().flat_map(|s| s.field_ids()).collect();
        for spec in self.partition_specs.values() {
            if let Some(field) = spec.fields.iter().find(|f| data_ids.contains(&f.field_id)) {
                return Err(Error::metadata_corrupt(format!(
                    "partition field '{}' reuses data field id {}",
                    field.name, field.field_id
                )));
            }
        }
        Ok(())
    }

    /// Format version of the document
    pub fn format_version(&self) -> FormatVersion {
        self.format_version
    }

    /// Table UUID; optional in format v1
    pub fn table_uuid(&self) -> Option<Uuid> {
        self.table_uuid
    }

    /// Table base location
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Highest assigned sequence number
    pub fn last_sequence_number(&self) -> i64 {
        self.last_sequence_number
    }

    /// Last update time in milliseconds since epoch
    pub fn last_updated_ms(&self) -> i64 {
        self.last_updated_ms
    }

    /// Highest assigned column id
    pub fn last_column_id(&self) -> i32 {
        self.last_column_id
    }

    /// Highest assigned partition field id
    pub fn last_partition_id(&self) -> i32 {
        self.last_partition_id
    }

    /// All schema versions, ordered by id
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }

    /// Schema by id
    pub fn schema_by_id(&self, schema_id: i32) -> Option<&Arc<Schema>> {
        self.schemas.get(&schema_id)
    }

    /// Current schema
    pub fn current_schema(&self) -> &Arc<Schema> {
        &self.current_schema
    }

    /// Current schema id
    pub fn current_schema_id(&self) -> i32 {
        self.current_schema.schema_id()
    }

    /// Schema active when a snapshot was committed
    pub fn schema_for_snapshot(&self, snapshot: &Snapshot) -> &Arc<Schema> {
        snapshot
            .schema_id
            .and_then(|id| self.schemas.get(&id))
            .unwrap_or_else(|| self.current_schema())
    }

    /// All partition specs, ordered by id
    pub fn partition_specs(&self) -> impl Iterator<Item = &Arc<PartitionSpec>> {
        self.partition_specs.values()
    }

    /// Partition spec by id
    pub fn partition_spec_by_id(&self, spec_id: i32) -> Option<&Arc<PartitionSpec>> {
        self.partition_specs.get(&spec_id)
    }

    /// Default partition spec id
    pub fn default_spec_id(&self) -> i32 {
        self.default_spec_id
    }

    /// Partition tuple type of a spec
    ///
    /// Source columns resolve against the current schema first and then
    /// older schemas, newest first, so specs over dropped columns still type.
    pub fn partition_type(&self, spec_id: i32) -> Result<StructType> {
        let spec = self.partition_spec_by_id(spec_id).ok_or_else(|| {
            Error::metadata_corrupt(format!("unknown partition spec {spec_id}"))
        })?;
        let current: &Schema = self.current_schema();
        let older = self
            .schemas
            .values()
            .rev()
            .map(Arc::as_ref)
            .filter(|s| s.schema_id() != current.schema_id());
        spec.partition_type(std::iter::once(current).chain(older))
    }

    /// Table properties
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Current snapshot id, if the table has one
    pub fn current_snapshot_id(&self) -> Option<i64> {
        self.current_snapshot_id
    }

    /// Current snapshot, if the table has one
    pub fn current_snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.current_snapshot_id
            .and_then(|id| self.snapshot_by_id(id))
    }

    /// All snapshots in document order
    pub fn snapshots(&self) -> impl Iterator<Item = &Arc<Snapshot>> {
        self.snapshots.iter()
    }

    /// Snapshot by id
    pub fn snapshot_by_id(&self, snapshot_id: i64) -> Option<&Arc<Snapshot>> {
        self.snapshot_index
            .get(&snapshot_id)
            .map(|&pos| &self.snapshots[pos])
    }

    /// Named branches and tags
    pub fn refs(&self) -> &HashMap<String, SnapshotReference> {
        &self.refs
    }

    /// Snapshot log
    pub fn snapshot_log(&self) -> &[SnapshotLog] {
        &self.snapshot_log
    }

    /// Previous metadata documents
    pub fn metadata_log(&self) -> &[MetadataLog] {
        &self.metadata_log
    }

    /// All sort orders, ordered by id
    pub fn sort_orders(&self) -> impl Iterator<Item = &Arc<SortOrder>> {
        self.sort_orders.values()
    }

    /// Default sort order id
    pub fn default_sort_order_id(&self) -> i64 {
        self.default_sort_order_id
    }
}

impl Serialize for TableMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.format_version {
            FormatVersion::V1 => TableMetadataV1::from(self).serialize(serializer),
            FormatVersion::V2 => TableMetadataV2::from(self).serialize(serializer),
        }
    }
}

// ============================================================================
// Versioned document layouts
// ============================================================================

fn default_format_v1() -> i32 {
    1
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TableMetadataV2 {
    format_version: i32,
    table_uuid: Uuid,
    location: String,
    last_sequence_number: i64,
    last_updated_ms: i64,
    last_column_id: i32,
    schemas: Vec<Schema>,
    current_schema_id: i32,
    partition_specs: Vec<PartitionSpec>,
    default_spec_id: i32,
    last_partition_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    properties: Option<Properties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_snapshot_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    snapshots: Option<Vec<Snapshot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    snapshot_log: Option<Vec<SnapshotLog>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata_log: Option<Vec<MetadataLog>>,
    sort_orders: Vec<SortOrder>,
    default_sort_order_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refs: Option<HashMap<String, SnapshotReference>>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TableMetadataV1 {
    #[serde(default = "default_format_v1")]
    format_version: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    table_uuid: Option<Uuid>,
    location: String,
    last_updated_ms: i64,
    last_column_id: i32,
    schema: Schema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schemas: Option<Vec<Schema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_schema_id: Option<i32>,
    partition_spec: Vec<PartitionFieldV1>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    partition_specs: Option<Vec<PartitionSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_spec_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_partition_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    properties: Option<Properties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_snapshot_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    snapshots: Option<Vec<SnapshotV1>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    snapshot_log: Option<Vec<SnapshotLog>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata_log: Option<Vec<MetadataLog>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort_orders: Option<Vec<SortOrder>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_sort_order_id: Option<i64>,
}

/// Keys a list by id, rejecting duplicates
fn index_by<K: Ord + Copy + std::fmt::Display, V>(
    items: Vec<V>,
    kind: &str,
    key: impl Fn(&V) -> K,
) -> Result<BTreeMap<K, Arc<V>>> {
    let mut map = BTreeMap::new();
    for item in items {
        let id = key(&item);
        if map.insert(id, Arc::new(item)).is_some() {
            return Err(Error::metadata_corrupt(format!("duplicate {kind} id {id}")));
        }
    }
    Ok(map)
}

fn current_of(schemas: &BTreeMap<i32, Arc<Schema>>, current_schema_id: i32) -> Result<Arc<Schema>> {
    schemas.get(&current_schema_id).cloned().ok_or_else(|| {
        Error::metadata_corrupt(format!(
            "current-schema-id {current_schema_id} does not match any schema"
        ))
    })
}

fn index_snapshots(snapshots: &[Arc<Snapshot>]) -> Result<HashMap<i64, usize>> {
    let mut index = HashMap::with_capacity(snapshots.len());
    for (pos, snapshot) in snapshots.iter().enumerate() {
        if index.insert(snapshot.snapshot_id, pos).is_some() {
            return Err(Error::metadata_corrupt(format!(
                "duplicate snapshot id {}",
                snapshot.snapshot_id
            )));
        }
    }
    Ok(index)
}

/// Writers use -1 for "no current snapshot"
fn normalize_snapshot_id(id: Option<i64>) -> Option<i64> {
    id.filter(|id| *id != -1)
}

impl TryFrom<TableMetadataV2> for TableMetadata {
    type Error = Error;

    fn try_from(v2: TableMetadataV2) -> Result<TableMetadata> {
        let snapshots: Vec<Arc<Snapshot>> = v2
            .snapshots
            .unwrap_or_default()
            .into_iter()
            .map(Arc::new)
            .collect();
        let snapshot_index = index_snapshots(&snapshots)?;
        let sort_orders = index_by(v2.sort_orders, "sort order", |o| o.order_id)?;
        let schemas = index_by(v2.schemas, "schema", |s| s.schema_id())?;
        let current_schema = current_of(&schemas, v2.current_schema_id)?;

        Ok(TableMetadata {
            format_version: FormatVersion::V2,
            table_uuid: Some(v2.table_uuid),
            location: v2.location,
            last_sequence_number: v2.last_sequence_number,
            last_updated_ms: v2.last_updated_ms,
            last_column_id: v2.last_column_id,
            schemas,
            current_schema,
            partition_specs: index_by(v2.partition_specs, "partition spec", |s| s.spec_id)?,
            default_spec_id: v2.default_spec_id,
            last_partition_id: v2.last_partition_id,
            properties: v2.properties.unwrap_or_default(),
            current_snapshot_id: normalize_snapshot_id(v2.current_snapshot_id),
            snapshots,
            snapshot_index,
            snapshot_log: v2.snapshot_log.unwrap_or_default(),
            metadata_log: v2.metadata_log.unwrap_or_default(),
            sort_orders,
            default_sort_order_id: v2.default_sort_order_id,
            refs: v2.refs.unwrap_or_default(),
        })
    }
}

impl TryFrom<TableMetadataV1> for TableMetadata {
    type Error = Error;

    fn try_from(v1: TableMetadataV1) -> Result<TableMetadata> {
        let (schemas, current_schema_id) = match v1.schemas {
            Some(schemas) if !schemas.is_empty() => (
                schemas,
                v1.current_schema_id.unwrap_or(v1.schema.schema_id()),
            ),
            _ => {
                let id = v1.schema.schema_id();
                (vec![v1.schema], id)
            }
        };

        let (partition_specs, default_spec_id) = match v1.partition_specs {
            Some(specs) if !specs.is_empty() => (specs, v1.default_spec_id.unwrap_or(0)),
            _ => (
                vec![PartitionSpec {
                    spec_id: 0,
                    fields: PartitionFieldV1::into_fields(v1.partition_spec),
                }],
                0,
            ),
        };
        let last_partition_id = v1.last_partition_id.unwrap_or_else(|| {
            partition_specs
                .iter()
                .flat_map(|s| s.fields.iter().map(|f| f.field_id))
                .max()
                .unwrap_or(PARTITION_DATA_ID_START - 1)
        });

        let snapshots: Vec<Arc<Snapshot>> = v1
            .snapshots
            .unwrap_or_default()
            .into_iter()
            .map(|s| Snapshot::try_from(s).map(Arc::new))
            .collect::<Result<_>>()?;
        let snapshot_index = index_snapshots(&snapshots)?;

        let sort_orders = match v1.sort_orders {
            Some(orders) => index_by(orders, "sort order", |o| o.order_id)?,
            None => BTreeMap::new(),
        };
        let schemas = index_by(schemas, "schema", |s| s.schema_id())?;
        let current_schema = current_of(&schemas, current_schema_id)?;

        Ok(TableMetadata {
            format_version: FormatVersion::V1,
            table_uuid: v1.table_uuid,
            location: v1.location,
            last_sequence_number: 0,
            last_updated_ms: v1.last_updated_ms,
            last_column_id: v1.last_column_id,
            schemas,
            current_schema,
            partition_specs: index_by(partition_specs, "partition spec", |s| s.spec_id)?,
            default_spec_id,
            last_partition_id,
            properties: v1.properties.unwrap_or_default(),
            current_snapshot_id: normalize_snapshot_id(v1.current_snapshot_id),
            snapshots,
            snapshot_index,
            snapshot_log: v1.snapshot_log.unwrap_or_default(),
            metadata_log: v1.metadata_log.unwrap_or_default(),
            default_sort_order_id: v1
                .default_sort_order_id
                .unwrap_or(SortOrder::UNSORTED_ORDER_ID),
            sort_orders,
            refs: HashMap::new(),
        })
    }
}

fn unwrap_all<T: Clone>(items: impl Iterator<Item = Arc<T>>) -> Vec<T> {
    items.map(|item| T::clone(&item)).collect()
}

impl From<&TableMetadata> for TableMetadataV2 {
    fn from(m: &TableMetadata) -> Self {
        TableMetadataV2 {
            format_version: 2,
            table_uuid: m.table_uuid.unwrap_or_default(),
            location: m.location.clone(),
            last_sequence_number: m.last_sequence_number,
            last_updated_ms: m.last_updated_ms,
            last_column_id: m.last_column_id,
            schemas: unwrap_all(m.schemas.values().cloned()),
            current_schema_id: m.current_schema_id(),
            partition_specs: unwrap_all(m.partition_specs.values().cloned()),
            default_spec_id: m.default_spec_id,
            last_partition_id: m.last_partition_id,
            properties: Some(m.properties.clone()),
            current_snapshot_id: m.current_snapshot_id,
            snapshots: Some(unwrap_all(m.snapshots.iter().cloned())),
            snapshot_log: Some(m.snapshot_log.clone()),
            metadata_log: Some(m.metadata_log.clone()),
            sort_orders: unwrap_all(m.sort_orders.values().cloned()),
            default_sort_order_id: m.default_sort_order_id,
            refs: Some(m.refs.clone()),
        }
    }
}

impl From<&TableMetadata> for TableMetadataV1 {
    fn from(m: &TableMetadata) -> Self {
        let default_spec = m
            .partition_specs
            .get(&m.default_spec_id)
            .map(|spec| spec.fields.iter().map(PartitionFieldV1::from).collect())
            .unwrap_or_default();
        TableMetadataV1 {
            format_version: 1,
            table_uuid: m.table_uuid,
            location: m.location.clone(),
            last_updated_ms: m.last_updated_ms,
            last_column_id: m.last_column_id,
            schema: Schema::clone(m.current_schema()),
            schemas: Some(unwrap_all(m.schemas.values().cloned())),
            current_schema_id: Some(m.current_schema_id()),
            partition_spec: default_spec,
            partition_specs: Some(unwrap_all(m.partition_specs.values().cloned())),
            default_spec_id: Some(m.default_spec_id),
            last_partition_id: Some(m.last_partition_id),
            properties: Some(m.properties.clone()),
            current_snapshot_id: m.current_snapshot_id,
            snapshots: Some(m.snapshots.iter().map(|s| SnapshotV1::from(s.as_ref())).collect()),
            snapshot_log: Some(m.snapshot_log.clone()),
            metadata_log: Some(m.metadata_log.clone()),
            sort_orders: Some(unwrap_all(m.sort_orders.values().cloned())),
            default_sort_order_id: Some(m.default_sort_order_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::transform::Transform;
    use serde_json::json;

    fn v2_document() -> serde_json::Value {
        json!({
            "format-version": 2,
            "table-uuid": "9c12d441-03fe-4693-9a96-a0705ddf69c1",
            "location": "s3://bucket/test/location",
            "last-sequence-number": 34,
            "last-updated-ms": 1602638573590i64,
            "last-column-id": 3,
            "current-schema-id": 1,
            "schemas": [
                {"type": "struct", "schema-id": 0, "fields": [
                    {"id": 1, "name": "x", "required": true, "type": "long"}
                ]},
                {"type": "struct", "schema-id": 1, "identifier-field-ids": [1, 2], "fields": [
                    {"id": 1, "name": "x", "required": true, "type": "long"},
                    {"id": 2, "name": "y", "required": true, "type": "long", "doc": "comment"},
                    {"id": 3, "name": "z", "required": true, "type": "long"}
                ]}
            ],
            "default-spec-id": 0,
            "partition-specs": [
                {"spec-id": 0, "fields": [
                    {"name": "x", "transform": "identity", "source-id": 1, "field-id": 1000}
                ]}
            ],
            "last-partition-id": 1000,
            "default-sort-order-id": 3,
            "sort-orders": [
                {"order-id": 3, "fields": [
                    {"transform": "identity", "source-id": 2, "direction": "asc", "null-order": "nulls-first"},
                    {"transform": "bucket[4]", "source-id": 3, "direction": "desc", "null-order": "nulls-last"}
                ]}
            ],
            "properties": {"read.planning.concurrency": "4"},
            "current-snapshot-id": 3055729675574597004i64,
            "snapshots": [
                {
                    "snapshot-id": 3051729675574597004i64,
                    "timestamp-ms": 1515100955770i64,
                    "sequence-number": 0,
                    "summary": {"operation": "append"},
                    "manifest-list": "s3://a/b/1.avro"
                },
                {
                    "snapshot-id": 3055729675574597004i64,
                    "parent-snapshot-id": 3051729675574597004i64,
                    "timestamp-ms": 1555100955770i64,
                    "sequence-number": 1,
                    "summary": {"operation": "append"},
                    "manifest-list": "s3://a/b/2.avro",
                    "schema-id": 1
                }
            ],
            "snapshot-log": [
                {"snapshot-id": 3051729675574597004i64, "timestamp-ms": 1515100955770i64},
                {"snapshot-id": 3055729675574597004i64, "timestamp-ms": 1555100955770i64}
            ],
            "metadata-log": [],
            "refs": {
                "main": {"snapshot-id": 3055729675574597004i64, "type": "branch"},
                "audit": {"snapshot-id": 3051729675574597004i64, "type": "tag", "max-ref-age-ms": 1000}
            }
        })
    }

    fn parse(value: &serde_json::Value) -> Result<TableMetadata> {
        TableMetadata::from_json_slice(&serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn test_parse_v2() {
        let metadata = parse(&v2_document()).unwrap();
        assert_eq!(metadata.format_version(), FormatVersion::V2);
        assert_eq!(metadata.last_sequence_number(), 34);
        assert_eq!(metadata.current_schema().schema_id(), 1);
        assert_eq!(metadata.current_schema().fields().len(), 3);
        assert_eq!(
            metadata.current_snapshot().unwrap().manifest_list,
            "s3://a/b/2.avro"
        );
        assert_eq!(metadata.snapshots().count(), 2);
        assert_eq!(metadata.refs().len(), 2);
        assert_eq!(metadata.default_sort_order_id(), 3);
        assert_eq!(
            metadata.properties().get("read.planning.concurrency"),
            Some(&"4".to_string())
        );
        let spec = metadata.partition_spec_by_id(0).unwrap();
        assert_eq!(spec.fields[0].transform, Transform::Identity);
    }

    #[test]
    fn test_round_trip_v2() {
        let metadata = parse(&v2_document()).unwrap();
        let bytes = metadata.to_json().unwrap();
        let reparsed = TableMetadata::from_json_slice(&bytes).unwrap();
        assert_eq!(reparsed, metadata);
    }

    #[test]
    fn test_parse_v1_normalizes_schema_and_spec() {
        let doc = json!({
            "format-version": 1,
            "table-uuid": "d20125c8-7284-442c-9aea-15fee620737c",
            "location": "s3://bucket/test/location",
            "last-updated-ms": 1602638573874i64,
            "last-column-id": 3,
            "schema": {"type": "struct", "fields": [
                {"id": 1, "name": "x", "required": true, "type": "long"},
                {"id": 2, "name": "y", "required": true, "type": "long"},
                {"id": 3, "name": "z", "required": true, "type": "long"}
            ]},
            "partition-spec": [{"name": "x", "transform": "identity", "source-id": 1}],
            "properties": {},
            "current-snapshot-id": -1,
            "snapshots": []
        });
        let metadata = parse(&doc).unwrap();
        assert_eq!(metadata.format_version(), FormatVersion::V1);
        assert_eq!(metadata.current_schema_id(), 0);
        assert_eq!(metadata.current_snapshot_id(), None);
        assert_eq!(metadata.default_spec_id(), 0);
        assert_eq!(metadata.last_partition_id(), 1000);
        let spec = metadata.partition_spec_by_id(0).unwrap();
        assert_eq!(spec.fields[0].field_id, 1000);

        let reparsed = TableMetadata::from_json_slice(&metadata.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, metadata);
    }

    #[test]
    fn test_unsupported_version() {
        let mut doc = v2_document();
        doc["format-version"] = json!(3);
        match parse(&doc) {
            Err(Error::UnsupportedVersion { version, supported }) => {
                assert_eq!(version, 3);
                assert_eq!(supported, 2);
            }
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            TableMetadata::from_json_slice(b"{not json"),
            Err(Error::MetadataCorrupt { .. })
        ));

        let mut doc = v2_document();
        doc.as_object_mut().unwrap().remove("format-version");
        assert!(matches!(parse(&doc), Err(Error::MetadataCorrupt { .. })));

        let mut doc = v2_document();
        doc.as_object_mut().unwrap().remove("schemas");
        assert!(matches!(parse(&doc), Err(Error::MetadataCorrupt { .. })));
    }

    #[test]
    fn test_referential_integrity() {
        let cases: Vec<(&str, Box<dyn Fn(&mut serde_json::Value)>)> = vec![
            (
                "current schema",
                Box::new(|d| d["current-schema-id"] = json!(7)),
            ),
            ("default spec", Box::new(|d| d["default-spec-id"] = json!(5))),
            (
                "snapshot schema",
                Box::new(|d| d["snapshots"][1]["schema-id"] = json!(9)),
            ),
            (
                "current snapshot",
                Box::new(|d| d["current-snapshot-id"] = json!(42)),
            ),
            (
                "ref target",
                Box::new(|d| d["refs"]["audit"]["snapshot-id"] = json!(42)),
            ),
            (
                "partition field id",
                Box::new(|d| d["partition-specs"][0]["fields"][0]["field-id"] = json!(2)),
            ),
            (
                "duplicate schema",
                Box::new(|d| d["schemas"][0]["schema-id"] = json!(1)),
            ),
        ];
        for (name, mutate) in cases {
            let mut doc = v2_document();
            mutate(&mut doc);
            assert!(
                matches!(parse(&doc), Err(Error::MetadataCorrupt { .. })),
                "case '{name}' should be rejected"
            );
        }
    }

    #[test]
    fn test_error_carries_location() {
        let err = TableMetadata::from_json_slice_at(b"[]", "s3://t/v3.metadata.json").unwrap_err();
        assert!(
            err.to_string().contains("s3://t/v3.metadata.json"),
            "unexpected message: {err}"
        );
    }

    #[test]
    fn test_partition_type_uses_older_schemas() {
        let mut doc = v2_document();
        // Spec over field 4, present only in schema 0
        doc["schemas"][0]["fields"]
            .as_array_mut()
            .unwrap()
            .push(json!({"id": 4, "name": "old", "required": false, "type": "string"}));
        doc["partition-specs"]
            .as_array_mut()
            .unwrap()
            .push(json!({"spec-id": 1, "fields": [
                {"name": "old_trunc", "transform": "truncate[2]", "source-id": 4, "field-id": 1001}
            ]}));
        let metadata = parse(&doc).unwrap();
        let ty = metadata.partition_type(1).unwrap();
        assert_eq!(ty.fields[0].field_type.to_string(), "string");
    }
}
