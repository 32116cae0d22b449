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

//! Matching of delete files to data files
//!
//! Position deletes apply to data files of the same partition whose data
//! sequence number is less than or equal to the delete's. Equality deletes
//! apply only to strictly older data files, either in the same partition or,
//! when written under an unpartitioned spec, across the whole table.

use super::task::DeleteFileRef;
use crate::spec::datatypes::PrimitiveType;
use crate::spec::manifest::{DataContentType, DataFile, POSITION_DELETE_FILE_PATH_ID};
use crate::spec::partition::PartitionValues;
use crate::spec::values::{Datum, PrimitiveLiteral};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct IndexedDelete {
    file: DeleteFileRef,
    /// Range of data file paths a position delete can reference
    path_bounds: Option<(String, String)>,
}

impl IndexedDelete {
    fn applies_to(&self, data_sequence_number: i64, data_file_path: &str) -> bool {
        let seq = self.file.sequence_number;
        match self.file.content {
            DataContentType::PositionDeletes => {
                data_sequence_number <= seq
                    && self.path_bounds.as_ref().is_none_or(|(lo, hi)| {
                        lo.as_str() <= data_file_path && data_file_path <= hi.as_str()
                    })
            }
            DataContentType::EqualityDeletes => data_sequence_number < seq,
            DataContentType::Data => false,
        }
    }
}

/// Live delete files of one snapshot, by partition
#[derive(Debug, Default)]
pub(crate) struct DeleteFileIndex {
    by_partition: HashMap<(i32, PartitionValues), Vec<IndexedDelete>>,
    global: Vec<IndexedDelete>,
    len: usize,
}

impl DeleteFileIndex {
    /// Adds a live delete file
    ///
    /// `unpartitioned` tells whether the file's spec has no effective
    /// partition fields.
    pub(crate) fn add(&mut self, file: &DataFile, sequence_number: i64, unpartitioned: bool) {
        let indexed = IndexedDelete {
            file: DeleteFileRef::new(file, sequence_number),
            path_bounds: referenced_paths(file),
        };
        self.len += 1;
        if unpartitioned && file.content == DataContentType::EqualityDeletes {
            self.global.push(indexed);
        } else {
            self.by_partition
                .entry((file.spec_id, file.partition.clone()))
                .or_default()
                .push(indexed);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Delete files for a data file, ordered by sequence number then path
    pub(crate) fn for_data_file(
        &self,
        spec_id: i32,
        partition: &PartitionValues,
        file_path: &str,
        data_sequence_number: i64,
    ) -> Vec<DeleteFileRef> {
        if self.is_empty() {
            return Vec::new();
        }
        let local = self
            .by_partition
            .get(&(spec_id, partition.clone()))
            .into_iter()
            .flatten();
        let mut deletes: Vec<DeleteFileRef> = local
            .chain(self.global.iter())
            .filter(|d| d.applies_to(data_sequence_number, file_path))
            .map(|d| d.file.clone())
            .collect();
        deletes.sort_by(|a, b| {
            a.sequence_number
                .cmp(&b.sequence_number)
                .then_with(|| a.file_path.cmp(&b.file_path))
        });
        deletes
    }
}

// Position delete files record the referenced data file paths in column
// 2147483546; matching bounds narrow the files they can apply to.
fn referenced_paths(file: &DataFile) -> Option<(String, String)> {
    if file.content != DataContentType::PositionDeletes {
        return None;
    }
    let as_string = |bound: Option<Datum>| match bound.map(|d| d.literal().clone()) {
        Some(PrimitiveLiteral::String(s)) => Some(s),
        _ => None,
    };
    let lower = file
        .lower_bound(POSITION_DELETE_FILE_PATH_ID, &PrimitiveType::String)
        .ok()
        .flatten();
    let upper = file
        .upper_bound(POSITION_DELETE_FILE_PATH_ID, &PrimitiveType::String)
        .ok()
        .flatten();
    Some((as_string(lower)?, as_string(upper)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::manifest::DataFileFormat;

    fn file(path: &str, content: DataContentType, spec_id: i32, partition: i32) -> DataFile {
        DataFile {
            content,
            file_path: path.to_string(),
            file_format: DataFileFormat::Parquet,
            spec_id,
            partition: if spec_id == 0 {
                vec![Some(Datum::int(partition))]
            } else {
                Vec::new()
            },
            record_count: 1,
            file_size_in_bytes: 10,
            column_sizes: HashMap::new(),
            value_counts: HashMap::new(),
            null_value_counts: HashMap::new(),
            nan_value_counts: HashMap::new(),
            lower_bounds: HashMap::new(),
            upper_bounds: HashMap::new(),
            key_metadata: None,
            split_offsets: None,
            equality_ids: None,
            sort_order_id: None,
        }
    }

    fn paths(deletes: &[DeleteFileRef]) -> Vec<&str> {
        deletes.iter().map(|d| d.file_path.as_str()).collect()
    }

    fn lookup(index: &DeleteFileIndex, data: &DataFile, seq: i64) -> Vec<DeleteFileRef> {
        index.for_data_file(data.spec_id, &data.partition, &data.file_path, seq)
    }

    #[test]
    fn test_position_deletes_same_partition() {
        let mut index = DeleteFileIndex::default();
        index.add(&file("pos-p1", DataContentType::PositionDeletes, 0, 1), 5, false);
        index.add(&file("pos-p2", DataContentType::PositionDeletes, 0, 2), 5, false);

        let data = file("data-p1", DataContentType::Data, 0, 1);
        assert_eq!(paths(&lookup(&index, &data, 5)), vec!["pos-p1"]);
        assert_eq!(paths(&lookup(&index, &data, 4)), vec!["pos-p1"]);
        assert!(lookup(&index, &data, 6).is_empty());
    }

    #[test]
    fn test_equality_deletes_strictly_newer() {
        let mut index = DeleteFileIndex::default();
        index.add(&file("eq-p1", DataContentType::EqualityDeletes, 0, 1), 5, false);

        let data = file("data-p1", DataContentType::Data, 0, 1);
        assert!(lookup(&index, &data, 5).is_empty());
        assert_eq!(paths(&lookup(&index, &data, 4)), vec!["eq-p1"]);
    }

    #[test]
    fn test_global_equality_deletes() {
        let mut index = DeleteFileIndex::default();
        index.add(&file("eq-global", DataContentType::EqualityDeletes, 1, 0), 7, true);
        // position deletes from an unpartitioned spec stay scoped to it
        index.add(&file("pos-unpart", DataContentType::PositionDeletes, 1, 0), 7, true);
        index.add(&file("eq-p1", DataContentType::EqualityDeletes, 0, 1), 3, false);
        assert_eq!(index.len(), 3);

        let data = file("data-p1", DataContentType::Data, 0, 1);
        assert_eq!(
            paths(&lookup(&index, &data, 2)),
            vec!["eq-p1", "eq-global"]
        );
        let data = file("data-p2", DataContentType::Data, 0, 2);
        assert_eq!(paths(&lookup(&index, &data, 2)), vec!["eq-global"]);
    }

    #[test]
    fn test_position_delete_path_bounds() {
        let mut delete = file("pos-a", DataContentType::PositionDeletes, 0, 1);
        let bound = Datum::string("s3://b/data-a").to_bytes();
        delete.lower_bounds.insert(POSITION_DELETE_FILE_PATH_ID, bound.clone());
        delete.upper_bounds.insert(POSITION_DELETE_FILE_PATH_ID, bound);

        let mut index = DeleteFileIndex::default();
        index.add(&delete, 5, false);

        let a = file("s3://b/data-a", DataContentType::Data, 0, 1);
        let b = file("s3://b/data-b", DataContentType::Data, 0, 1);
        assert_eq!(paths(&lookup(&index, &a, 1)), vec!["pos-a"]);
        assert!(lookup(&index, &b, 1).is_empty());
    }

    #[test]
    fn test_ordering_by_sequence_then_path() {
        let mut index = DeleteFileIndex::default();
        index.add(&file("z-pos", DataContentType::PositionDeletes, 0, 1), 4, false);
        index.add(&file("b-pos", DataContentType::PositionDeletes, 0, 1), 9, false);
        index.add(&file("a-pos", DataContentType::PositionDeletes, 0, 1), 9, false);

        let data = file("data", DataContentType::Data, 0, 1);
        assert_eq!(
            paths(&lookup(&index, &data, 1)),
            vec!["z-pos", "a-pos", "b-pos"]
        );
    }
}
