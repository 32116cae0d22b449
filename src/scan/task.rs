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

//! Planning output
//!
//! Tasks serialize with kebab-case keys close to the REST catalog
//! `FileScanTask`; residuals use the REST expression JSON.

use super::projection::ProjectedSchema;
use crate::expr::BoundPredicate;
use crate::spec::manifest::{DataContentType, DataFile, DataFileFormat};
use crate::spec::partition::PartitionValues;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Delete file that applies to a data task
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeleteFileRef {
    pub file_path: String,
    pub file_format: DataFileFormat,
    /// Position or equality deletes
    pub content: DataContentType,
    pub record_count: i64,
    pub file_size_in_bytes: i64,
    /// Data sequence number of the delete file
    pub sequence_number: i64,
    /// Compared columns, for equality deletes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equality_ids: Option<Vec<i32>>,
}

impl DeleteFileRef {
    pub(crate) fn new(file: &DataFile, sequence_number: i64) -> Self {
        DeleteFileRef {
            file_path: file.file_path.clone(),
            file_format: file.file_format,
            content: file.content,
            record_count: file.record_count,
            file_size_in_bytes: file.file_size_in_bytes,
            sequence_number,
            equality_ids: file.equality_ids.clone(),
        }
    }
}

/// One data file to read
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileScanTask {
    pub file_path: String,
    pub file_format: DataFileFormat,
    /// Byte offset to start reading at
    pub start: u64,
    /// Bytes to read from `start`
    pub length: u64,
    pub record_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_offsets: Option<Vec<i64>>,
    pub spec_id: i32,
    /// Partition tuple, aligned with the fields of `spec_id`
    #[serde(rename = "partition")]
    pub partition_values: PartitionValues,
    pub data_sequence_number: i64,
    /// Shared by every task of a plan
    pub projected_schema: Arc<ProjectedSchema>,
    /// What is left of the filter after the file's partition is known
    #[serde(rename = "residual")]
    pub residual_predicate: BoundPredicate,
    /// Delete files to apply, by sequence number then path
    #[serde(rename = "delete-files")]
    pub deletes: Vec<DeleteFileRef>,
}

impl FileScanTask {
    pub(crate) fn new(
        file: &DataFile,
        data_sequence_number: i64,
        projected_schema: Arc<ProjectedSchema>,
        residual_predicate: BoundPredicate,
    ) -> Self {
        FileScanTask {
            file_path: file.file_path.clone(),
            file_format: file.file_format,
            start: 0,
            length: u64::try_from(file.file_size_in_bytes).unwrap_or(0),
            record_count: file.record_count,
            split_offsets: file.split_offsets.clone(),
            spec_id: file.spec_id,
            partition_values: file.partition.clone(),
            data_sequence_number,
            projected_schema,
            residual_predicate,
            deletes: Vec::new(),
        }
    }
}

/// File counts at each pruning level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PruningStats {
    /// Manifests in the snapshot's manifest list
    pub manifests_total: usize,
    /// Manifests skipped using partition summaries
    pub manifests_pruned: usize,
    /// Live data files in the manifests that were read
    pub files_total: usize,
    /// Data files skipped using partition values
    pub files_pruned_by_partition: usize,
    /// Data files skipped using column metrics
    pub files_pruned_by_metrics: usize,
    /// Live delete files considered for attachment
    pub delete_files: usize,
}

impl PruningStats {
    /// Data files that became tasks
    pub fn files_planned(&self) -> usize {
        self.files_total
            .saturating_sub(self.files_pruned_by_partition)
            .saturating_sub(self.files_pruned_by_metrics)
    }

    /// Calculate elimination percentage
    pub fn elimination_percentage(&self) -> f32 {
        if self.files_total == 0 {
            0.0
        } else {
            let eliminated = self.files_pruned_by_partition + self.files_pruned_by_metrics;
            (eliminated as f32 / self.files_total as f32) * 100.0
        }
    }
}

impl fmt::Display for PruningStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "manifests {}/{} read, files {}/{} planned ({} by partition, {} by metrics, {:.1}% eliminated), {} delete files",
            self.manifests_total - self.manifests_pruned.min(self.manifests_total),
            self.manifests_total,
            self.files_planned(),
            self.files_total,
            self.files_pruned_by_partition,
            self.files_pruned_by_metrics,
            self.elimination_percentage(),
            self.delete_files,
        )
    }
}

/// Result of planning a scan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScanPlan {
    /// Snapshot that was planned; `None` for a table without snapshots
    pub snapshot_id: Option<i64>,
    pub schema: Arc<ProjectedSchema>,
    /// Tasks in manifest-list order, then manifest entry order
    #[serde(rename = "file-scan-tasks")]
    pub tasks: Vec<FileScanTask>,
    #[serde(skip)]
    pub stats: PruningStats,
}

impl ScanPlan {
    pub(crate) fn empty(schema: Arc<ProjectedSchema>) -> Self {
        ScanPlan {
            snapshot_id: None,
            schema,
            tasks: Vec::new(),
            stats: PruningStats::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Paths of the planned data files, in task order
    pub fn file_paths(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.file_path.as_str())
    }

    /// Records across all tasks, before deletes
    pub fn total_records(&self) -> i64 {
        self.tasks.iter().map(|t| t.record_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::projection::ColumnSelection;
    use crate::spec::datatypes::{NestedField, PrimitiveType, Type};
    use crate::spec::schema::Schema;
    use crate::spec::values::Datum;
    use serde_json::json;

    #[test]
    fn test_pruning_stats() {
        let stats = PruningStats {
            manifests_total: 4,
            manifests_pruned: 1,
            files_total: 10,
            files_pruned_by_partition: 3,
            files_pruned_by_metrics: 2,
            delete_files: 0,
        };
        assert_eq!(stats.files_planned(), 5);
        assert_eq!(stats.elimination_percentage(), 50.0);
        assert_eq!(PruningStats::default().elimination_percentage(), 0.0);
        assert_eq!(
            stats.to_string(),
            "manifests 3/4 read, files 5/10 planned (3 by partition, 2 by metrics, 50.0% eliminated), 0 delete files"
        );
    }

    #[test]
    fn test_task_json() {
        let schema = Schema::try_new(
            0,
            vec![NestedField::optional(1, "x", Type::Primitive(PrimitiveType::Int))],
        )
        .unwrap();
        let projected =
            Arc::new(ProjectedSchema::resolve(&schema, &ColumnSelection::All, true).unwrap());
        let task = FileScanTask {
            file_path: "s3://b/t/data/a.parquet".into(),
            file_format: DataFileFormat::Parquet,
            start: 0,
            length: 1024,
            record_count: 10,
            split_offsets: None,
            spec_id: 0,
            partition_values: vec![Some(Datum::int(7)), None],
            data_sequence_number: 3,
            projected_schema: projected,
            residual_predicate: BoundPredicate::AlwaysTrue,
            deletes: vec![DeleteFileRef {
                file_path: "s3://b/t/data/d.parquet".into(),
                file_format: DataFileFormat::Parquet,
                content: DataContentType::EqualityDeletes,
                record_count: 1,
                file_size_in_bytes: 64,
                sequence_number: 4,
                equality_ids: Some(vec![1]),
            }],
        };

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["file-path"], "s3://b/t/data/a.parquet");
        assert_eq!(value["file-format"], "parquet");
        assert_eq!(value["partition"], json!([7, null]));
        assert_eq!(value["residual"], json!({"type": "true"}));
        assert_eq!(value["delete-files"][0]["content"], "equality-deletes");
        assert_eq!(value["delete-files"][0]["equality-ids"], json!([1]));
        assert!(value.get("split-offsets").is_none());
    }
}
