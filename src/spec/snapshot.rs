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

//! Snapshots, references and history logs

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the branch that tracks the current snapshot
pub const MAIN_BRANCH: &str = "main";

/// Operation that produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Only data files were added
    #[default]
    Append,
    /// Files were rewritten without changing table data
    Replace,
    /// Data files were added and removed
    Overwrite,
    /// Data files were removed
    Delete,
}

/// Snapshot summary: the operation plus free-form counters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Operation type
    pub operation: Operation,
    /// Other summary properties
    #[serde(flatten)]
    pub additional_properties: HashMap<String, String>,
}

/// Immutable view of the table at one commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot ID
    #[serde(rename = "snapshot-id")]
    pub snapshot_id: i64,
    /// Parent snapshot ID
    #[serde(
        rename = "parent-snapshot-id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_snapshot_id: Option<i64>,
    /// Sequence number of the commit, 0 for format v1 tables
    #[serde(rename = "sequence-number", default)]
    pub sequence_number: i64,
    /// Commit time in milliseconds since epoch
    #[serde(rename = "timestamp-ms")]
    pub timestamp_ms: i64,
    /// Location of the manifest list
    #[serde(rename = "manifest-list")]
    pub manifest_list: String,
    /// Snapshot summary
    pub summary: Summary,
    /// Schema active when the snapshot was committed
    #[serde(rename = "schema-id", default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<i32>,
}

/// Snapshot as written by format v1 documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SnapshotV1 {
    #[serde(rename = "snapshot-id")]
    pub snapshot_id: i64,
    #[serde(
        rename = "parent-snapshot-id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_snapshot_id: Option<i64>,
    #[serde(rename = "timestamp-ms")]
    pub timestamp_ms: i64,
    #[serde(
        rename = "manifest-list",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub manifest_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifests: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(rename = "schema-id", default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<i32>,
}

impl TryFrom<SnapshotV1> for Snapshot {
    type Error = Error;

    fn try_from(v1: SnapshotV1) -> Result<Snapshot> {
        let manifest_list = match (v1.manifest_list, v1.manifests) {
            (Some(list), _) => list,
            (None, Some(_)) => {
                return Err(Error::metadata_corrupt(format!(
                    "snapshot {}: inline manifest lists are not supported",
                    v1.snapshot_id
                )));
            }
            (None, None) => {
                return Err(Error::metadata_corrupt(format!(
                    "snapshot {}: missing manifest-list",
                    v1.snapshot_id
                )));
            }
        };
        Ok(Snapshot {
            snapshot_id: v1.snapshot_id,
            parent_snapshot_id: v1.parent_snapshot_id,
            sequence_number: 0,
            timestamp_ms: v1.timestamp_ms,
            manifest_list,
            summary: v1.summary.unwrap_or_default(),
            schema_id: v1.schema_id,
        })
    }
}

impl From<&Snapshot> for SnapshotV1 {
    fn from(snapshot: &Snapshot) -> Self {
        SnapshotV1 {
            snapshot_id: snapshot.snapshot_id,
            parent_snapshot_id: snapshot.parent_snapshot_id,
            timestamp_ms: snapshot.timestamp_ms,
            manifest_list: Some(snapshot.manifest_list.clone()),
            manifests: None,
            summary: Some(snapshot.summary.clone()),
            schema_id: snapshot.schema_id,
        }
    }
}

/// Retention policy of a named reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SnapshotRetention {
    /// Mutable branch
    Branch {
        /// Minimum snapshots to keep on this branch
        #[serde(
            rename = "min-snapshots-to-keep",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        min_snapshots_to_keep: Option<i32>,
        /// Maximum snapshot age on this branch
        #[serde(
            rename = "max-snapshot-age-ms",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        max_snapshot_age_ms: Option<i64>,
        /// Maximum age of the reference itself
        #[serde(
            rename = "max-ref-age-ms",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        max_ref_age_ms: Option<i64>,
    },
    /// Immutable tag
    Tag {
        /// Maximum age of the reference itself
        #[serde(
            rename = "max-ref-age-ms",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        max_ref_age_ms: Option<i64>,
    },
}

/// Named branch or tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotReference {
    /// Snapshot the reference points to
    #[serde(rename = "snapshot-id")]
    pub snapshot_id: i64,
    /// Branch or tag retention
    #[serde(flatten)]
    pub retention: SnapshotRetention,
}

impl SnapshotReference {
    /// Whether the reference is a branch
    pub fn is_branch(&self) -> bool {
        matches!(self.retention, SnapshotRetention::Branch { .. })
    }
}

/// Entry of the snapshot log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLog {
    /// Snapshot that became current
    #[serde(rename = "snapshot-id")]
    pub snapshot_id: i64,
    /// When it became current
    #[serde(rename = "timestamp-ms")]
    pub timestamp_ms: i64,
}

/// Entry of the metadata log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataLog {
    /// Location of a previous metadata document
    #[serde(rename = "metadata-file")]
    pub metadata_file: String,
    /// When it was replaced
    #[serde(rename = "timestamp-ms")]
    pub timestamp_ms: i64,
}
