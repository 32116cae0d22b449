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

//! Manifest lists
//!
//! One Avro file per snapshot, with one [`ManifestFile`] record per manifest.

use crate::error::{Error, Result};
use crate::spec::avro::{AvroFile, RecordLayout, RecordView};
use crate::spec::datatypes::PrimitiveType;
use crate::spec::table_metadata::FormatVersion;
use crate::spec::values::Datum;

mod field_ids {
    pub const MANIFEST_PATH: i32 = 500;
    pub const MANIFEST_LENGTH: i32 = 501;
    pub const PARTITION_SPEC_ID: i32 = 502;
    pub const ADDED_SNAPSHOT_ID: i32 = 503;
    pub const ADDED_FILES_COUNT: i32 = 504;
    pub const EXISTING_FILES_COUNT: i32 = 505;
    pub const DELETED_FILES_COUNT: i32 = 506;
    pub const PARTITIONS: i32 = 507;
    pub const CONTAINS_NULL: i32 = 509;
    pub const LOWER_BOUND: i32 = 510;
    pub const UPPER_BOUND: i32 = 511;
    pub const ADDED_ROWS_COUNT: i32 = 512;
    pub const EXISTING_ROWS_COUNT: i32 = 513;
    pub const DELETED_ROWS_COUNT: i32 = 514;
    pub const SEQUENCE_NUMBER: i32 = 515;
    pub const MIN_SEQUENCE_NUMBER: i32 = 516;
    pub const CONTENT: i32 = 517;
    pub const CONTAINS_NAN: i32 = 518;
    pub const KEY_METADATA: i32 = 519;
}

/// What a manifest tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestContentType {
    /// Data files
    Data,
    /// Position or equality delete files
    Deletes,
}

impl TryFrom<i32> for ManifestContentType {
    type Error = String;

    fn try_from(value: i32) -> std::result::Result<Self, String> {
        match value {
            0 => Ok(ManifestContentType::Data),
            1 => Ok(ManifestContentType::Deletes),
            other => Err(format!("unknown manifest content type {other}")),
        }
    }
}

/// Per-partition-field summary of a manifest's values
///
/// Bounds stay in their binary single-value form; they are typed lazily
/// against the partition type of the manifest's spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSummary {
    /// Whether any partition value is null
    pub contains_null: bool,
    /// Whether any partition value is NaN, when known
    pub contains_nan: Option<bool>,
    /// Encoded lower bound
    pub lower_bound: Option<Vec<u8>>,
    /// Encoded upper bound
    pub upper_bound: Option<Vec<u8>>,
}

impl FieldSummary {
    /// Lower bound typed as `ty`
    pub fn lower_bound(&self, ty: &PrimitiveType) -> Result<Option<Datum>> {
        self.lower_bound
            .as_deref()
            .map(|b| Datum::try_from_bytes(b, ty))
            .transpose()
    }

    /// Upper bound typed as `ty`
    pub fn upper_bound(&self, ty: &PrimitiveType) -> Result<Option<Datum>> {
        self.upper_bound
            .as_deref()
            .map(|b| Datum::try_from_bytes(b, ty))
            .transpose()
    }
}

/// Entry of a manifest list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    /// Location of the manifest file
    pub manifest_path: String,
    /// Length of the manifest file in bytes
    pub manifest_length: i64,
    /// Spec the manifest was written with
    pub partition_spec_id: i32,
    /// Data or deletes; always data in format v1
    pub content: ManifestContentType,
    /// Sequence number when the manifest was added; 0 in format v1
    pub sequence_number: i64,
    /// Lowest data sequence number of any live file; 0 in format v1
    pub min_sequence_number: i64,
    /// Snapshot that added the manifest
    pub added_snapshot_id: i64,
    /// Number of entries with status added
    pub added_files_count: Option<i32>,
    /// Number of entries with status existing
    pub existing_files_count: Option<i32>,
    /// Number of entries with status deleted
    pub deleted_files_count: Option<i32>,
    /// Rows in added files
    pub added_rows_count: Option<i64>,
    /// Rows in existing files
    pub existing_rows_count: Option<i64>,
    /// Rows in deleted files
    pub deleted_rows_count: Option<i64>,
    /// One summary per partition field of the spec
    pub partitions: Vec<FieldSummary>,
    /// Encryption key metadata
    pub key_metadata: Option<Vec<u8>>,
}

impl ManifestFile {
    /// Whether the manifest lists any added or existing files
    ///
    /// Unknown counts are assumed non-zero.
    pub fn has_live_files(&self) -> bool {
        self.added_files_count.is_none_or(|n| n > 0)
            || self.existing_files_count.is_none_or(|n| n > 0)
    }

    /// Whether the manifest records any deleted entries
    ///
    /// Unknown counts are assumed non-zero.
    pub fn has_deleted_files(&self) -> bool {
        self.deleted_files_count.is_none_or(|n| n > 0)
    }

    fn parse(view: &RecordView<'_>, version: FormatVersion) -> Result<ManifestFile> {
        use field_ids::*;
        let content = match view.opt_int(CONTENT)? {
            Some(raw) => ManifestContentType::try_from(raw)
                .map_err(|e| Error::manifest_corrupt(view.path(), e))?,
            None => ManifestContentType::Data,
        };
        let (sequence_number, min_sequence_number) = match version {
            FormatVersion::V1 => (
                view.opt_long(SEQUENCE_NUMBER)?.unwrap_or(0),
                view.opt_long(MIN_SEQUENCE_NUMBER)?.unwrap_or(0),
            ),
            FormatVersion::V2 => (view.long(SEQUENCE_NUMBER)?, view.long(MIN_SEQUENCE_NUMBER)?),
        };
        let partitions = view
            .records(PARTITIONS)?
            .iter()
            .map(|summary| {
                Ok(FieldSummary {
                    contains_null: summary.opt_bool(CONTAINS_NULL)?.unwrap_or(true),
                    contains_nan: summary.opt_bool(CONTAINS_NAN)?,
                    lower_bound: summary.opt_bytes(LOWER_BOUND)?.map(<[u8]>::to_vec),
                    upper_bound: summary.opt_bytes(UPPER_BOUND)?.map(<[u8]>::to_vec),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ManifestFile {
            manifest_path: view.string(MANIFEST_PATH)?.to_string(),
            manifest_length: view.long(MANIFEST_LENGTH)?,
            partition_spec_id: view.int(PARTITION_SPEC_ID)?,
            content,
            sequence_number,
            min_sequence_number,
            added_snapshot_id: view.long(ADDED_SNAPSHOT_ID)?,
            added_files_count: view.opt_int(ADDED_FILES_COUNT)?,
            existing_files_count: view.opt_int(EXISTING_FILES_COUNT)?,
            deleted_files_count: view.opt_int(DELETED_FILES_COUNT)?,
            added_rows_count: view.opt_long(ADDED_ROWS_COUNT)?,
            existing_rows_count: view.opt_long(EXISTING_ROWS_COUNT)?,
            deleted_rows_count: view.opt_long(DELETED_ROWS_COUNT)?,
            partitions,
            key_metadata: view.opt_bytes(KEY_METADATA)?.map(<[u8]>::to_vec),
        })
    }
}

/// Decoded manifest list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestList {
    entries: Vec<ManifestFile>,
}

impl ManifestList {
    /// Decodes a manifest list
    ///
    /// `table_version` is used when the file header does not carry a
    /// `format-version`.
    pub fn parse(bytes: &[u8], path: &str, table_version: FormatVersion) -> Result<ManifestList> {
        let file = AvroFile::read(bytes, path)?;
        let version = match file.metadata_str("format-version") {
            Some(raw) => {
                let number = raw.trim().parse::<i64>().map_err(|_| {
                    Error::manifest_corrupt(path, format!("invalid format-version '{raw}'"))
                })?;
                FormatVersion::try_from_number(number).map_err(|e| match e {
                    Error::UnsupportedVersion { .. } => e,
                    other => Error::manifest_corrupt(path, other.to_string()),
                })?
            }
            None => table_version,
        };
        let layout = RecordLayout::from_schema(&file.schema, path)?;
        let entries = file
            .records
            .iter()
            .map(|record| ManifestFile::parse(&layout.view(record, path)?, version))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("decoded manifest list {path}: {} manifests", entries.len());
        Ok(ManifestList { entries })
    }

    /// Manifests in list order
    pub fn entries(&self) -> &[ManifestFile] {
        &self.entries
    }

    /// Consumes the list
    pub fn into_entries(self) -> Vec<ManifestFile> {
        self.entries
    }
}
