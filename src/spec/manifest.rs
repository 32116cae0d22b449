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

//! Manifest files
//!
//! A manifest is an Avro file of [`ManifestEntry`] records, each tracking one
//! data or delete file together with its partition tuple and column metrics.

use crate::error::{Error, Result};
use crate::spec::avro::{AvroFile, RecordLayout, RecordView, datum_from_avro};
use crate::spec::datatypes::{PrimitiveType, StructType};
use crate::spec::manifest_list::{ManifestContentType, ManifestFile};
use crate::spec::partition::{PartitionField, PartitionFieldV1, PartitionValues};
use crate::spec::schema::Schema;
use crate::spec::table_metadata::FormatVersion;
use crate::spec::values::Datum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

mod field_ids {
    pub const STATUS: i32 = 0;
    pub const SNAPSHOT_ID: i32 = 1;
    pub const DATA_FILE: i32 = 2;
    pub const SEQUENCE_NUMBER: i32 = 3;
    pub const FILE_SEQUENCE_NUMBER: i32 = 4;

    pub const FILE_PATH: i32 = 100;
    pub const FILE_FORMAT: i32 = 101;
    pub const PARTITION: i32 = 102;
    pub const RECORD_COUNT: i32 = 103;
    pub const FILE_SIZE_IN_BYTES: i32 = 104;
    pub const COLUMN_SIZES: i32 = 108;
    pub const COLUMN_SIZES_ENTRY: (i32, i32) = (117, 118);
    pub const VALUE_COUNTS: i32 = 109;
    pub const VALUE_COUNTS_ENTRY: (i32, i32) = (119, 120);
    pub const NULL_VALUE_COUNTS: i32 = 110;
    pub const NULL_VALUE_COUNTS_ENTRY: (i32, i32) = (121, 122);
    pub const LOWER_BOUNDS: i32 = 125;
    pub const LOWER_BOUNDS_ENTRY: (i32, i32) = (126, 127);
    pub const UPPER_BOUNDS: i32 = 128;
    pub const UPPER_BOUNDS_ENTRY: (i32, i32) = (129, 130);
    pub const KEY_METADATA: i32 = 131;
    pub const SPLIT_OFFSETS: i32 = 132;
    pub const CONTENT: i32 = 134;
    pub const EQUALITY_IDS: i32 = 135;
    pub const NAN_VALUE_COUNTS: i32 = 137;
    pub const NAN_VALUE_COUNTS_ENTRY: (i32, i32) = (138, 139);
    pub const SORT_ORDER_ID: i32 = 140;
}

/// Field id of the `file_path` column in position delete files
pub const POSITION_DELETE_FILE_PATH_ID: i32 = 2_147_483_546;

/// Lifecycle state of a manifest entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestStatus {
    /// Carried over from an earlier snapshot
    Existing = 0,
    /// Added by the manifest's snapshot
    Added = 1,
    /// Removed by the manifest's snapshot
    Deleted = 2,
}

impl TryFrom<i32> for ManifestStatus {
    type Error = String;

    fn try_from(value: i32) -> std::result::Result<Self, String> {
        match value {
            0 => Ok(ManifestStatus::Existing),
            1 => Ok(ManifestStatus::Added),
            2 => Ok(ManifestStatus::Deleted),
            other => Err(format!("unknown manifest entry status {other}")),
        }
    }
}

/// What a tracked file contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataContentType {
    /// Table rows
    Data,
    /// Deleted row positions
    PositionDeletes,
    /// Deleted row values
    EqualityDeletes,
}

impl TryFrom<i32> for DataContentType {
    type Error = String;

    fn try_from(value: i32) -> std::result::Result<Self, String> {
        match value {
            0 => Ok(DataContentType::Data),
            1 => Ok(DataContentType::PositionDeletes),
            2 => Ok(DataContentType::EqualityDeletes),
            other => Err(format!("unknown data file content {other}")),
        }
    }
}

/// Physical file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFileFormat {
    /// Apache Avro
    Avro,
    /// Apache ORC
    Orc,
    /// Apache Parquet
    Parquet,
}

impl FromStr for DataFileFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "avro" => Ok(DataFileFormat::Avro),
            "orc" => Ok(DataFileFormat::Orc),
            "parquet" => Ok(DataFileFormat::Parquet),
            _ => Err(format!("unknown file format '{s}'")),
        }
    }
}

impl fmt::Display for DataFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataFileFormat::Avro => "avro",
            DataFileFormat::Orc => "orc",
            DataFileFormat::Parquet => "parquet",
        })
    }
}

/// Data or delete file tracked by a manifest
#[derive(Debug, Clone, PartialEq)]
pub struct DataFile {
    /// Data, position deletes or equality deletes
    pub content: DataContentType,
    /// Full file location
    pub file_path: String,
    /// File format
    pub file_format: DataFileFormat,
    /// Partition spec the file was written with
    pub spec_id: i32,
    /// Partition tuple, aligned with the spec's fields
    pub partition: PartitionValues,
    /// Number of records
    pub record_count: i64,
    /// Size on storage
    pub file_size_in_bytes: i64,
    /// Bytes per column, by field id
    pub column_sizes: HashMap<i32, i64>,
    /// Values (including nulls) per column
    pub value_counts: HashMap<i32, i64>,
    /// Nulls per column
    pub null_value_counts: HashMap<i32, i64>,
    /// NaNs per floating point column
    pub nan_value_counts: HashMap<i32, i64>,
    /// Encoded lower bounds per column
    pub lower_bounds: HashMap<i32, Vec<u8>>,
    /// Encoded upper bounds per column
    pub upper_bounds: HashMap<i32, Vec<u8>>,
    /// Encryption key metadata
    pub key_metadata: Option<Vec<u8>>,
    /// Recommended split offsets, ascending
    pub split_offsets: Option<Vec<i64>>,
    /// Columns compared by an equality delete file
    pub equality_ids: Option<Vec<i32>>,
    /// Sort order the file was written with
    pub sort_order_id: Option<i32>,
}

impl DataFile {
    /// Lower bound of a column typed as `ty`
    pub fn lower_bound(&self, field_id: i32, ty: &PrimitiveType) -> Result<Option<Datum>> {
        decode_bound(self.lower_bounds.get(&field_id), ty)
    }

    /// Upper bound of a column typed as `ty`
    pub fn upper_bound(&self, field_id: i32, ty: &PrimitiveType) -> Result<Option<Datum>> {
        decode_bound(self.upper_bounds.get(&field_id), ty)
    }

    /// Whether this is a delete file
    pub fn is_delete(&self) -> bool {
        self.content != DataContentType::Data
    }

    fn parse(
        view: &RecordView<'_>,
        spec_id: i32,
        partition_type: &StructType,
    ) -> Result<DataFile> {
        use field_ids::*;
        let corrupt = |message: String| Error::manifest_corrupt(view.path(), message);

        let content = match view.opt_int(CONTENT)? {
            Some(raw) => DataContentType::try_from(raw).map_err(corrupt)?,
            None => DataContentType::Data,
        };
        let file_format = view
            .string(FILE_FORMAT)?
            .parse::<DataFileFormat>()
            .map_err(corrupt)?;
        let equality_ids = view
            .opt_longs(EQUALITY_IDS)?
            .map(|ids| {
                ids.into_iter()
                    .map(|id| {
                        i32::try_from(id).map_err(|_| corrupt(format!("invalid equality id {id}")))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        Ok(DataFile {
            content,
            file_path: view.string(FILE_PATH)?.to_string(),
            file_format,
            spec_id,
            partition: parse_partition(view, partition_type)?,
            record_count: view.long(RECORD_COUNT)?,
            file_size_in_bytes: view.long(FILE_SIZE_IN_BYTES)?,
            column_sizes: view.long_map(COLUMN_SIZES, COLUMN_SIZES_ENTRY)?,
            value_counts: view.long_map(VALUE_COUNTS, VALUE_COUNTS_ENTRY)?,
            null_value_counts: view.long_map(NULL_VALUE_COUNTS, NULL_VALUE_COUNTS_ENTRY)?,
            nan_value_counts: view.long_map(NAN_VALUE_COUNTS, NAN_VALUE_COUNTS_ENTRY)?,
            lower_bounds: view.bytes_map(LOWER_BOUNDS, LOWER_BOUNDS_ENTRY)?,
            upper_bounds: view.bytes_map(UPPER_BOUNDS, UPPER_BOUNDS_ENTRY)?,
            key_metadata: view.opt_bytes(KEY_METADATA)?.map(<[u8]>::to_vec),
            split_offsets: view.opt_longs(SPLIT_OFFSETS)?,
            equality_ids,
            sort_order_id: view.opt_int(SORT_ORDER_ID)?,
        })
    }
}

fn decode_bound(bytes: Option<&Vec<u8>>, ty: &PrimitiveType) -> Result<Option<Datum>> {
    bytes.map(|b| Datum::try_from_bytes(b, ty)).transpose()
}

/// Decodes the partition tuple by partition field id
fn parse_partition(view: &RecordView<'_>, partition_type: &StructType) -> Result<PartitionValues> {
    if partition_type.fields.is_empty() {
        return Ok(Vec::new());
    }
    let record = view.record(field_ids::PARTITION)?.ok_or_else(|| {
        Error::manifest_corrupt(view.path(), "data file has no partition tuple")
    })?;
    partition_type
        .fields
        .iter()
        .map(|field| {
            if !record.contains(field.id) {
                return Err(Error::manifest_corrupt(
                    view.path(),
                    format!("partition tuple is missing field {} ({})", field.id, field.name),
                ));
            }
            let ty = field.field_type.as_primitive().ok_or_else(|| {
                Error::manifest_corrupt(
                    view.path(),
                    format!("partition field {} is not primitive", field.name),
                )
            })?;
            record
                .get(field.id)
                .map(|value| {
                    datum_from_avro(value, ty).map_err(|e| {
                        Error::manifest_corrupt(
                            view.path(),
                            format!("partition field {}: {e}", field.name),
                        )
                    })
                })
                .transpose()
        })
        .collect()
}

/// One row of a manifest
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    /// Existing, added or deleted
    pub status: ManifestStatus,
    /// Snapshot that added or deleted the file
    pub snapshot_id: i64,
    /// Data sequence number of the file
    pub sequence_number: i64,
    /// Sequence number of the commit that wrote the file
    pub file_sequence_number: Option<i64>,
    /// Tracked file
    pub data_file: DataFile,
}

impl ManifestEntry {
    /// Whether the file is part of the snapshot's table state
    pub fn is_alive(&self) -> bool {
        self.status != ManifestStatus::Deleted
    }

    fn parse(
        view: &RecordView<'_>,
        manifest: &ManifestFile,
        version: FormatVersion,
        partition_type: &StructType,
    ) -> Result<ManifestEntry> {
        use field_ids::*;
        let status = ManifestStatus::try_from(view.int(STATUS)?)
            .map_err(|e| Error::manifest_corrupt(view.path(), e))?;
        let data_file = view
            .record(DATA_FILE)?
            .ok_or_else(|| Error::manifest_corrupt(view.path(), "entry has no data_file"))?;

        // Null ids and sequence numbers are inherited from the manifest list
        let snapshot_id = view
            .opt_long(SNAPSHOT_ID)?
            .unwrap_or(manifest.added_snapshot_id);
        let inherits = status == ManifestStatus::Added || version == FormatVersion::V1;
        let sequence_number = match view.opt_long(SEQUENCE_NUMBER)? {
            Some(seq) => seq,
            None if inherits => manifest.sequence_number,
            None => {
                return Err(Error::manifest_corrupt(
                    view.path(),
                    "existing entry without a data sequence number",
                ));
            }
        };
        let file_sequence_number = match view.opt_long(FILE_SEQUENCE_NUMBER)? {
            Some(seq) => Some(seq),
            None if inherits => Some(manifest.sequence_number),
            None => None,
        };

        Ok(ManifestEntry {
            status,
            snapshot_id,
            sequence_number,
            file_sequence_number,
            data_file: DataFile::parse(&data_file, manifest.partition_spec_id, partition_type)?,
        })
    }
}

/// Key/value header of a manifest file
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestMetadata {
    /// Table schema the manifest was written with
    pub schema: Option<Schema>,
    /// Id of that schema
    pub schema_id: Option<i32>,
    /// Partition fields of the manifest's spec
    pub partition_spec: Option<Vec<PartitionField>>,
    /// Id of the manifest's spec
    pub partition_spec_id: Option<i32>,
    /// Manifest format version
    pub format_version: FormatVersion,
    /// Data or deletes
    pub content: ManifestContentType,
}

impl ManifestMetadata {
    fn parse(
        file: &AvroFile,
        path: &str,
        list_entry: &ManifestFile,
        table_version: FormatVersion,
    ) -> Result<Self> {
        let corrupt = |key: &str, e: String| {
            Error::manifest_corrupt(path, format!("invalid header '{key}': {e}"))
        };
        let parse_int = |key: &str| -> Result<Option<i64>> {
            file.metadata_str(key)
                .map(|raw| raw.trim().parse::<i64>().map_err(|e| corrupt(key, e.to_string())))
                .transpose()
        };

        let format_version = match parse_int("format-version")? {
            Some(v) => FormatVersion::try_from_number(v).map_err(|e| match e {
                Error::UnsupportedVersion { .. } => e,
                other => corrupt("format-version", other.to_string()),
            })?,
            None => table_version,
        };
        let schema = file
            .metadata_str("schema")
            .map(|raw| {
                serde_json::from_str::<Schema>(raw).map_err(|e| corrupt("schema", e.to_string()))
            })
            .transpose()?;
        let partition_spec = file
            .metadata_str("partition-spec")
            .map(|raw| {
                serde_json::from_str::<Vec<PartitionFieldV1>>(raw)
                    .map(PartitionFieldV1::into_fields)
                    .map_err(|e| corrupt("partition-spec", e.to_string()))
            })
            .transpose()?;
        let content = match file.metadata_str("content") {
            Some("data") => ManifestContentType::Data,
            Some("deletes") => ManifestContentType::Deletes,
            Some(other) => return Err(corrupt("content", format!("unknown value '{other}'"))),
            None => list_entry.content,
        };
        let as_i32 = |key: &str, v: Option<i64>| -> Result<Option<i32>> {
            v.map(|v| i32::try_from(v).map_err(|e| corrupt(key, e.to_string())))
                .transpose()
        };

        Ok(ManifestMetadata {
            schema,
            schema_id: as_i32("schema-id", parse_int("schema-id")?)?,
            partition_spec,
            partition_spec_id: as_i32("partition-spec-id", parse_int("partition-spec-id")?)?,
            format_version,
            content,
        })
    }
}

/// Decoded manifest file
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    metadata: ManifestMetadata,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Decodes the manifest referenced by a manifest list entry
    ///
    /// `partition_type` is the partition tuple type of the entry's spec.
    pub fn parse(
        bytes: &[u8],
        list_entry: &ManifestFile,
        partition_type: &StructType,
        table_version: FormatVersion,
    ) -> Result<Manifest> {
        let path = list_entry.manifest_path.as_str();
        let file = AvroFile::read(bytes, path)?;
        let metadata = ManifestMetadata::parse(&file, path, list_entry, table_version)?;
        let layout = RecordLayout::from_schema(&file.schema, path)?;
        let entries = file
            .records
            .iter()
            .map(|record| {
                ManifestEntry::parse(
                    &layout.view(record, path)?,
                    list_entry,
                    metadata.format_version,
                    partition_type,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        log::debug!("decoded manifest {path}: {} entries", entries.len());
        Ok(Manifest { metadata, entries })
    }

    /// Header metadata
    pub fn metadata(&self) -> &ManifestMetadata {
        &self.metadata
    }

    /// Entries in file order
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::datatypes::NestedField;
    use apache_avro::types::Value as AvroValue;
    use iceberg_planner_common::avro::{
        DataFileFixture, EntryFixture, ManifestWriter, PartitionFieldFixture,
    };

    fn list_entry(content: ManifestContentType) -> ManifestFile {
        ManifestFile {
            manifest_path: "s3://t/metadata/m0.avro".into(),
            manifest_length: 4096,
            partition_spec_id: 0,
            content,
            sequence_number: 5,
            min_sequence_number: 1,
            added_snapshot_id: 77,
            added_files_count: Some(1),
            existing_files_count: Some(1),
            deleted_files_count: Some(0),
            added_rows_count: None,
            existing_rows_count: None,
            deleted_rows_count: None,
            partitions: Vec::new(),
            key_metadata: None,
        }
    }

    fn partition_type() -> StructType {
        StructType::new(vec![NestedField::optional(
            1000,
            "x",
            PrimitiveType::Int.into(),
        )])
    }

    fn writer() -> ManifestWriter {
        ManifestWriter::new(2, "data", vec![PartitionFieldFixture::new(1000, "x", "int")])
            .with_header("schema-id", "0")
            .with_header("partition-spec-id", "0")
            .with_header(
                "schema",
                r#"{"type":"struct","schema-id":0,"fields":[{"id":1,"name":"x","required":false,"type":"int"}]}"#,
            )
            .with_header(
                "partition-spec",
                r#"[{"source-id":1,"field-id":1000,"name":"x","transform":"identity"}]"#,
            )
    }

    #[test]
    fn test_parse_entries_with_inheritance() {
        let bytes = writer()
            .entry(
                EntryFixture::added(
                    DataFileFixture::data("s3://t/data/a.parquet", 100)
                        .with_partition(vec![Some(AvroValue::Int(15))])
                        .with_value_count(1, 100)
                        .with_null_count(1, 0)
                        .with_bounds(1, 10i32.to_le_bytes().to_vec(), 20i32.to_le_bytes().to_vec()),
                ),
            )
            .entry(
                EntryFixture::existing(
                    DataFileFixture::data("s3://t/data/b.parquet", 50)
                        .with_partition(vec![None]),
                    3,
                    2,
                ),
            )
            .write();

        let manifest = Manifest::parse(
            &bytes,
            &list_entry(ManifestContentType::Data),
            &partition_type(),
            FormatVersion::V2,
        )
        .unwrap();

        let metadata = manifest.metadata();
        assert_eq!(metadata.format_version, FormatVersion::V2);
        assert_eq!(metadata.content, ManifestContentType::Data);
        assert_eq!(metadata.schema_id, Some(0));
        assert_eq!(metadata.partition_spec.as_ref().unwrap()[0].field_id, 1000);
        assert!(metadata.schema.is_some());

        let entries = manifest.entries();
        assert_eq!(entries.len(), 2);

        let added = &entries[0];
        assert_eq!(added.status, ManifestStatus::Added);
        assert_eq!(added.snapshot_id, 77);
        assert_eq!(added.sequence_number, 5);
        assert_eq!(added.data_file.partition, vec![Some(Datum::int(15))]);
        assert_eq!(added.data_file.file_format, DataFileFormat::Parquet);
        assert_eq!(
            added.data_file.lower_bound(1, &PrimitiveType::Int).unwrap(),
            Some(Datum::int(10))
        );
        assert_eq!(added.data_file.value_counts.get(&1), Some(&100));

        let existing = &entries[1];
        assert_eq!(existing.status, ManifestStatus::Existing);
        assert_eq!(existing.snapshot_id, 3);
        assert_eq!(existing.sequence_number, 2);
        assert_eq!(existing.data_file.partition, vec![None]);
    }

    #[test]
    fn test_missing_partition_field_is_corrupt() {
        let bytes = ManifestWriter::new(2, "data", vec![PartitionFieldFixture::new(1001, "y", "int")])
            .entry(EntryFixture::added(
                DataFileFixture::data("s3://t/data/a.parquet", 1)
                    .with_partition(vec![Some(AvroValue::Int(1))]),
            ))
            .write();
        assert!(matches!(
            Manifest::parse(
                &bytes,
                &list_entry(ManifestContentType::Data),
                &partition_type(),
                FormatVersion::V2,
            ),
            Err(Error::ManifestCorrupt { .. })
        ));
    }

    #[test]
    fn test_delete_files() {
        let bytes = ManifestWriter::new(2, "deletes", vec![PartitionFieldFixture::new(1000, "x", "int")])
            .entry(EntryFixture::added(
                DataFileFixture::position_deletes("s3://t/data/d.parquet", 3)
                    .with_partition(vec![Some(AvroValue::Int(1))]),
            ))
            .entry(EntryFixture::added(
                DataFileFixture::equality_deletes("s3://t/data/e.parquet", 3, vec![1])
                    .with_partition(vec![Some(AvroValue::Int(1))]),
            ))
            .write();
        let manifest = Manifest::parse(
            &bytes,
            &list_entry(ManifestContentType::Deletes),
            &partition_type(),
            FormatVersion::V2,
        )
        .unwrap();
        assert_eq!(manifest.metadata().content, ManifestContentType::Deletes);
        assert_eq!(
            manifest.entries()[0].data_file.content,
            DataContentType::PositionDeletes
        );
        assert_eq!(manifest.entries()[1].data_file.equality_ids, Some(vec![1]));
        assert!(manifest.entries()[1].data_file.is_delete());
    }

    #[test]
    fn test_unknown_tags_are_corrupt() {
        let status = writer()
            .entry(EntryFixture {
                status: 3,
                ..EntryFixture::added(
                    DataFileFixture::data("s3://t/data/a.parquet", 1)
                        .with_partition(vec![Some(AvroValue::Int(1))]),
                )
            })
            .write();
        let content = writer()
            .entry(EntryFixture::added(DataFileFixture {
                content: 7,
                ..DataFileFixture::data("s3://t/data/a.parquet", 1)
                    .with_partition(vec![Some(AvroValue::Int(1))])
            }))
            .write();

        for (bytes, tag) in [(status, "status 3"), (content, "content 7")] {
            match Manifest::parse(
                &bytes,
                &list_entry(ManifestContentType::Data),
                &partition_type(),
                FormatVersion::V2,
            ) {
                Err(Error::ManifestCorrupt { path, message }) => {
                    assert_eq!(path, "s3://t/metadata/m0.avro");
                    assert!(message.contains(tag), "{message}");
                }
                other => panic!("expected ManifestCorrupt, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unsupported_manifest_version() {
        let bytes = ManifestWriter::new(3, "data", vec![]).write();
        assert!(matches!(
            Manifest::parse(
                &bytes,
                &list_entry(ManifestContentType::Data),
                &StructType::default(),
                FormatVersion::V2,
            ),
            Err(Error::UnsupportedVersion { version: 3, .. })
        ));
    }

    #[test]
    fn test_file_format_parse() {
        assert_eq!("PARQUET".parse::<DataFileFormat>(), Ok(DataFileFormat::Parquet));
        assert!("csv".parse::<DataFileFormat>().is_err());
    }
}
