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

//! Writers for manifest list and manifest fixtures
//!
//! Schemas carry the same `field-id` attributes Iceberg writers emit.

use apache_avro::types::{Record, Value as AvroValue};
use apache_avro::{Schema as AvroSchema, Writer};
use serde_json::{Value as JsonValue, json};

fn optional(name: &str, ty: JsonValue, field_id: i32) -> JsonValue {
    json!({"name": name, "type": ["null", ty], "default": null, "field-id": field_id})
}

fn int_map(name: &str, field_id: i32, key_id: i32, value_id: i32, value_type: &str) -> JsonValue {
    optional(
        name,
        json!({
            "type": "array",
            "logicalType": "map",
            "items": {
                "type": "record",
                "name": format!("k{key_id}_v{value_id}"),
                "fields": [
                    {"name": "key", "type": "int", "field-id": key_id},
                    {"name": "value", "type": value_type, "field-id": value_id}
                ]
            }
        }),
        field_id,
    )
}

fn nested_schema<'a>(schema: &'a AvroSchema, name: &str) -> &'a AvroSchema {
    match schema {
        AvroSchema::Record(record) => record
            .fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.schema)
            .unwrap_or_else(|| panic!("no field {name} in fixture schema")),
        _ => panic!("fixture schema is not a record"),
    }
}

fn some(value: AvroValue) -> AvroValue {
    AvroValue::Union(1, Box::new(value))
}

fn none() -> AvroValue {
    AvroValue::Union(0, Box::new(AvroValue::Null))
}

fn long_map(entries: &[(i32, i64)]) -> AvroValue {
    if entries.is_empty() {
        return none();
    }
    some(AvroValue::Array(
        entries
            .iter()
            .map(|(k, v)| {
                AvroValue::Record(vec![
                    ("key".into(), AvroValue::Int(*k)),
                    ("value".into(), AvroValue::Long(*v)),
                ])
            })
            .collect(),
    ))
}

fn bytes_map(entries: &[(i32, Vec<u8>)]) -> AvroValue {
    if entries.is_empty() {
        return none();
    }
    some(AvroValue::Array(
        entries
            .iter()
            .map(|(k, v)| {
                AvroValue::Record(vec![
                    ("key".into(), AvroValue::Int(*k)),
                    ("value".into(), AvroValue::Bytes(v.clone())),
                ])
            })
            .collect(),
    ))
}

// ============================================================================
// Manifest lists
// ============================================================================

/// Partition field summary of a manifest list entry
#[derive(Debug, Clone)]
pub struct FieldSummaryFixture {
    pub contains_null: bool,
    pub contains_nan: Option<bool>,
    pub lower_bound: Option<Vec<u8>>,
    pub upper_bound: Option<Vec<u8>>,
}

impl FieldSummaryFixture {
    /// Non-null int partition values in `[lower, upper]`
    pub fn ints(lower: i32, upper: i32) -> Self {
        Self {
            contains_null: false,
            contains_nan: None,
            lower_bound: Some(lower.to_le_bytes().to_vec()),
            upper_bound: Some(upper.to_le_bytes().to_vec()),
        }
    }

    /// Summary without bounds
    pub fn unknown() -> Self {
        Self {
            contains_null: true,
            contains_nan: None,
            lower_bound: None,
            upper_bound: None,
        }
    }
}

/// One manifest list record
#[derive(Debug, Clone)]
pub struct ManifestFileFixture {
    pub path: String,
    pub length: i64,
    pub spec_id: i32,
    pub content: i32,
    pub sequence_number: i64,
    pub min_sequence_number: i64,
    pub added_snapshot_id: i64,
    pub added_files: i32,
    pub existing_files: i32,
    pub deleted_files: i32,
    pub partitions: Vec<FieldSummaryFixture>,
}

impl ManifestFileFixture {
    /// Data manifest
    pub fn data(path: &str, length: usize, snapshot_id: i64, sequence_number: i64) -> Self {
        Self {
            path: path.to_string(),
            length: length as i64,
            spec_id: 0,
            content: 0,
            sequence_number,
            min_sequence_number: sequence_number,
            added_snapshot_id: snapshot_id,
            added_files: 1,
            existing_files: 0,
            deleted_files: 0,
            partitions: Vec::new(),
        }
    }

    /// Delete manifest
    pub fn deletes(path: &str, length: usize, snapshot_id: i64, sequence_number: i64) -> Self {
        Self {
            content: 1,
            ..Self::data(path, length, snapshot_id, sequence_number)
        }
    }

    pub fn with_spec_id(mut self, spec_id: i32) -> Self {
        self.spec_id = spec_id;
        self
    }

    /// Overrides the added, existing and deleted file counts
    pub fn with_file_counts(mut self, added: i32, existing: i32, deleted: i32) -> Self {
        self.added_files = added;
        self.existing_files = existing;
        self.deleted_files = deleted;
        self
    }

    pub fn with_summary(mut self, summary: FieldSummaryFixture) -> Self {
        self.partitions.push(summary);
        self
    }
}

/// Builds manifest list files
pub struct ManifestListWriter {
    format_version: u8,
    entries: Vec<ManifestFileFixture>,
}

impl ManifestListWriter {
    pub fn new(format_version: u8) -> Self {
        Self {
            format_version,
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, entry: ManifestFileFixture) -> Self {
        self.entries.push(entry);
        self
    }

    fn schema(&self) -> AvroSchema {
        let mut fields = vec![
            json!({"name": "manifest_path", "type": "string", "field-id": 500}),
            json!({"name": "manifest_length", "type": "long", "field-id": 501}),
            json!({"name": "partition_spec_id", "type": "int", "field-id": 502}),
        ];
        if self.format_version >= 2 {
            fields.push(json!({"name": "content", "type": "int", "field-id": 517}));
            fields.push(json!({"name": "sequence_number", "type": "long", "field-id": 515}));
            fields.push(json!({"name": "min_sequence_number", "type": "long", "field-id": 516}));
        }
        fields.extend([
            json!({"name": "added_snapshot_id", "type": "long", "field-id": 503}),
            json!({"name": "added_files_count", "type": "int", "field-id": 504}),
            json!({"name": "existing_files_count", "type": "int", "field-id": 505}),
            json!({"name": "deleted_files_count", "type": "int", "field-id": 506}),
            optional(
                "partitions",
                json!({
                    "type": "array",
                    "element-id": 508,
                    "items": {
                        "type": "record",
                        "name": "r508",
                        "fields": [
                            {"name": "contains_null", "type": "boolean", "field-id": 509},
                            {"name": "contains_nan", "type": ["null", "boolean"], "default": null, "field-id": 518},
                            {"name": "lower_bound", "type": ["null", "bytes"], "default": null, "field-id": 510},
                            {"name": "upper_bound", "type": ["null", "bytes"], "default": null, "field-id": 511}
                        ]
                    }
                }),
                507,
            ),
        ]);
        let schema = json!({"type": "record", "name": "manifest_file", "fields": fields});
        AvroSchema::parse(&schema).unwrap()
    }

    pub fn write(self) -> Vec<u8> {
        let schema = self.schema();
        let mut writer = Writer::new(&schema, Vec::new());
        writer
            .add_user_metadata(
                "format-version".to_string(),
                self.format_version.to_string(),
            )
            .unwrap();
        for entry in &self.entries {
            let mut record = Record::new(&schema).unwrap();
            record.put("manifest_path", entry.path.clone());
            record.put("manifest_length", entry.length);
            record.put("partition_spec_id", entry.spec_id);
            if self.format_version >= 2 {
                record.put("content", entry.content);
                record.put("sequence_number", entry.sequence_number);
                record.put("min_sequence_number", entry.min_sequence_number);
            }
            record.put("added_snapshot_id", entry.added_snapshot_id);
            record.put("added_files_count", entry.added_files);
            record.put("existing_files_count", entry.existing_files);
            record.put("deleted_files_count", entry.deleted_files);
            let summaries = entry
                .partitions
                .iter()
                .map(|s| {
                    AvroValue::Record(vec![
                        ("contains_null".into(), AvroValue::Boolean(s.contains_null)),
                        (
                            "contains_nan".into(),
                            s.contains_nan.map_or_else(none, |v| some(AvroValue::Boolean(v))),
                        ),
                        (
                            "lower_bound".into(),
                            s.lower_bound
                                .clone()
                                .map_or_else(none, |v| some(AvroValue::Bytes(v))),
                        ),
                        (
                            "upper_bound".into(),
                            s.upper_bound
                                .clone()
                                .map_or_else(none, |v| some(AvroValue::Bytes(v))),
                        ),
                    ])
                })
                .collect();
            record.put("partitions", some(AvroValue::Array(summaries)));
            writer.append(record).unwrap();
        }
        writer.into_inner().unwrap()
    }
}

// ============================================================================
// Manifests
// ============================================================================

/// Partition field of the manifest's partition struct
#[derive(Debug, Clone)]
pub struct PartitionFieldFixture {
    pub field_id: i32,
    pub name: String,
    pub avro_type: JsonValue,
}

impl PartitionFieldFixture {
    pub fn new(field_id: i32, name: &str, avro_type: impl Into<JsonValue>) -> Self {
        Self {
            field_id,
            name: name.to_string(),
            avro_type: avro_type.into(),
        }
    }
}

/// Data or delete file of a manifest entry
#[derive(Debug, Clone)]
pub struct DataFileFixture {
    pub content: i32,
    pub path: String,
    pub format: String,
    pub partition: Vec<Option<AvroValue>>,
    pub record_count: i64,
    pub file_size: i64,
    pub value_counts: Vec<(i32, i64)>,
    pub null_value_counts: Vec<(i32, i64)>,
    pub nan_value_counts: Vec<(i32, i64)>,
    pub lower_bounds: Vec<(i32, Vec<u8>)>,
    pub upper_bounds: Vec<(i32, Vec<u8>)>,
    pub split_offsets: Option<Vec<i64>>,
    pub equality_ids: Option<Vec<i32>>,
}

impl DataFileFixture {
    /// Parquet data file
    pub fn data(path: &str, record_count: i64) -> Self {
        Self {
            content: 0,
            path: path.to_string(),
            format: "PARQUET".to_string(),
            partition: Vec::new(),
            record_count,
            file_size: record_count * 16 + 128,
            value_counts: Vec::new(),
            null_value_counts: Vec::new(),
            nan_value_counts: Vec::new(),
            lower_bounds: Vec::new(),
            upper_bounds: Vec::new(),
            split_offsets: None,
            equality_ids: None,
        }
    }

    /// Position delete file
    pub fn position_deletes(path: &str, record_count: i64) -> Self {
        Self {
            content: 1,
            ..Self::data(path, record_count)
        }
    }

    /// Equality delete file over `equality_ids`
    pub fn equality_deletes(path: &str, record_count: i64, equality_ids: Vec<i32>) -> Self {
        Self {
            content: 2,
            equality_ids: Some(equality_ids),
            ..Self::data(path, record_count)
        }
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    pub fn with_partition(mut self, partition: Vec<Option<AvroValue>>) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_value_count(mut self, field_id: i32, count: i64) -> Self {
        self.value_counts.push((field_id, count));
        self
    }

    pub fn with_null_count(mut self, field_id: i32, count: i64) -> Self {
        self.null_value_counts.push((field_id, count));
        self
    }

    pub fn with_nan_count(mut self, field_id: i32, count: i64) -> Self {
        self.nan_value_counts.push((field_id, count));
        self
    }

    pub fn with_bounds(mut self, field_id: i32, lower: Vec<u8>, upper: Vec<u8>) -> Self {
        self.lower_bounds.push((field_id, lower));
        self.upper_bounds.push((field_id, upper));
        self
    }

    pub fn with_split_offsets(mut self, offsets: Vec<i64>) -> Self {
        self.split_offsets = Some(offsets);
        self
    }
}

/// Manifest entry
#[derive(Debug, Clone)]
pub struct EntryFixture {
    pub status: i32,
    pub snapshot_id: Option<i64>,
    pub sequence_number: Option<i64>,
    pub file_sequence_number: Option<i64>,
    pub data_file: DataFileFixture,
}

impl EntryFixture {
    /// Added entry; snapshot id and sequence number are inherited
    pub fn added(data_file: DataFileFixture) -> Self {
        Self {
            status: 1,
            snapshot_id: None,
            sequence_number: None,
            file_sequence_number: None,
            data_file,
        }
    }

    /// Existing entry carried over from `snapshot_id`
    pub fn existing(data_file: DataFileFixture, snapshot_id: i64, sequence_number: i64) -> Self {
        Self {
            status: 0,
            snapshot_id: Some(snapshot_id),
            sequence_number: Some(sequence_number),
            file_sequence_number: Some(sequence_number),
            data_file,
        }
    }

    /// Deleted entry
    pub fn deleted(data_file: DataFileFixture, snapshot_id: i64, sequence_number: i64) -> Self {
        Self {
            status: 2,
            ..Self::existing(data_file, snapshot_id, sequence_number)
        }
    }
}

/// Builds manifest files
pub struct ManifestWriter {
    format_version: u8,
    content: String,
    partition_fields: Vec<PartitionFieldFixture>,
    headers: Vec<(String, String)>,
    entries: Vec<EntryFixture>,
}

impl ManifestWriter {
    pub fn new(
        format_version: u8,
        content: &str,
        partition_fields: Vec<PartitionFieldFixture>,
    ) -> Self {
        Self {
            format_version,
            content: content.to_string(),
            partition_fields,
            headers: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Adds an extra key/value header
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn entry(mut self, entry: EntryFixture) -> Self {
        self.entries.push(entry);
        self
    }

    fn schema(&self) -> AvroSchema {
        let partition_fields: Vec<JsonValue> = self
            .partition_fields
            .iter()
            .map(|f| optional(&f.name, f.avro_type.clone(), f.field_id))
            .collect();
        let schema = json!({
            "type": "record",
            "name": "manifest_entry",
            "fields": [
                {"name": "status", "type": "int", "field-id": 0},
                optional("snapshot_id", json!("long"), 1),
                optional("sequence_number", json!("long"), 3),
                optional("file_sequence_number", json!("long"), 4),
                {
                    "name": "data_file",
                    "field-id": 2,
                    "type": {
                        "type": "record",
                        "name": "r2",
                        "fields": [
                            {"name": "content", "type": "int", "field-id": 134},
                            {"name": "file_path", "type": "string", "field-id": 100},
                            {"name": "file_format", "type": "string", "field-id": 101},
                            {
                                "name": "partition",
                                "field-id": 102,
                                "type": {"type": "record", "name": "r102", "fields": partition_fields}
                            },
                            {"name": "record_count", "type": "long", "field-id": 103},
                            {"name": "file_size_in_bytes", "type": "long", "field-id": 104},
                            int_map("column_sizes", 108, 117, 118, "long"),
                            int_map("value_counts", 109, 119, 120, "long"),
                            int_map("null_value_counts", 110, 121, 122, "long"),
                            int_map("nan_value_counts", 137, 138, 139, "long"),
                            int_map("lower_bounds", 125, 126, 127, "bytes"),
                            int_map("upper_bounds", 128, 129, 130, "bytes"),
                            optional("key_metadata", json!("bytes"), 131),
                            optional("split_offsets", json!({"type": "array", "items": "long", "element-id": 133}), 132),
                            optional("equality_ids", json!({"type": "array", "items": "int", "element-id": 136}), 135),
                            optional("sort_order_id", json!("int"), 140)
                        ]
                    }
                }
            ]
        });
        AvroSchema::parse(&schema).unwrap()
    }

    pub fn write(self) -> Vec<u8> {
        let schema = self.schema();
        let data_file_schema = nested_schema(&schema, "data_file");
        let partition_schema = nested_schema(data_file_schema, "partition");

        let mut writer = Writer::new(&schema, Vec::new());
        writer
            .add_user_metadata(
                "format-version".to_string(),
                self.format_version.to_string(),
            )
            .unwrap();
        writer
            .add_user_metadata("content".to_string(), self.content.clone())
            .unwrap();
        for (key, value) in &self.headers {
            writer.add_user_metadata(key.clone(), value.clone()).unwrap();
        }

        for entry in &self.entries {
            let df = &entry.data_file;
            let mut partition = Record::new(partition_schema).unwrap();
            for (field, value) in self.partition_fields.iter().zip(&df.partition) {
                partition.put(&field.name, value.clone().map_or_else(none, some));
            }

            let mut data_file = Record::new(data_file_schema).unwrap();
            data_file.put("content", df.content);
            data_file.put("file_path", df.path.clone());
            data_file.put("file_format", df.format.clone());
            data_file.put("partition", partition);
            data_file.put("record_count", df.record_count);
            data_file.put("file_size_in_bytes", df.file_size);
            data_file.put("column_sizes", none());
            data_file.put("value_counts", long_map(&df.value_counts));
            data_file.put("null_value_counts", long_map(&df.null_value_counts));
            data_file.put("nan_value_counts", long_map(&df.nan_value_counts));
            data_file.put("lower_bounds", bytes_map(&df.lower_bounds));
            data_file.put("upper_bounds", bytes_map(&df.upper_bounds));
            data_file.put("key_metadata", none());
            data_file.put(
                "split_offsets",
                df.split_offsets.as_ref().map_or_else(none, |offsets| {
                    some(AvroValue::Array(
                        offsets.iter().map(|o| AvroValue::Long(*o)).collect(),
                    ))
                }),
            );
            data_file.put(
                "equality_ids",
                df.equality_ids.as_ref().map_or_else(none, |ids| {
                    some(AvroValue::Array(ids.iter().map(|i| AvroValue::Int(*i)).collect()))
                }),
            );
            data_file.put("sort_order_id", none());

            let optional_long = |v: Option<i64>| v.map_or_else(none, |v| some(AvroValue::Long(v)));
            let mut record = Record::new(&schema).unwrap();
            record.put("status", entry.status);
            record.put("snapshot_id", optional_long(entry.snapshot_id));
            record.put("sequence_number", optional_long(entry.sequence_number));
            record.put(
                "file_sequence_number",
                optional_long(entry.file_sequence_number),
            );
            record.put("data_file", data_file);
            writer.append(record).unwrap();
        }
        writer.into_inner().unwrap()
    }
}
