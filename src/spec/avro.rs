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

//! Field-id addressed access to decoded Avro records
//!
//! Manifest lists and manifests are matched to their fields by the
//! `field-id` attribute written into the Avro schema, never by name or
//! position, so files written by other engines with renamed or reordered
//! fields decode the same way.

use crate::error::{Error, Result};
use crate::spec::datatypes::PrimitiveType;
use crate::spec::values::{Datum, decimal_from_bytes};
use apache_avro::Schema as AvroSchema;
use apache_avro::types::Value as AvroValue;
use std::collections::HashMap;

const FIELD_ID_ATTRIBUTE: &str = "field-id";

/// Decoded Avro container: writer schema, header metadata and records
pub(crate) struct AvroFile {
    pub schema: AvroSchema,
    pub metadata: HashMap<String, Vec<u8>>,
    pub records: Vec<AvroValue>,
}

impl AvroFile {
    /// Reads a whole Avro object container file
    ///
    /// Any decode failure, including a truncated block, is reported as
    /// `ManifestCorrupt` for `path`.
    pub(crate) fn read(bytes: &[u8], path: &str) -> Result<AvroFile> {
        let corrupt = |e: apache_avro::Error| Error::manifest_corrupt(path, e.to_string());
        let reader = apache_avro::Reader::new(bytes).map_err(corrupt)?;
        let schema = reader.writer_schema().clone();
        let metadata = reader.user_metadata().clone();
        let records = reader.collect::<std::result::Result<Vec<_>, _>>().map_err(corrupt)?;
        Ok(AvroFile {
            schema,
            metadata,
            records,
        })
    }

    /// Header metadata value as UTF-8
    pub(crate) fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(|v| std::str::from_utf8(v).ok())
    }
}

/// Positions of a record schema's fields, keyed by field id
#[derive(Debug, Default)]
pub(crate) struct RecordLayout {
    positions: HashMap<i32, usize>,
    children: HashMap<i32, RecordLayout>,
}

impl RecordLayout {
    /// Builds the layout of a record schema and every nested record
    pub(crate) fn from_schema(schema: &AvroSchema, path: &str) -> Result<RecordLayout> {
        let AvroSchema::Record(record) = strip_optional(schema) else {
            return Err(Error::manifest_corrupt(
                path,
                "top-level Avro schema is not a record",
            ));
        };

        let mut layout = RecordLayout::default();
        for (pos, field) in record.fields.iter().enumerate() {
            let Some(id) = field
                .custom_attributes
                .get(FIELD_ID_ATTRIBUTE)
                .and_then(parse_field_id)
            else {
                continue;
            };
            if layout.positions.insert(id, pos).is_some() {
                return Err(Error::manifest_corrupt(
                    path,
                    format!("duplicate field-id {id} in Avro schema"),
                ));
            }
            let nested = match strip_optional(&field.schema) {
                AvroSchema::Array(array) => strip_optional(array.items.as_ref()),
                other => other,
            };
            if matches!(nested, AvroSchema::Record(_)) {
                layout
                    .children
                    .insert(id, RecordLayout::from_schema(nested, path)?);
            }
        }
        Ok(layout)
    }

    /// Layout of a nested record or array-of-record field
    pub(crate) fn child(&self, id: i32) -> Option<&RecordLayout> {
        self.children.get(&id)
    }

    /// Wraps a decoded record value
    pub(crate) fn view<'a>(&'a self, value: &'a AvroValue, path: &'a str) -> Result<RecordView<'a>> {
        match unwrap_union(value) {
            AvroValue::Record(fields) => Ok(RecordView {
                layout: self,
                fields,
                path,
            }),
            other => Err(Error::manifest_corrupt(
                path,
                format!("expected a record, found {other:?}"),
            )),
        }
    }
}

fn parse_field_id(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Unwraps `["null", T]` unions to `T`
fn strip_optional(schema: &AvroSchema) -> &AvroSchema {
    if let AvroSchema::Union(union) = schema {
        let mut non_null = union
            .variants()
            .iter()
            .filter(|s| !matches!(s, AvroSchema::Null));
        if let (Some(only), None) = (non_null.next(), non_null.next()) {
            return only;
        }
    }
    schema
}

fn unwrap_union(value: &AvroValue) -> &AvroValue {
    match value {
        AvroValue::Union(_, inner) => unwrap_union(inner),
        other => other,
    }
}

/// Typed, id-addressed view of one decoded record
pub(crate) struct RecordView<'a> {
    layout: &'a RecordLayout,
    fields: &'a [(String, AvroValue)],
    path: &'a str,
}

impl<'a> RecordView<'a> {
    /// Path of the file the record was read from
    pub(crate) fn path(&self) -> &'a str {
        self.path
    }

    fn corrupt(&self, message: String) -> Error {
        Error::manifest_corrupt(self.path, message)
    }

    /// Whether the writer schema declares the field
    pub(crate) fn contains(&self, id: i32) -> bool {
        self.layout.positions.contains_key(&id)
    }

    /// Value of a field, `None` when absent from the schema or null
    pub(crate) fn get(&self, id: i32) -> Option<&'a AvroValue> {
        let pos = *self.layout.positions.get(&id)?;
        let fields: &'a [(String, AvroValue)] = self.fields;
        match fields.get(pos).map(|(_, v)| unwrap_union(v)) {
            Some(AvroValue::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    fn required<T>(
        &self,
        id: i32,
        convert: impl Fn(&'a AvroValue) -> Option<T>,
        kind: &str,
    ) -> Result<T> {
        match self.get(id) {
            Some(value) => convert(value).ok_or_else(|| {
                self.corrupt(format!("field {id} is not {kind}: {value:?}"))
            }),
            None => Err(self.corrupt(format!("missing required field {id}"))),
        }
    }

    fn optional<T>(
        &self,
        id: i32,
        convert: impl Fn(&'a AvroValue) -> Option<T>,
        kind: &str,
    ) -> Result<Option<T>> {
        self.get(id)
            .map(|value| {
                convert(value).ok_or_else(|| {
                    self.corrupt(format!("field {id} is not {kind}: {value:?}"))
                })
            })
            .transpose()
    }

    pub(crate) fn int(&self, id: i32) -> Result<i32> {
        self.required(id, as_int, "an int")
    }

    pub(crate) fn opt_int(&self, id: i32) -> Result<Option<i32>> {
        self.optional(id, as_int, "an int")
    }

    pub(crate) fn long(&self, id: i32) -> Result<i64> {
        self.required(id, as_long, "a long")
    }

    pub(crate) fn opt_long(&self, id: i32) -> Result<Option<i64>> {
        self.optional(id, as_long, "a long")
    }

    pub(crate) fn opt_bool(&self, id: i32) -> Result<Option<bool>> {
        self.optional(
            id,
            |v| match v {
                AvroValue::Boolean(b) => Some(*b),
                _ => None,
            },
            "a boolean",
        )
    }

    pub(crate) fn string(&self, id: i32) -> Result<&'a str> {
        self.required(id, as_str, "a string")
    }

    pub(crate) fn opt_bytes(&self, id: i32) -> Result<Option<&'a [u8]>> {
        self.optional(id, as_bytes, "bytes")
    }

    /// Nested record field
    pub(crate) fn record(&self, id: i32) -> Result<Option<RecordView<'a>>> {
        let Some(value) = self.get(id) else {
            return Ok(None);
        };
        let layout = self
            .layout
            .child(id)
            .ok_or_else(|| self.corrupt(format!("field {id} is not a record")))?;
        layout.view(value, self.path).map(Some)
    }

    /// Array-of-record field; absent or null reads as empty
    pub(crate) fn records(&self, id: i32) -> Result<Vec<RecordView<'a>>> {
        let Some(value) = self.get(id) else {
            return Ok(Vec::new());
        };
        let AvroValue::Array(items) = value else {
            return Err(self.corrupt(format!("field {id} is not an array")));
        };
        let layout = self
            .layout
            .child(id)
            .ok_or_else(|| self.corrupt(format!("field {id} is not an array of records")))?;
        items
            .iter()
            .map(|item| layout.view(item, self.path))
            .collect()
    }

    /// Array-of-long field
    pub(crate) fn opt_longs(&self, id: i32) -> Result<Option<Vec<i64>>> {
        let Some(value) = self.get(id) else {
            return Ok(None);
        };
        let AvroValue::Array(items) = value else {
            return Err(self.corrupt(format!("field {id} is not an array")));
        };
        items
            .iter()
            .map(|item| {
                as_long(unwrap_union(item))
                    .ok_or_else(|| self.corrupt(format!("field {id} holds a non-long element")))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Int-keyed map of longs; `key_value` holds the entry record's field ids
    pub(crate) fn long_map(&self, id: i32, key_value: (i32, i32)) -> Result<HashMap<i32, i64>> {
        self.int_keyed_map(id, key_value, |v| as_long(v), "long")
    }

    /// Int-keyed map of bytes
    pub(crate) fn bytes_map(
        &self,
        id: i32,
        key_value: (i32, i32),
    ) -> Result<HashMap<i32, Vec<u8>>> {
        self.int_keyed_map(id, key_value, |v| as_bytes(v).map(<[u8]>::to_vec), "bytes")
    }

    /// Reads an int-keyed map
    ///
    /// Writers store these as arrays of key/value records whose fields carry
    /// their own ids; generic Avro string-keyed maps are accepted too.
    fn int_keyed_map<T>(
        &self,
        id: i32,
        (key_id, value_id): (i32, i32),
        convert: impl Fn(&AvroValue) -> Option<T>,
        kind: &str,
    ) -> Result<HashMap<i32, T>> {
        let bad_entry = || self.corrupt(format!("field {id} holds an invalid {kind} map entry"));
        match self.get(id) {
            None => Ok(HashMap::new()),
            Some(AvroValue::Array(entries)) => {
                let layout = self.layout.child(id).ok_or_else(|| {
                    self.corrupt(format!("field {id} is not an array of key/value records"))
                })?;
                entries
                    .iter()
                    .map(|entry| {
                        let kv = layout.view(entry, self.path)?;
                        let key = kv.get(key_id).and_then(as_int).ok_or_else(bad_entry)?;
                        let value = kv.get(value_id).and_then(&convert).ok_or_else(bad_entry)?;
                        Ok((key, value))
                    })
                    .collect()
            }
            Some(AvroValue::Map(entries)) => entries
                .iter()
                .map(|(key, value)| {
                    let key = key.parse::<i32>().map_err(|_| bad_entry())?;
                    let value = convert(unwrap_union(value)).ok_or_else(bad_entry)?;
                    Ok((key, value))
                })
                .collect(),
            Some(_) => Err(self.corrupt(format!("field {id} is not a map"))),
        }
    }
}

fn as_int(value: &AvroValue) -> Option<i32> {
    match value {
        AvroValue::Int(v) | AvroValue::Date(v) => Some(*v),
        _ => None,
    }
}

fn as_long(value: &AvroValue) -> Option<i64> {
    match value {
        AvroValue::Long(v) => Some(*v),
        AvroValue::Int(v) => Some(i64::from(*v)),
        _ => None,
    }
}

fn as_str(value: &AvroValue) -> Option<&str> {
    match value {
        AvroValue::String(s) | AvroValue::Enum(_, s) => Some(s),
        _ => None,
    }
}

fn as_bytes(value: &AvroValue) -> Option<&[u8]> {
    match value {
        AvroValue::Bytes(b) | AvroValue::Fixed(_, b) => Some(b),
        _ => None,
    }
}

/// Converts a decoded partition value to a datum of the partition type
pub(crate) fn datum_from_avro(
    value: &AvroValue,
    ty: &PrimitiveType,
) -> std::result::Result<Datum, String> {
    let mismatch = || format!("value {value:?} does not match partition type {ty}");
    let datum = match (ty, unwrap_union(value)) {
        (PrimitiveType::Boolean, AvroValue::Boolean(v)) => Datum::bool(*v),
        (PrimitiveType::Int, AvroValue::Int(v)) => Datum::int(*v),
        (PrimitiveType::Long, v) => Datum::long(as_long(v).ok_or_else(mismatch)?),
        (PrimitiveType::Float, AvroValue::Float(v)) => Datum::float(*v),
        (PrimitiveType::Double, AvroValue::Double(v)) => Datum::double(*v),
        (PrimitiveType::Double, AvroValue::Float(v)) => Datum::double(f64::from(*v)),
        (PrimitiveType::Date, AvroValue::Date(v) | AvroValue::Int(v)) => Datum::date(*v),
        (
            PrimitiveType::Time,
            AvroValue::TimeMicros(v) | AvroValue::Long(v),
        ) => Datum::time_micros(*v),
        (
            PrimitiveType::Timestamp,
            AvroValue::LocalTimestampMicros(v) | AvroValue::TimestampMicros(v) | AvroValue::Long(v),
        ) => Datum::timestamp_micros(*v),
        (
            PrimitiveType::Timestamptz,
            AvroValue::TimestampMicros(v) | AvroValue::LocalTimestampMicros(v) | AvroValue::Long(v),
        ) => Datum::timestamptz_micros(*v),
        (PrimitiveType::String, AvroValue::String(v)) => Datum::string(v.clone()),
        (PrimitiveType::Uuid, AvroValue::Uuid(v)) => Datum::uuid(*v),
        (PrimitiveType::Uuid, AvroValue::String(v)) => {
            Datum::uuid(v.parse().map_err(|_| mismatch())?)
        }
        (PrimitiveType::Decimal { precision, scale }, AvroValue::Decimal(v)) => {
            let bytes = Vec::<u8>::try_from(v).map_err(|e| e.to_string())?;
            let unscaled = decimal_from_bytes(&bytes).map_err(|e| e.to_string())?;
            Datum::decimal(unscaled, *precision, *scale).map_err(|e| e.to_string())?
        }
        (
            PrimitiveType::Decimal { .. }
            | PrimitiveType::Uuid
            | PrimitiveType::Fixed(_)
            | PrimitiveType::Binary,
            v,
        ) => {
            let bytes = as_bytes(v).ok_or_else(mismatch)?;
            Datum::try_from_bytes(bytes, ty).map_err(|e| e.to_string())?
        }
        _ => return Err(mismatch()),
    };
    Ok(datum)
}
