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

//! Partition specs

use crate::error::{Error, Result};
use crate::spec::datatypes::{NestedField, PrimitiveType, StructType};
use crate::spec::schema::Schema;
use crate::spec::transform::Transform;
use crate::spec::values::Datum;
use serde::{Deserialize, Serialize};

/// First partition field id assigned when a spec omits them
pub const PARTITION_DATA_ID_START: i32 = 1000;

/// Partition field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionField {
    /// Source field ID from schema
    #[serde(rename = "source-id")]
    pub source_id: i32,
    /// Partition field ID, disjoint from data field ids
    #[serde(rename = "field-id")]
    pub field_id: i32,
    /// Partition field name
    pub name: String,
    /// Transform applied to the source column
    pub transform: Transform,
}

/// Partition specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    /// Unique identifier for this partition spec
    #[serde(rename = "spec-id")]
    pub spec_id: i32,
    /// Partition fields
    pub fields: Vec<PartitionField>,
}

/// Values of one file's partition tuple, aligned with its spec's fields
pub type PartitionValues = Vec<Option<Datum>>;

impl PartitionSpec {
    /// Spec with no partition fields
    pub fn unpartitioned(spec_id: i32) -> Self {
        PartitionSpec {
            spec_id,
            fields: Vec::new(),
        }
    }

    /// Whether every file of this spec lands in one partition
    pub fn is_unpartitioned(&self) -> bool {
        self.fields
            .iter()
            .all(|f| matches!(f.transform, Transform::Void))
    }

    /// Partition fields derived from the given source column
    pub fn fields_by_source_id(&self, source_id: i32) -> impl Iterator<Item = &PartitionField> {
        self.fields.iter().filter(move |f| f.source_id == source_id)
    }

    /// Position of a partition field within the partition tuple
    pub fn position_of(&self, field_id: i32) -> Option<usize> {
        self.fields.iter().position(|f| f.field_id == field_id)
    }

    /// Partition tuple type
    ///
    /// Source columns are looked up in `schemas` in order; the first hit
    /// wins. Partition values are always optional.
    pub fn partition_type<'a>(
        &self,
        schemas: impl IntoIterator<Item = &'a Schema> + Clone,
    ) -> Result<StructType> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let source = schemas
                .clone()
                .into_iter()
                .find_map(|s| s.primitive_type(field.source_id));
            let result_type = match (source, field.transform) {
                (Some(source), transform) => transform.result_type(source)?,
                // A void field over a dropped column still occupies its slot
                (None, Transform::Void) => PrimitiveType::Int,
                (None, _) => {
                    return Err(Error::metadata_corrupt(format!(
                        "partition spec {}: source field {} of '{}' is not a primitive column",
                        self.spec_id, field.source_id, field.name
                    )));
                }
            };
            fields.push(NestedField::optional(
                field.field_id,
                field.name.clone(),
                result_type.into(),
            ));
        }
        Ok(StructType::new(fields))
    }

    /// Computes the partition tuple for a row, keyed by source field id
    pub fn partition_values(
        &self,
        source_value: impl Fn(i32) -> Option<Datum>,
    ) -> Result<PartitionValues> {
        self.fields
            .iter()
            .map(|field| match source_value(field.source_id) {
                Some(value) => field.transform.apply(&value),
                None => Ok(None),
            })
            .collect()
    }
}

/// Partition field as written by format v1 documents, where ids are optional
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PartitionFieldV1 {
    #[serde(rename = "source-id")]
    pub source_id: i32,
    #[serde(rename = "field-id", default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<i32>,
    pub name: String,
    pub transform: Transform,
}

impl PartitionFieldV1 {
    /// Assigns sequential ids from 1000 to fields that lack one
    pub(crate) fn into_fields(fields: Vec<PartitionFieldV1>) -> Vec<PartitionField> {
        fields
            .into_iter()
            .enumerate()
            .map(|(pos, f)| PartitionField {
                source_id: f.source_id,
                field_id: f
                    .field_id
                    .unwrap_or(PARTITION_DATA_ID_START + pos as i32),
                name: f.name,
                transform: f.transform,
            })
            .collect()
    }
}

impl From<&PartitionField> for PartitionFieldV1 {
    fn from(field: &PartitionField) -> Self {
        PartitionFieldV1 {
            source_id: field.source_id,
            field_id: Some(field.field_id),
            name: field.name.clone(),
            transform: field.transform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::try_new(
            0,
            vec![
                NestedField::required(1, "id", PrimitiveType::Long.into()),
                NestedField::required(2, "ts", PrimitiveType::Timestamp.into()),
                NestedField::optional(3, "category", PrimitiveType::String.into()),
            ],
        )
        .unwrap()
    }

    fn spec() -> PartitionSpec {
        serde_json::from_value(json!({
            "spec-id": 1,
            "fields": [
                {"source-id": 2, "field-id": 1000, "name": "ts_day", "transform": "day"},
                {"source-id": 1, "field-id": 1001, "name": "id_bucket", "transform": "bucket[16]"},
                {"source-id": 3, "field-id": 1002, "name": "category", "transform": "identity"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_partition_type() {
        let schema = schema();
        let ty = spec().partition_type([&schema]).unwrap();
        let types: Vec<_> = ty
            .fields
            .iter()
            .map(|f| (f.id, f.field_type.to_string(), f.required))
            .collect();
        assert_eq!(
            types,
            vec![
                (1000, "date".to_string(), false),
                (1001, "int".to_string(), false),
                (1002, "string".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_partition_values() {
        let values = spec()
            .partition_values(|source_id| match source_id {
                1 => Some(Datum::long(34)),
                2 => Some(Datum::timestamp_micros(1_510_871_468_000_000)),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            values,
            vec![
                Some(Datum::date(17486)),
                Some(Datum::int(2017239379 % 16)),
                None
            ]
        );
    }

    #[test]
    fn test_v1_fields_get_sequential_ids() {
        let fields: Vec<PartitionFieldV1> = serde_json::from_value(json!([
            {"source-id": 1, "name": "a", "transform": "identity"},
            {"source-id": 2, "name": "b", "transform": "year"}
        ]))
        .unwrap();
        let fields = PartitionFieldV1::into_fields(fields);
        assert_eq!(fields[0].field_id, 1000);
        assert_eq!(fields[1].field_id, 1001);
    }

    #[test]
    fn test_missing_source_column() {
        let schema = schema();
        let spec = PartitionSpec {
            spec_id: 3,
            fields: vec![PartitionField {
                source_id: 99,
                field_id: 1000,
                name: "gone".into(),
                transform: Transform::Identity,
            }],
        };
        assert!(spec.partition_type([&schema]).is_err());
        assert!(PartitionSpec::unpartitioned(0).is_unpartitioned());
    }
}
