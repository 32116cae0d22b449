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

//! Column projection resolved by field id

use crate::error::{Error, Result};
use crate::spec::datatypes::NestedField;
use crate::spec::schema::Schema;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashSet;

/// Columns a scan should return
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColumnSelection {
    /// Every top-level column of the current schema
    #[default]
    All,
    /// Columns by field id
    Columns(Vec<i32>),
    /// Columns by (dotted) name, matched with the scan's case sensitivity
    Names(Vec<String>),
}

impl From<Vec<i32>> for ColumnSelection {
    fn from(ids: Vec<i32>) -> Self {
        ColumnSelection::Columns(ids)
    }
}

/// Where a reader finds a projected column in one data file
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource {
    /// The file has the column under this name
    Present { name: String },
    /// The file predates the column; read the field's initial default
    Default(JsonValue),
    /// The file predates the column and there is no default
    Null,
}

/// Projection resolved once against the table's current schema
///
/// Fields are kept by id, so a column renamed after a file was written is
/// still found in that file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedSchema {
    #[serde(rename = "schema-id")]
    schema_id: i32,
    fields: Vec<NestedField>,
}

impl ProjectedSchema {
    /// Resolves `selection` against `schema`
    ///
    /// Unknown ids or names fail with `ProjectionError`. Repeated columns
    /// are kept once, at their first position.
    pub fn resolve(
        schema: &Schema,
        selection: &ColumnSelection,
        case_sensitive: bool,
    ) -> Result<ProjectedSchema> {
        let fields = match selection {
            ColumnSelection::All => schema.fields().to_vec(),
            ColumnSelection::Columns(ids) => ids
                .iter()
                .map(|id| {
                    schema.field_by_id(*id).cloned().ok_or_else(|| {
                        Error::projection(format!(
                            "field id {id} not found in schema {}",
                            schema.schema_id()
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            ColumnSelection::Names(names) => names
                .iter()
                .map(|name| {
                    schema
                        .field_by_name(name, case_sensitive)
                        .cloned()
                        .ok_or_else(|| {
                            Error::projection(format!(
                                "column '{name}' not found in schema {}",
                                schema.schema_id()
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?,
        };

        let mut seen = HashSet::new();
        let fields = fields.into_iter().filter(|f| seen.insert(f.id)).collect();
        Ok(ProjectedSchema {
            schema_id: schema.schema_id(),
            fields,
        })
    }

    /// Current schema the projection was resolved against
    pub fn schema_id(&self) -> i32 {
        self.schema_id
    }

    pub fn fields(&self) -> &[NestedField] {
        &self.fields
    }

    pub fn field_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.fields.iter().map(|f| f.id)
    }

    /// Resolves each projected field against the schema a file was written
    /// with
    ///
    /// Never fails: a column missing from the file is filled from its
    /// `initial-default`, or null.
    pub fn resolve_against(&self, file_schema: &Schema) -> Vec<(i32, FieldSource)> {
        self.fields
            .iter()
            .map(|field| {
                let source = match file_schema.name_by_field_id(field.id) {
                    Some(name) => FieldSource::Present {
                        name: name.to_string(),
                    },
                    None => match &field.initial_default {
                        Some(value) => FieldSource::Default(value.clone()),
                        None => FieldSource::Null,
                    },
                };
                (field.id, source)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::datatypes::{PrimitiveType, Type};
    use serde_json::json;

    fn v1_schema() -> Schema {
        Schema::try_new(
            0,
            vec![
                NestedField::required(1, "id", Type::Primitive(PrimitiveType::Long)),
                NestedField::optional(2, "data", Type::Primitive(PrimitiveType::String)),
            ],
        )
        .unwrap()
    }

    fn v2_schema() -> Schema {
        Schema::try_new(
            1,
            vec![
                NestedField::required(1, "id", Type::Primitive(PrimitiveType::Long)),
                NestedField::optional(2, "payload", Type::Primitive(PrimitiveType::String)),
                NestedField::optional(9, "region", Type::Primitive(PrimitiveType::String))
                    .with_initial_default(json!("us-east")),
                NestedField::optional(10, "score", Type::Primitive(PrimitiveType::Double)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_selection() {
        let schema = v2_schema();
        let all = ProjectedSchema::resolve(&schema, &ColumnSelection::All, true).unwrap();
        assert_eq!(all.field_ids().collect::<Vec<_>>(), vec![1, 2, 9, 10]);
        assert_eq!(all.schema_id(), 1);

        let cols =
            ProjectedSchema::resolve(&schema, &ColumnSelection::Columns(vec![9, 1, 9]), true)
                .unwrap();
        assert_eq!(cols.field_ids().collect::<Vec<_>>(), vec![9, 1]);

        let names = ProjectedSchema::resolve(
            &schema,
            &ColumnSelection::Names(vec!["PAYLOAD".into()]),
            false,
        )
        .unwrap();
        assert_eq!(names.field_ids().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_unknown_column() {
        let schema = v2_schema();
        let err = ProjectedSchema::resolve(&schema, &ColumnSelection::Columns(vec![42]), true)
            .unwrap_err();
        assert!(matches!(err, Error::ProjectionError { .. }));

        let err = ProjectedSchema::resolve(
            &schema,
            &ColumnSelection::Names(vec!["PAYLOAD".into()]),
            true,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "projection error: column 'PAYLOAD' not found in schema 1"
        );
    }

    #[test]
    fn test_resolve_against_older_file() {
        let projected =
            ProjectedSchema::resolve(&v2_schema(), &ColumnSelection::All, true).unwrap();
        let resolved = projected.resolve_against(&v1_schema());
        assert_eq!(
            resolved,
            vec![
                (1, FieldSource::Present { name: "id".into() }),
                // renamed since the file was written
                (2, FieldSource::Present { name: "data".into() }),
                (9, FieldSource::Default(json!("us-east"))),
                (10, FieldSource::Null),
            ]
        );
    }

    #[test]
    fn test_serialize() {
        let projected =
            ProjectedSchema::resolve(&v1_schema(), &ColumnSelection::Columns(vec![1]), true)
                .unwrap();
        assert_eq!(
            serde_json::to_value(&projected).unwrap(),
            json!({
                "schema-id": 0,
                "fields": [{"id": 1, "name": "id", "required": true, "type": "long"}]
            })
        );
    }
}
