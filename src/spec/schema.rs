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

//! Table schema with a field-id index
//!
//! Every schema version keeps an explicit `field id -> field` table covering
//! nested fields. Column resolution across schema versions always goes
//! through these ids; names are only used to resolve user input.

use crate::error::{Error, Result};
use crate::spec::datatypes::{NestedField, PrimitiveType, StructType, Type};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Iceberg table schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "SchemaRepr", into = "SchemaRepr")]
pub struct Schema {
    schema_id: i32,
    fields: StructType,
    identifier_field_ids: Option<Vec<i32>>,

    id_to_field: HashMap<i32, NestedField>,
    name_to_id: HashMap<String, i32>,
    lowercase_name_to_id: HashMap<String, i32>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.schema_id == other.schema_id
            && self.fields == other.fields
            && self.identifier_field_ids == other.identifier_field_ids
    }
}

impl Schema {
    /// Builds a schema and its id index
    ///
    /// Fails when a field id appears twice anywhere in the tree.
    pub fn try_new(schema_id: i32, fields: Vec<NestedField>) -> Result<Schema> {
        let mut schema = Schema {
            schema_id,
            fields: StructType::new(fields),
            identifier_field_ids: None,
            id_to_field: HashMap::new(),
            name_to_id: HashMap::new(),
            lowercase_name_to_id: HashMap::new(),
        };
        schema.build_index()?;
        Ok(schema)
    }

    /// Sets the identifier field ids
    pub fn with_identifier_field_ids(mut self, ids: Vec<i32>) -> Self {
        self.identifier_field_ids = Some(ids);
        self
    }

    fn build_index(&mut self) -> Result<()> {
        let mut stack: Vec<(String, &NestedField)> = self
            .fields
            .fields
            .iter()
            .rev()
            .map(|f| (f.name.clone(), f))
            .collect();

        while let Some((path, field)) = stack.pop() {
            if self.id_to_field.insert(field.id, field.clone()).is_some() {
                return Err(Error::metadata_corrupt(format!(
                    "schema {}: duplicate field id {}",
                    self.schema_id, field.id
                )));
            }
            self.lowercase_name_to_id
                .entry(path.to_lowercase())
                .or_insert(field.id);
            self.name_to_id.insert(path.clone(), field.id);

            for child in field.field_type.child_fields().into_iter().rev() {
                stack.push((format!("{path}.{}", child.name), child));
            }
        }
        Ok(())
    }

    /// Schema version identifier
    pub fn schema_id(&self) -> i32 {
        self.schema_id
    }

    /// Top-level fields in declaration order
    pub fn fields(&self) -> &[NestedField] {
        &self.fields.fields
    }

    /// Schema as a struct type
    pub fn as_struct(&self) -> &StructType {
        &self.fields
    }

    /// Identifier field ids, when declared
    pub fn identifier_field_ids(&self) -> Option<&[i32]> {
        self.identifier_field_ids.as_deref()
    }

    /// Looks up any field, nested or not, by id
    pub fn field_by_id(&self, id: i32) -> Option<&NestedField> {
        self.id_to_field.get(&id)
    }

    /// Looks up a field by its dotted name
    pub fn field_by_name(&self, name: &str, case_sensitive: bool) -> Option<&NestedField> {
        self.field_id_by_name(name, case_sensitive)
            .and_then(|id| self.field_by_id(id))
    }

    /// Resolves a dotted column name to its field id
    pub fn field_id_by_name(&self, name: &str, case_sensitive: bool) -> Option<i32> {
        if case_sensitive {
            self.name_to_id.get(name).copied()
        } else {
            self.lowercase_name_to_id
                .get(&name.to_lowercase())
                .copied()
        }
    }

    /// Primitive type of a field, if it is primitive
    pub fn primitive_type(&self, id: i32) -> Option<&PrimitiveType> {
        self.field_by_id(id)
            .and_then(|f| f.field_type.as_primitive())
    }

    /// Every field id in the schema, nested ones included
    pub fn field_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.id_to_field.keys().copied()
    }

    /// Highest field id in the schema, or 0 when empty
    pub fn highest_field_id(&self) -> i32 {
        self.id_to_field.keys().copied().max().unwrap_or(0)
    }

    /// Dotted name of a field id
    pub fn name_by_field_id(&self, id: i32) -> Option<&str> {
        self.name_to_id
            .iter()
            .find(|(_, field_id)| **field_id == id)
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Serialize, Deserialize)]
struct SchemaRepr {
    #[serde(rename = "type", default = "struct_type_name")]
    type_name: String,
    #[serde(rename = "schema-id", default)]
    schema_id: i32,
    #[serde(
        rename = "identifier-field-ids",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    identifier_field_ids: Option<Vec<i32>>,
    fields: Vec<NestedField>,
}

fn struct_type_name() -> String {
    "struct".to_string()
}

impl TryFrom<SchemaRepr> for Schema {
    type Error = Error;

    fn try_from(repr: SchemaRepr) -> Result<Schema> {
        if repr.type_name != "struct" {
            return Err(Error::metadata_corrupt(format!(
                "schema type must be 'struct', found '{}'",
                repr.type_name
            )));
        }
        let schema = Schema::try_new(repr.schema_id, repr.fields)?;
        Ok(match repr.identifier_field_ids {
            Some(ids) => schema.with_identifier_field_ids(ids),
            None => schema,
        })
    }
}

impl From<Schema> for SchemaRepr {
    fn from(schema: Schema) -> Self {
        SchemaRepr {
            type_name: struct_type_name(),
            schema_id: schema.schema_id,
            identifier_field_ids: schema.identifier_field_ids,
            fields: schema.fields.fields,
        }
    }
}

impl From<Schema> for Type {
    fn from(schema: Schema) -> Self {
        Type::Struct(schema.fields)
    }
}
