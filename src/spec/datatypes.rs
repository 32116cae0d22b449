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

//! Iceberg data types
//!
//! Primitive types serialize as plain strings (`"long"`, `"decimal(9, 2)"`,
//! `"fixed[16]"`); nested types as objects tagged by `"type"`.
//!
//! # References
//!
//! - [Schemas and Data Types](https://iceberg.apache.org/spec/#schemas-and-data-types)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest decimal precision allowed by the table format
pub const MAX_DECIMAL_PRECISION: u32 = 38;

static DECIMAL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^decimal\(\s*(?P<p>\d+)\s*,\s*(?P<s>\d+)\s*\)$").expect("valid decimal regex")
});

static FIXED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^fixed\[\s*(?P<l>\d+)\s*\]$").expect("valid fixed regex"));

// ============================================================================
// Primitive Types
// ============================================================================

/// Primitive data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Boolean value
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit IEEE 754 floating point
    Float,
    /// 64-bit IEEE 754 floating point
    Double,
    /// Fixed-point decimal
    Decimal {
        /// Total number of digits
        precision: u32,
        /// Number of digits after decimal point
        scale: u32,
    },
    /// Calendar date, days from 1970-01-01
    Date,
    /// Time of day, microseconds from midnight
    Time,
    /// Timestamp without timezone, microseconds from epoch
    Timestamp,
    /// Timestamp with timezone, microseconds from epoch in UTC
    Timestamptz,
    /// UTF-8 character string
    String,
    /// UUID
    Uuid,
    /// Fixed-length byte array
    Fixed(u64),
    /// Variable-length byte array
    Binary,
}

impl PrimitiveType {
    /// Whether values of this type can be NaN
    pub fn is_floating_point(&self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// Whether a value written as `self` can be read as `target`
    ///
    /// Covers the type promotions schema evolution allows.
    pub fn promotes_to(&self, target: &PrimitiveType) -> bool {
        match (self, target) {
            (a, b) if a == b => true,
            (PrimitiveType::Int, PrimitiveType::Long) => true,
            (PrimitiveType::Float, PrimitiveType::Double) => true,
            (
                PrimitiveType::Decimal {
                    precision: p1,
                    scale: s1,
                },
                PrimitiveType::Decimal {
                    precision: p2,
                    scale: s2,
                },
            ) => s1 == s2 && p1 <= p2,
            _ => false,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::Boolean => write!(f, "boolean"),
            PrimitiveType::Int => write!(f, "int"),
            PrimitiveType::Long => write!(f, "long"),
            PrimitiveType::Float => write!(f, "float"),
            PrimitiveType::Double => write!(f, "double"),
            PrimitiveType::Decimal { precision, scale } => {
                write!(f, "decimal({precision}, {scale})")
            }
            PrimitiveType::Date => write!(f, "date"),
            PrimitiveType::Time => write!(f, "time"),
            PrimitiveType::Timestamp => write!(f, "timestamp"),
            PrimitiveType::Timestamptz => write!(f, "timestamptz"),
            PrimitiveType::String => write!(f, "string"),
            PrimitiveType::Uuid => write!(f, "uuid"),
            PrimitiveType::Fixed(length) => write!(f, "fixed[{length}]"),
            PrimitiveType::Binary => write!(f, "binary"),
        }
    }
}

impl std::str::FromStr for PrimitiveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s {
            "boolean" => PrimitiveType::Boolean,
            "int" => PrimitiveType::Int,
            "long" => PrimitiveType::Long,
            "float" => PrimitiveType::Float,
            "double" => PrimitiveType::Double,
            "date" => PrimitiveType::Date,
            "time" => PrimitiveType::Time,
            "timestamp" => PrimitiveType::Timestamp,
            "timestamptz" => PrimitiveType::Timestamptz,
            "string" => PrimitiveType::String,
            "uuid" => PrimitiveType::Uuid,
            "binary" => PrimitiveType::Binary,
            other => {
                if let Some(caps) = DECIMAL_REGEX.captures(other) {
                    let precision: u32 = caps["p"]
                        .parse()
                        .map_err(|e| format!("invalid decimal precision: {e}"))?;
                    let scale: u32 = caps["s"]
                        .parse()
                        .map_err(|e| format!("invalid decimal scale: {e}"))?;
                    if precision == 0 || precision > MAX_DECIMAL_PRECISION || scale > precision {
                        return Err(format!("invalid decimal type '{other}'"));
                    }
                    PrimitiveType::Decimal { precision, scale }
                } else if let Some(caps) = FIXED_REGEX.captures(other) {
                    let length: u64 = caps["l"]
                        .parse()
                        .map_err(|e| format!("invalid fixed length: {e}"))?;
                    PrimitiveType::Fixed(length)
                } else {
                    return Err(format!("unknown primitive type '{other}'"));
                }
            }
        };
        Ok(ty)
    }
}

impl Serialize for PrimitiveType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PrimitiveType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ============================================================================
// Nested Types
// ============================================================================

/// A field within a schema, struct, list or map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedField {
    /// Field id, unique across every schema version of a table
    pub id: i32,
    /// Field name
    pub name: String,
    /// Whether this field is required (not null)
    pub required: bool,
    /// Field data type
    #[serde(rename = "type")]
    pub field_type: Box<Type>,
    /// Optional documentation for this field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Value read for this field from files written before it existed
    #[serde(
        rename = "initial-default",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_default: Option<serde_json::Value>,
    /// Value used for this field when a writer does not supply one
    #[serde(
        rename = "write-default",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub write_default: Option<serde_json::Value>,
}

impl NestedField {
    fn new(id: i32, name: impl Into<String>, field_type: Type, required: bool) -> Self {
        NestedField {
            id,
            name: name.into(),
            required,
            field_type: Box::new(field_type),
            doc: None,
            initial_default: None,
            write_default: None,
        }
    }

    /// Creates a required field
    pub fn required(id: i32, name: impl Into<String>, field_type: Type) -> Self {
        Self::new(id, name, field_type, true)
    }

    /// Creates an optional field
    pub fn optional(id: i32, name: impl Into<String>, field_type: Type) -> Self {
        Self::new(id, name, field_type, false)
    }

    /// Sets the field documentation
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Sets the default read for files that predate the field
    pub fn with_initial_default(mut self, value: serde_json::Value) -> Self {
        self.initial_default = Some(value);
        self
    }
}

/// Struct type with ordered fields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructType {
    /// Fields in declaration order
    pub fields: Vec<NestedField>,
}

impl StructType {
    /// Creates a struct type from its fields
    pub fn new(fields: Vec<NestedField>) -> Self {
        StructType { fields }
    }

    /// Looks up a direct child field by id
    pub fn field_by_id(&self, id: i32) -> Option<&NestedField> {
        self.fields.iter().find(|f| f.id == id)
    }
}

/// List type with a single element field
#[derive(Debug, Clone, PartialEq)]
pub struct ListType {
    /// Element field, named `element`
    pub element_field: NestedField,
}

/// Map type with key and value fields
#[derive(Debug, Clone, PartialEq)]
pub struct MapType {
    /// Key field, always required
    pub key_field: NestedField,
    /// Value field
    pub value_field: NestedField,
}

/// Iceberg field types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TypeRepr", into = "TypeRepr")]
pub enum Type {
    /// Primitive types (int, long, string, etc.)
    Primitive(PrimitiveType),
    /// Struct type with nested fields
    Struct(StructType),
    /// List (array) type
    List(ListType),
    /// Map (key-value) type
    Map(MapType),
}

impl Type {
    /// Returns the primitive type, if this is one
    pub fn as_primitive(&self) -> Option<&PrimitiveType> {
        match self {
            Type::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// Child fields of a nested type, in declaration order
    pub fn child_fields(&self) -> Vec<&NestedField> {
        match self {
            Type::Primitive(_) => Vec::new(),
            Type::Struct(s) => s.fields.iter().collect(),
            Type::List(l) => vec![&l.element_field],
            Type::Map(m) => vec![&m.key_field, &m.value_field],
        }
    }
}

impl From<PrimitiveType> for Type {
    fn from(p: PrimitiveType) -> Self {
        Type::Primitive(p)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{p}"),
            Type::Struct(_) => write!(f, "struct"),
            Type::List(l) => write!(f, "list<{}>", l.element_field.field_type),
            Type::Map(m) => write!(
                f,
                "map<{}, {}>",
                m.key_field.field_type, m.value_field.field_type
            ),
        }
    }
}

// Wire representation: a bare string for primitives, a tagged object otherwise
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TypeRepr {
    Primitive(PrimitiveType),
    Nested(NestedRepr),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum NestedRepr {
    Struct {
        fields: Vec<NestedField>,
    },
    List {
        #[serde(rename = "element-id")]
        element_id: i32,
        #[serde(rename = "element-required")]
        element_required: bool,
        element: Box<Type>,
    },
    Map {
        #[serde(rename = "key-id")]
        key_id: i32,
        key: Box<Type>,
        #[serde(rename = "value-id")]
        value_id: i32,
        #[serde(rename = "value-required")]
        value_required: bool,
        value: Box<Type>,
    },
}

impl From<TypeRepr> for Type {
    fn from(repr: TypeRepr) -> Self {
        match repr {
            TypeRepr::Primitive(p) => Type::Primitive(p),
            TypeRepr::Nested(NestedRepr::Struct { fields }) => Type::Struct(StructType { fields }),
            TypeRepr::Nested(NestedRepr::List {
                element_id,
                element_required,
                element,
            }) => Type::List(ListType {
                element_field: NestedField::new(element_id, "element", *element, element_required),
            }),
            TypeRepr::Nested(NestedRepr::Map {
                key_id,
                key,
                value_id,
                value_required,
                value,
            }) => Type::Map(MapType {
                key_field: NestedField::new(key_id, "key", *key, true),
                value_field: NestedField::new(value_id, "value", *value, value_required),
            }),
        }
    }
}

impl From<Type> for TypeRepr {
    fn from(ty: Type) -> Self {
        match ty {
            Type::Primitive(p) => TypeRepr::Primitive(p),
            Type::Struct(s) => TypeRepr::Nested(NestedRepr::Struct { fields: s.fields }),
            Type::List(l) => TypeRepr::Nested(NestedRepr::List {
                element_id: l.element_field.id,
                element_required: l.element_field.required,
                element: l.element_field.field_type,
            }),
            Type::Map(m) => TypeRepr::Nested(NestedRepr::Map {
                key_id: m.key_field.id,
                key: m.key_field.field_type,
                value_id: m.value_field.id,
                value_required: m.value_field.required,
                value: m.value_field.field_type,
            }),
        }
    }
}
