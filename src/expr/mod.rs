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

//! Row filter predicates
//!
//! Predicates are built over column names with [`Reference`], bound to a
//! schema with [`Predicate::bind`], and then projected onto partition
//! values and evaluated against manifest and file statistics.
//!
//! The JSON form follows the Iceberg REST catalog `Expression` schema:
//!
//! - comparison: `{"type": "gt", "term": "x", "value": 100}`
//! - set: `{"type": "in", "term": "x", "values": [1, 2]}`
//! - unary: `{"type": "is-null", "term": "x"}`
//! - logical: `{"type": "and", "left": {..}, "right": {..}}`, `{"type": "not", "child": {..}}`
//!
//! # Example
//!
//! ```
//! use iceberg_planner::expr::Reference;
//! use iceberg_planner::spec::Datum;
//!
//! // x > 100 AND name starts with "a"
//! let filter = Reference::new("x")
//!     .greater_than(Datum::long(100))
//!     .and(Reference::new("name").starts_with("a"));
//!
//! let json = filter.to_json();
//! ```

mod bound;
mod expression_evaluator;
mod manifest_evaluator;
mod metrics_evaluator;
mod project;
mod residual;

pub use bound::{BoundPredicate, BoundPredicateVisitor, BoundReference, visit};
pub use expression_evaluator::ExpressionEvaluator;
pub use manifest_evaluator::ManifestEvaluator;
pub use metrics_evaluator::InclusiveMetricsEvaluator;
pub use project::InclusiveProjection;
pub use residual::ResidualEvaluator;

use crate::error::{Error, Result};
use crate::spec::values::Datum;
use serde_json::{Value as JsonValue, json};
use std::fmt;
use std::ops::Not;

/// Predicate operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateOperator {
    /// Is null
    IsNull,
    /// Is not null
    NotNull,
    /// Is NaN (floating point columns)
    IsNan,
    /// Is not NaN (floating point columns)
    NotNan,
    /// Less than
    LessThan,
    /// Less than or equal to
    LessThanOrEq,
    /// Greater than
    GreaterThan,
    /// Greater than or equal to
    GreaterThanOrEq,
    /// Equal to
    Eq,
    /// Not equal to
    NotEq,
    /// String starts with
    StartsWith,
    /// String does not start with
    NotStartsWith,
    /// Value is contained in set
    In,
    /// Value is not in set
    NotIn,
}

impl PredicateOperator {
    /// Iceberg REST `Expression` type string
    pub fn as_str(self) -> &'static str {
        match self {
            PredicateOperator::IsNull => "is-null",
            PredicateOperator::NotNull => "not-null",
            PredicateOperator::IsNan => "is-nan",
            PredicateOperator::NotNan => "not-nan",
            PredicateOperator::LessThan => "lt",
            PredicateOperator::LessThanOrEq => "lt-eq",
            PredicateOperator::GreaterThan => "gt",
            PredicateOperator::GreaterThanOrEq => "gt-eq",
            PredicateOperator::Eq => "eq",
            PredicateOperator::NotEq => "not-eq",
            PredicateOperator::StartsWith => "starts-with",
            PredicateOperator::NotStartsWith => "not-starts-with",
            PredicateOperator::In => "in",
            PredicateOperator::NotIn => "not-in",
        }
    }

    /// Parses a REST type string; `lte`, `gte` and `neq` are accepted as aliases
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "is-null" => PredicateOperator::IsNull,
            "not-null" => PredicateOperator::NotNull,
            "is-nan" => PredicateOperator::IsNan,
            "not-nan" => PredicateOperator::NotNan,
            "lt" => PredicateOperator::LessThan,
            "lt-eq" | "lte" => PredicateOperator::LessThanOrEq,
            "gt" => PredicateOperator::GreaterThan,
            "gt-eq" | "gte" => PredicateOperator::GreaterThanOrEq,
            "eq" => PredicateOperator::Eq,
            "not-eq" | "neq" => PredicateOperator::NotEq,
            "starts-with" => PredicateOperator::StartsWith,
            "not-starts-with" => PredicateOperator::NotStartsWith,
            "in" => PredicateOperator::In,
            "not-in" => PredicateOperator::NotIn,
            _ => return None,
        })
    }

    /// Operator matching exactly the rows this one rejects
    pub fn negate(self) -> Self {
        match self {
            PredicateOperator::IsNull => PredicateOperator::NotNull,
            PredicateOperator::NotNull => PredicateOperator::IsNull,
            PredicateOperator::IsNan => PredicateOperator::NotNan,
            PredicateOperator::NotNan => PredicateOperator::IsNan,
            PredicateOperator::LessThan => PredicateOperator::GreaterThanOrEq,
            PredicateOperator::LessThanOrEq => PredicateOperator::GreaterThan,
            PredicateOperator::GreaterThan => PredicateOperator::LessThanOrEq,
            PredicateOperator::GreaterThanOrEq => PredicateOperator::LessThan,
            PredicateOperator::Eq => PredicateOperator::NotEq,
            PredicateOperator::NotEq => PredicateOperator::Eq,
            PredicateOperator::StartsWith => PredicateOperator::NotStartsWith,
            PredicateOperator::NotStartsWith => PredicateOperator::StartsWith,
            PredicateOperator::In => PredicateOperator::NotIn,
            PredicateOperator::NotIn => PredicateOperator::In,
        }
    }

    /// Whether the operator takes no literal
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            PredicateOperator::IsNull
                | PredicateOperator::NotNull
                | PredicateOperator::IsNan
                | PredicateOperator::NotNan
        )
    }

    /// Whether the operator takes a set of literals
    pub fn is_set(self) -> bool {
        matches!(self, PredicateOperator::In | PredicateOperator::NotIn)
    }
}

impl fmt::Display for PredicateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal of an unbound predicate
///
/// Typed literals come from the builder; JSON literals come from parsed
/// REST expressions and only get a type when bound to a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Typed value
    Datum(Datum),
    /// JSON single value, typed at bind time
    Json(JsonValue),
}

impl Literal {
    fn to_json(&self) -> JsonValue {
        match self {
            Literal::Datum(d) => d.to_json(),
            Literal::Json(v) => v.clone(),
        }
    }
}

impl From<Datum> for Literal {
    fn from(value: Datum) -> Self {
        Literal::Datum(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Datum(Datum::int(value))
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Datum(Datum::long(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Datum(Datum::double(value))
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Datum(Datum::bool(value))
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Datum(Datum::string(value))
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Datum(Datum::string(value))
    }
}

/// Unbound row filter over column names
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row
    AlwaysTrue,
    /// Matches no row
    AlwaysFalse,
    /// Both children match
    And(Box<Predicate>, Box<Predicate>),
    /// Either child matches
    Or(Box<Predicate>, Box<Predicate>),
    /// Child does not match
    Not(Box<Predicate>),
    /// `term op`
    Unary {
        term: String,
        op: PredicateOperator,
    },
    /// `term op literal`
    Binary {
        term: String,
        op: PredicateOperator,
        literal: Literal,
    },
    /// `term op (literals...)`
    Set {
        term: String,
        op: PredicateOperator,
        literals: Vec<Literal>,
    },
}

impl Predicate {
    /// Combines this predicate with another using AND
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// Combines this predicate with another using OR
    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// Pushes every NOT down to the leaves by negating operators
    pub fn rewrite_not(self) -> Predicate {
        self.rewrite(false)
    }

    fn rewrite(self, negated: bool) -> Predicate {
        match self {
            Predicate::AlwaysTrue if negated => Predicate::AlwaysFalse,
            Predicate::AlwaysFalse if negated => Predicate::AlwaysTrue,
            Predicate::AlwaysTrue | Predicate::AlwaysFalse => self,
            Predicate::And(l, r) if negated => l.rewrite(true).or(r.rewrite(true)),
            Predicate::And(l, r) => l.rewrite(false).and(r.rewrite(false)),
            Predicate::Or(l, r) if negated => l.rewrite(true).and(r.rewrite(true)),
            Predicate::Or(l, r) => l.rewrite(false).or(r.rewrite(false)),
            Predicate::Not(child) => child.rewrite(!negated),
            Predicate::Unary { term, op } => Predicate::Unary {
                term,
                op: if negated { op.negate() } else { op },
            },
            Predicate::Binary { term, op, literal } => Predicate::Binary {
                term,
                op: if negated { op.negate() } else { op },
                literal,
            },
            Predicate::Set { term, op, literals } => Predicate::Set {
                term,
                op: if negated { op.negate() } else { op },
                literals,
            },
        }
    }

    /// Converts the predicate to the REST JSON expression form
    pub fn to_json(&self) -> JsonValue {
        match self {
            Predicate::AlwaysTrue => json!({"type": "true"}),
            Predicate::AlwaysFalse => json!({"type": "false"}),
            Predicate::And(l, r) => json!({
                "type": "and",
                "left": l.to_json(),
                "right": r.to_json(),
            }),
            Predicate::Or(l, r) => json!({
                "type": "or",
                "left": l.to_json(),
                "right": r.to_json(),
            }),
            Predicate::Not(child) => json!({"type": "not", "child": child.to_json()}),
            Predicate::Unary { term, op } => json!({"type": op.as_str(), "term": term}),
            Predicate::Binary { term, op, literal } => json!({
                "type": op.as_str(),
                "term": term,
                "value": literal.to_json(),
            }),
            Predicate::Set { term, op, literals } => json!({
                "type": op.as_str(),
                "term": term,
                "values": literals.iter().map(Literal::to_json).collect::<Vec<_>>(),
            }),
        }
    }

    /// Parses the REST JSON expression form
    ///
    /// Literals stay untyped until the predicate is bound.
    pub fn from_json(value: &JsonValue) -> Result<Predicate> {
        let invalid = |msg: &str| Error::invalid_argument(format!("filter {value}: {msg}"));
        let kind = match value {
            JsonValue::Bool(true) => return Ok(Predicate::AlwaysTrue),
            JsonValue::Bool(false) => return Ok(Predicate::AlwaysFalse),
            JsonValue::Object(obj) => obj
                .get("type")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| invalid("missing type"))?,
            _ => return Err(invalid("expected an object")),
        };
        let child = |key: &str| -> Result<Predicate> {
            Predicate::from_json(value.get(key).ok_or_else(|| invalid(key))?)
        };
        match kind {
            "true" => return Ok(Predicate::AlwaysTrue),
            "false" => return Ok(Predicate::AlwaysFalse),
            "and" => return Ok(child("left")?.and(child("right")?)),
            "or" => return Ok(child("left")?.or(child("right")?)),
            "not" => return Ok(!child("child")?),
            _ => {}
        }

        let op = PredicateOperator::parse(kind).ok_or_else(|| invalid("unknown type"))?;
        let term = match value.get("term") {
            Some(JsonValue::String(name)) => name.clone(),
            // {"type": "reference", "term": "x"}
            Some(JsonValue::Object(reference)) => reference
                .get("term")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| invalid("unsupported term"))?
                .to_string(),
            _ => return Err(invalid("missing term")),
        };
        if op.is_unary() {
            return Ok(Predicate::Unary { term, op });
        }
        if op.is_set() {
            let literals = value
                .get("values")
                .and_then(JsonValue::as_array)
                .ok_or_else(|| invalid("missing values"))?
                .iter()
                .cloned()
                .map(Literal::Json)
                .collect();
            return Ok(Predicate::Set { term, op, literals });
        }
        let literal = value.get("value").ok_or_else(|| invalid("missing value"))?;
        Ok(Predicate::Binary {
            term,
            op,
            literal: Literal::Json(literal.clone()),
        })
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Named column reference, the starting point of the predicate builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    name: String,
}

impl Reference {
    /// References a column by its (dotted) name
    pub fn new(name: impl Into<String>) -> Self {
        Reference { name: name.into() }
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn unary(self, op: PredicateOperator) -> Predicate {
        Predicate::Unary {
            term: self.name,
            op,
        }
    }

    fn binary(self, op: PredicateOperator, literal: impl Into<Literal>) -> Predicate {
        Predicate::Binary {
            term: self.name,
            op,
            literal: literal.into(),
        }
    }

    fn set<L: Into<Literal>>(
        self,
        op: PredicateOperator,
        literals: impl IntoIterator<Item = L>,
    ) -> Predicate {
        Predicate::Set {
            term: self.name,
            op,
            literals: literals.into_iter().map(Into::into).collect(),
        }
    }

    /// `column IS NULL`
    pub fn is_null(self) -> Predicate {
        self.unary(PredicateOperator::IsNull)
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(self) -> Predicate {
        self.unary(PredicateOperator::NotNull)
    }

    /// `column IS NAN`
    pub fn is_nan(self) -> Predicate {
        self.unary(PredicateOperator::IsNan)
    }

    /// `column IS NOT NAN`
    pub fn is_not_nan(self) -> Predicate {
        self.unary(PredicateOperator::NotNan)
    }

    /// `column < value`
    pub fn less_than(self, value: impl Into<Literal>) -> Predicate {
        self.binary(PredicateOperator::LessThan, value)
    }

    /// `column <= value`
    pub fn less_than_or_equal_to(self, value: impl Into<Literal>) -> Predicate {
        self.binary(PredicateOperator::LessThanOrEq, value)
    }

    /// `column > value`
    pub fn greater_than(self, value: impl Into<Literal>) -> Predicate {
        self.binary(PredicateOperator::GreaterThan, value)
    }

    /// `column >= value`
    pub fn greater_than_or_equal_to(self, value: impl Into<Literal>) -> Predicate {
        self.binary(PredicateOperator::GreaterThanOrEq, value)
    }

    /// `column = value`
    pub fn equal_to(self, value: impl Into<Literal>) -> Predicate {
        self.binary(PredicateOperator::Eq, value)
    }

    /// `column != value`
    pub fn not_equal_to(self, value: impl Into<Literal>) -> Predicate {
        self.binary(PredicateOperator::NotEq, value)
    }

    /// `column LIKE 'prefix%'`
    pub fn starts_with(self, prefix: impl Into<String>) -> Predicate {
        self.binary(PredicateOperator::StartsWith, prefix.into())
    }

    /// `column NOT LIKE 'prefix%'`
    pub fn not_starts_with(self, prefix: impl Into<String>) -> Predicate {
        self.binary(PredicateOperator::NotStartsWith, prefix.into())
    }

    /// `column IN (values...)`
    pub fn is_in<L: Into<Literal>>(self, values: impl IntoIterator<Item = L>) -> Predicate {
        self.set(PredicateOperator::In, values)
    }

    /// `column NOT IN (values...)`
    pub fn is_not_in<L: Into<Literal>>(self, values: impl IntoIterator<Item = L>) -> Predicate {
        self.set(PredicateOperator::NotIn, values)
    }

    /// `column >= lower AND column <= upper`
    pub fn between(self, lower: impl Into<Literal>, upper: impl Into<Literal>) -> Predicate {
        self.clone()
            .greater_than_or_equal_to(lower)
            .and(self.less_than_or_equal_to(upper))
    }
}

/// ANDs every predicate together; an empty list matches everything
pub fn and_all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let mut iter = predicates.into_iter();
    match iter.next() {
        Some(first) => iter.fold(first, Predicate::and),
        None => Predicate::AlwaysTrue,
    }
}

/// ORs every predicate together; an empty list matches nothing
pub fn or_all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    let mut iter = predicates.into_iter();
    match iter.next() {
        Some(first) => iter.fold(first, Predicate::or),
        None => Predicate::AlwaysFalse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format_matches_rest_expression() {
        assert_eq!(
            Reference::new("id").equal_to(42).to_json(),
            json!({"type": "eq", "term": "id", "value": 42})
        );
        assert_eq!(
            Reference::new("id").greater_than(Datum::long(100)).to_json(),
            json!({"type": "gt", "term": "id", "value": 100})
        );
        assert_eq!(
            Reference::new("nullable_col").is_null().to_json(),
            json!({"type": "is-null", "term": "nullable_col"})
        );
        assert_eq!(
            Reference::new("status").is_in(["active", "pending"]).to_json(),
            json!({"type": "in", "term": "status", "values": ["active", "pending"]})
        );
        assert_eq!(
            (!Reference::new("deleted").equal_to(true)).to_json(),
            json!({
                "type": "not",
                "child": {"type": "eq", "term": "deleted", "value": true}
            })
        );
    }

    #[test]
    fn test_between_filter() {
        let filter = Reference::new("age").between(18, 65);
        assert_eq!(
            filter.to_json(),
            json!({
                "type": "and",
                "left": {"type": "gt-eq", "term": "age", "value": 18},
                "right": {"type": "lt-eq", "term": "age", "value": 65}
            })
        );
    }

    #[test]
    fn test_from_json() {
        let parsed = Predicate::from_json(&json!({
            "type": "or",
            "left": {"type": "gte", "term": "age", "value": 18},
            "right": {"type": "not", "child": {"type": "is-null", "term": {"type": "reference", "term": "name"}}}
        }))
        .unwrap();
        assert_eq!(
            parsed,
            Predicate::Binary {
                term: "age".into(),
                op: PredicateOperator::GreaterThanOrEq,
                literal: Literal::Json(json!(18)),
            }
            .or(!Reference::new("name").is_null())
        );

        let round_trip = Reference::new("x").is_not_in([1, 2, 3]);
        let reparsed = Predicate::from_json(&round_trip.to_json()).unwrap();
        assert_eq!(reparsed.to_json(), round_trip.to_json());

        assert!(Predicate::from_json(&json!({"type": "like", "term": "x"})).is_err());
        assert!(Predicate::from_json(&json!({"type": "eq", "term": "x"})).is_err());
        assert!(Predicate::from_json(&json!([1])).is_err());
    }

    #[test]
    fn test_rewrite_not() {
        let filter = !(Reference::new("a")
            .less_than(5)
            .and(!Reference::new("b").is_in([1, 2])));
        assert_eq!(
            filter.rewrite_not(),
            Reference::new("a")
                .greater_than_or_equal_to(5)
                .or(Reference::new("b").is_in([1, 2]))
        );
        assert_eq!((!Predicate::AlwaysTrue).rewrite_not(), Predicate::AlwaysFalse);
    }

    #[test]
    fn test_and_all_or_all() {
        assert_eq!(and_all(Vec::new()), Predicate::AlwaysTrue);
        assert_eq!(or_all(Vec::new()), Predicate::AlwaysFalse);
        let combined = and_all([
            Reference::new("a").is_null(),
            Reference::new("b").is_null(),
            Reference::new("c").is_null(),
        ]);
        assert_eq!(
            combined,
            Reference::new("a")
                .is_null()
                .and(Reference::new("b").is_null())
                .and(Reference::new("c").is_null())
        );
    }
}
