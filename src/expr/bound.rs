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

//! Predicates bound to field ids and typed literals

use super::{Literal, Predicate, PredicateOperator};
use crate::error::{Error, Result};
use crate::spec::datatypes::PrimitiveType;
use crate::spec::schema::Schema;
use crate::spec::values::{Datum, PrimitiveLiteral};
use serde::{Serialize, Serializer};
use serde_json::{Value as JsonValue, json};

/// Column resolved against a schema (or a partition tuple)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundReference {
    field_id: i32,
    name: String,
    field_type: PrimitiveType,
    required: bool,
}

impl BoundReference {
    pub fn new(
        field_id: i32,
        name: impl Into<String>,
        field_type: PrimitiveType,
        required: bool,
    ) -> Self {
        BoundReference {
            field_id,
            name: name.into(),
            field_type,
            required,
        }
    }

    pub fn field_id(&self) -> i32 {
        self.field_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &PrimitiveType {
        &self.field_type
    }

    pub fn required(&self) -> bool {
        self.required
    }
}

/// Predicate with resolved columns and literals typed to match them
///
/// Bound predicates never contain NOT: negations are pushed into the
/// operators before binding.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundPredicate {
    /// Matches every row
    AlwaysTrue,
    /// Matches no row
    AlwaysFalse,
    /// Both children match
    And(Box<BoundPredicate>, Box<BoundPredicate>),
    /// Either child matches
    Or(Box<BoundPredicate>, Box<BoundPredicate>),
    /// `term op`
    Unary {
        term: BoundReference,
        op: PredicateOperator,
    },
    /// `term op literal`
    Binary {
        term: BoundReference,
        op: PredicateOperator,
        literal: Datum,
    },
    /// `term op (literals...)`, with at least two distinct literals
    Set {
        term: BoundReference,
        op: PredicateOperator,
        literals: Vec<Datum>,
    },
}

impl BoundPredicate {
    /// AND with constant folding
    pub fn and(self, other: BoundPredicate) -> BoundPredicate {
        match (self, other) {
            (BoundPredicate::AlwaysFalse, _) | (_, BoundPredicate::AlwaysFalse) => {
                BoundPredicate::AlwaysFalse
            }
            (BoundPredicate::AlwaysTrue, p) | (p, BoundPredicate::AlwaysTrue) => p,
            (l, r) => BoundPredicate::And(Box::new(l), Box::new(r)),
        }
    }

    /// OR with constant folding
    pub fn or(self, other: BoundPredicate) -> BoundPredicate {
        match (self, other) {
            (BoundPredicate::AlwaysTrue, _) | (_, BoundPredicate::AlwaysTrue) => {
                BoundPredicate::AlwaysTrue
            }
            (BoundPredicate::AlwaysFalse, p) | (p, BoundPredicate::AlwaysFalse) => p,
            (l, r) => BoundPredicate::Or(Box::new(l), Box::new(r)),
        }
    }

    /// REST JSON expression form, with column names as terms
    pub fn to_json(&self) -> JsonValue {
        match self {
            BoundPredicate::AlwaysTrue => json!({"type": "true"}),
            BoundPredicate::AlwaysFalse => json!({"type": "false"}),
            BoundPredicate::And(l, r) => json!({
                "type": "and",
                "left": l.to_json(),
                "right": r.to_json(),
            }),
            BoundPredicate::Or(l, r) => json!({
                "type": "or",
                "left": l.to_json(),
                "right": r.to_json(),
            }),
            BoundPredicate::Unary { term, op } => json!({"type": op.as_str(), "term": term.name}),
            BoundPredicate::Binary { term, op, literal } => json!({
                "type": op.as_str(),
                "term": term.name,
                "value": literal.to_json(),
            }),
            BoundPredicate::Set { term, op, literals } => json!({
                "type": op.as_str(),
                "term": term.name,
                "values": literals.iter().map(Datum::to_json).collect::<Vec<_>>(),
            }),
        }
    }

    /// Rebuilds the predicate, replacing every leaf through `f`
    pub(crate) fn map_leaves(
        &self,
        f: &mut impl FnMut(&BoundPredicate) -> Result<BoundPredicate>,
    ) -> Result<BoundPredicate> {
        Ok(match self {
            BoundPredicate::And(l, r) => l.map_leaves(f)?.and(r.map_leaves(f)?),
            BoundPredicate::Or(l, r) => l.map_leaves(f)?.or(r.map_leaves(f)?),
            leaf => f(leaf)?,
        })
    }
}

impl Serialize for BoundPredicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Literal lined up with a column type
enum Coerced {
    Value(Datum),
    /// Larger than any value of the column type
    AboveMax,
    /// Smaller than any value of the column type
    BelowMin,
}

fn out_of_int_range(value: i64) -> Option<Coerced> {
    if value > i64::from(i32::MAX) {
        Some(Coerced::AboveMax)
    } else if value < i64::from(i32::MIN) {
        Some(Coerced::BelowMin)
    } else {
        None
    }
}

fn coerce(literal: &Literal, term: &BoundReference) -> Result<Coerced> {
    let ty = &term.field_type;
    let mismatch = || {
        Error::predicate_type(format!(
            "literal {} cannot be compared with column '{}' of type {ty}",
            match literal {
                Literal::Datum(d) => d.to_string(),
                Literal::Json(v) => v.to_string(),
            },
            term.name
        ))
    };
    let datum = match literal {
        Literal::Datum(d) => match d.to(ty) {
            Ok(v) => v,
            Err(_) => match (d.literal(), ty) {
                (PrimitiveLiteral::Long(v), PrimitiveType::Int) => {
                    return out_of_int_range(*v).ok_or_else(mismatch);
                }
                (PrimitiveLiteral::String(s), _) => {
                    Datum::try_from_json(&JsonValue::String(s.clone()), ty)
                        .map_err(|_| mismatch())?
                }
                _ => return Err(mismatch()),
            },
        },
        Literal::Json(v) => match Datum::try_from_json(v, ty) {
            Ok(d) => d,
            Err(_) => match (v.as_i64(), ty) {
                (Some(n), PrimitiveType::Int) => return out_of_int_range(n).ok_or_else(mismatch),
                _ => return Err(mismatch()),
            },
        },
    };
    Ok(Coerced::Value(datum))
}

fn bind_reference(term: &str, schema: &Schema, case_sensitive: bool) -> Result<BoundReference> {
    let field = schema
        .field_by_name(term, case_sensitive)
        .ok_or_else(|| {
            Error::projection(format!(
                "column '{term}' not found in schema {}",
                schema.schema_id()
            ))
        })?;
    let field_type = field.field_type.as_primitive().ok_or_else(|| {
        Error::predicate_type(format!(
            "column '{term}' has nested type {} and cannot be filtered",
            field.field_type
        ))
    })?;
    Ok(BoundReference::new(
        field.id,
        term,
        *field_type,
        field.required,
    ))
}

impl Predicate {
    /// Resolves column names against `schema` and types every literal
    ///
    /// NOT is pushed down first. Unknown columns fail with
    /// `ProjectionError`; literals that cannot be coerced to the column
    /// type fail with `PredicateTypeError`.
    pub fn bind(&self, schema: &Schema, case_sensitive: bool) -> Result<BoundPredicate> {
        self.clone().rewrite_not().bind_rewritten(schema, case_sensitive)
    }

    fn bind_rewritten(&self, schema: &Schema, case_sensitive: bool) -> Result<BoundPredicate> {
        match self {
            Predicate::AlwaysTrue => Ok(BoundPredicate::AlwaysTrue),
            Predicate::AlwaysFalse => Ok(BoundPredicate::AlwaysFalse),
            Predicate::And(l, r) => Ok(l
                .bind_rewritten(schema, case_sensitive)?
                .and(r.bind_rewritten(schema, case_sensitive)?)),
            Predicate::Or(l, r) => Ok(l
                .bind_rewritten(schema, case_sensitive)?
                .or(r.bind_rewritten(schema, case_sensitive)?)),
            Predicate::Not(child) => child
                .clone()
                .rewrite_not()
                .bind_rewritten(schema, case_sensitive),
            Predicate::Unary { term, op } => {
                bind_unary(bind_reference(term, schema, case_sensitive)?, *op)
            }
            Predicate::Binary { term, op, literal } => {
                bind_binary(bind_reference(term, schema, case_sensitive)?, *op, literal)
            }
            Predicate::Set { term, op, literals } => {
                bind_set(bind_reference(term, schema, case_sensitive)?, *op, literals)
            }
        }
    }
}

fn bind_unary(term: BoundReference, op: PredicateOperator) -> Result<BoundPredicate> {
    match op {
        PredicateOperator::IsNull if term.required => Ok(BoundPredicate::AlwaysFalse),
        PredicateOperator::NotNull if term.required => Ok(BoundPredicate::AlwaysTrue),
        PredicateOperator::IsNan | PredicateOperator::NotNan
            if !term.field_type.is_floating_point() =>
        {
            Err(Error::predicate_type(format!(
                "{op} needs a floating point column, '{}' is {}",
                term.name, term.field_type
            )))
        }
        _ => Ok(BoundPredicate::Unary { term, op }),
    }
}

fn bind_binary(
    term: BoundReference,
    op: PredicateOperator,
    literal: &Literal,
) -> Result<BoundPredicate> {
    if matches!(
        op,
        PredicateOperator::StartsWith | PredicateOperator::NotStartsWith
    ) && term.field_type != PrimitiveType::String
    {
        return Err(Error::predicate_type(format!(
            "{op} needs a string column, '{}' is {}",
            term.name, term.field_type
        )));
    }
    let literal = match coerce(literal, &term)? {
        Coerced::Value(d) => d,
        Coerced::AboveMax => {
            return Ok(match op {
                PredicateOperator::LessThan
                | PredicateOperator::LessThanOrEq
                | PredicateOperator::NotEq => BoundPredicate::AlwaysTrue,
                _ => BoundPredicate::AlwaysFalse,
            });
        }
        Coerced::BelowMin => {
            return Ok(match op {
                PredicateOperator::GreaterThan
                | PredicateOperator::GreaterThanOrEq
                | PredicateOperator::NotEq => BoundPredicate::AlwaysTrue,
                _ => BoundPredicate::AlwaysFalse,
            });
        }
    };
    if literal.is_nan() {
        return Err(Error::predicate_type(format!(
            "NaN literal in {op} on '{}', use is-nan instead",
            term.name
        )));
    }
    Ok(BoundPredicate::Binary { term, op, literal })
}

fn bind_set(
    term: BoundReference,
    op: PredicateOperator,
    literals: &[Literal],
) -> Result<BoundPredicate> {
    let mut values: Vec<Datum> = Vec::with_capacity(literals.len());
    for literal in literals {
        // Values outside the column range can never be equal to a row
        if let Coerced::Value(d) = coerce(literal, &term)? {
            if d.is_nan() {
                return Err(Error::predicate_type(format!(
                    "NaN literal in {op} on '{}', use is-nan instead",
                    term.name
                )));
            }
            if !values.contains(&d) {
                values.push(d);
            }
        }
    }
    let single = match op {
        PredicateOperator::In => PredicateOperator::Eq,
        _ => PredicateOperator::NotEq,
    };
    Ok(match values.len() {
        0 if op == PredicateOperator::In => BoundPredicate::AlwaysFalse,
        0 => BoundPredicate::AlwaysTrue,
        1 => BoundPredicate::Binary {
            term,
            op: single,
            literal: values.remove(0),
        },
        _ => BoundPredicate::Set {
            term,
            op,
            literals: values,
        },
    })
}

/// Visitor over the leaves of a bound predicate
///
/// The evaluators implement this to answer "might rows match?" against
/// manifest summaries, partition tuples and column metrics.
pub trait BoundPredicateVisitor {
    type T;

    fn always_true(&mut self) -> Result<Self::T>;
    fn always_false(&mut self) -> Result<Self::T>;
    fn and(&mut self, lhs: Self::T, rhs: Self::T) -> Result<Self::T>;
    fn or(&mut self, lhs: Self::T, rhs: Self::T) -> Result<Self::T>;

    fn is_null(&mut self, term: &BoundReference) -> Result<Self::T>;
    fn not_null(&mut self, term: &BoundReference) -> Result<Self::T>;
    fn is_nan(&mut self, term: &BoundReference) -> Result<Self::T>;
    fn not_nan(&mut self, term: &BoundReference) -> Result<Self::T>;

    fn less_than(&mut self, term: &BoundReference, literal: &Datum) -> Result<Self::T>;
    fn less_than_or_eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<Self::T>;
    fn greater_than(&mut self, term: &BoundReference, literal: &Datum) -> Result<Self::T>;
    fn greater_than_or_eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<Self::T>;
    fn eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<Self::T>;
    fn not_eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<Self::T>;
    fn starts_with(&mut self, term: &BoundReference, literal: &Datum) -> Result<Self::T>;
    fn not_starts_with(&mut self, term: &BoundReference, literal: &Datum) -> Result<Self::T>;

    fn is_in(&mut self, term: &BoundReference, literals: &[Datum]) -> Result<Self::T>;
    fn not_in(&mut self, term: &BoundReference, literals: &[Datum]) -> Result<Self::T>;
}

/// Walks `predicate` bottom-up with `visitor`
pub fn visit<V: BoundPredicateVisitor>(
    visitor: &mut V,
    predicate: &BoundPredicate,
) -> Result<V::T> {
    match predicate {
        BoundPredicate::AlwaysTrue => visitor.always_true(),
        BoundPredicate::AlwaysFalse => visitor.always_false(),
        BoundPredicate::And(l, r) => {
            let lhs = visit(visitor, l)?;
            let rhs = visit(visitor, r)?;
            visitor.and(lhs, rhs)
        }
        BoundPredicate::Or(l, r) => {
            let lhs = visit(visitor, l)?;
            let rhs = visit(visitor, r)?;
            visitor.or(lhs, rhs)
        }
        BoundPredicate::Unary { term, op } => match op {
            PredicateOperator::IsNull => visitor.is_null(term),
            PredicateOperator::NotNull => visitor.not_null(term),
            PredicateOperator::IsNan => visitor.is_nan(term),
            PredicateOperator::NotNan => visitor.not_nan(term),
            other => Err(Error::invalid_argument(format!(
                "{other} is not a unary operator"
            ))),
        },
        BoundPredicate::Binary { term, op, literal } => match op {
            PredicateOperator::LessThan => visitor.less_than(term, literal),
            PredicateOperator::LessThanOrEq => visitor.less_than_or_eq(term, literal),
            PredicateOperator::GreaterThan => visitor.greater_than(term, literal),
            PredicateOperator::GreaterThanOrEq => visitor.greater_than_or_eq(term, literal),
            PredicateOperator::Eq => visitor.eq(term, literal),
            PredicateOperator::NotEq => visitor.not_eq(term, literal),
            PredicateOperator::StartsWith => visitor.starts_with(term, literal),
            PredicateOperator::NotStartsWith => visitor.not_starts_with(term, literal),
            other => Err(Error::invalid_argument(format!(
                "{other} is not a comparison operator"
            ))),
        },
        BoundPredicate::Set { term, op, literals } => match op {
            PredicateOperator::In => visitor.is_in(term, literals),
            PredicateOperator::NotIn => visitor.not_in(term, literals),
            other => Err(Error::invalid_argument(format!(
                "{other} is not a set operator"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Reference;
    use crate::spec::datatypes::{NestedField, StructType, Type};

    fn schema() -> Schema {
        Schema::try_new(
            0,
            vec![
                NestedField::required(1, "id", PrimitiveType::Long.into()),
                NestedField::optional(2, "small", PrimitiveType::Int.into()),
                NestedField::optional(3, "Name", PrimitiveType::String.into()),
                NestedField::optional(4, "ts", PrimitiveType::Timestamp.into()),
                NestedField::optional(5, "score", PrimitiveType::Double.into()),
                NestedField::optional(6, "day", PrimitiveType::Date.into()),
                NestedField::optional(
                    7,
                    "point",
                    Type::Struct(StructType::new(vec![NestedField::optional(
                        8,
                        "x",
                        PrimitiveType::Int.into(),
                    )])),
                ),
            ],
        )
        .unwrap()
    }

    fn leaf(field_id: i32, name: &str, ty: PrimitiveType, required: bool) -> BoundReference {
        BoundReference::new(field_id, name, ty, required)
    }

    #[test]
    fn test_bind_coerces_literals() {
        let bound = Reference::new("id")
            .greater_than(Datum::int(7))
            .bind(&schema(), true)
            .unwrap();
        assert_eq!(
            bound,
            BoundPredicate::Binary {
                term: leaf(1, "id", PrimitiveType::Long, true),
                op: PredicateOperator::GreaterThan,
                literal: Datum::long(7),
            }
        );

        let bound = Reference::new("day")
            .equal_to("2024-01-02")
            .bind(&schema(), true)
            .unwrap();
        assert!(
            matches!(bound, BoundPredicate::Binary { literal, .. } if literal == Datum::date(19724))
        );

        let bound = Reference::new("point.x")
            .less_than(3)
            .bind(&schema(), true)
            .unwrap();
        assert!(matches!(bound, BoundPredicate::Binary { term, .. } if term.field_id() == 8));
    }

    #[test]
    fn test_bind_errors() {
        let err = Reference::new("missing")
            .is_null()
            .bind(&schema(), true)
            .unwrap_err();
        assert!(matches!(err, Error::ProjectionError { .. }));

        let err = Reference::new("small")
            .equal_to("abc")
            .bind(&schema(), true)
            .unwrap_err();
        assert!(matches!(err, Error::PredicateTypeError { .. }));

        let err = Reference::new("id").is_nan().bind(&schema(), true).unwrap_err();
        assert!(matches!(err, Error::PredicateTypeError { .. }));

        let err = Reference::new("small")
            .starts_with("a")
            .bind(&schema(), true)
            .unwrap_err();
        assert!(matches!(err, Error::PredicateTypeError { .. }));

        let err = Reference::new("score")
            .less_than(f64::NAN)
            .bind(&schema(), true)
            .unwrap_err();
        assert!(matches!(err, Error::PredicateTypeError { .. }));
    }

    #[test]
    fn test_case_sensitivity() {
        assert!(Reference::new("name").is_null().bind(&schema(), true).is_err());
        let bound = Reference::new("name")
            .is_null()
            .bind(&schema(), false)
            .unwrap();
        assert!(matches!(bound, BoundPredicate::Unary { term, .. } if term.field_id() == 3));
    }

    #[test]
    fn test_bind_simplifies() {
        let s = schema();
        assert_eq!(
            Reference::new("id").is_null().bind(&s, true).unwrap(),
            BoundPredicate::AlwaysFalse
        );
        assert_eq!(
            (!Reference::new("id").is_null()).bind(&s, true).unwrap(),
            BoundPredicate::AlwaysTrue
        );
        assert_eq!(
            Reference::new("small")
                .less_than(Datum::long(i64::MAX))
                .bind(&s, true)
                .unwrap(),
            BoundPredicate::AlwaysTrue
        );
        assert_eq!(
            Reference::new("small")
                .equal_to(Datum::long(i64::MIN))
                .bind(&s, true)
                .unwrap(),
            BoundPredicate::AlwaysFalse
        );
        assert_eq!(
            Reference::new("small")
                .is_in(Vec::<i32>::new())
                .bind(&s, true)
                .unwrap(),
            BoundPredicate::AlwaysFalse
        );
        assert_eq!(
            Reference::new("small").is_in([4, 4]).bind(&s, true).unwrap(),
            BoundPredicate::Binary {
                term: leaf(2, "small", PrimitiveType::Int, false),
                op: PredicateOperator::Eq,
                literal: Datum::int(4),
            }
        );
        assert_eq!(
            Reference::new("id")
                .is_null()
                .or(Reference::new("small").is_null())
                .bind(&s, true)
                .unwrap(),
            BoundPredicate::Unary {
                term: leaf(2, "small", PrimitiveType::Int, false),
                op: PredicateOperator::IsNull,
            }
        );
    }

    #[test]
    fn test_bind_json_literals() {
        let filter = Predicate::from_json(&json!({
            "type": "and",
            "left": {"type": "gt-eq", "term": "ts", "value": "2024-01-01T00:00:00"},
            "right": {"type": "in", "term": "small", "values": [1, 2, 3]}
        }))
        .unwrap();
        let bound = filter.bind(&schema(), true).unwrap();
        assert_eq!(
            bound.to_json(),
            json!({
                "type": "and",
                "left": {"type": "gt-eq", "term": "ts", "value": "2024-01-01T00:00:00.000000"},
                "right": {"type": "in", "term": "small", "values": [1, 2, 3]}
            })
        );
    }
}
