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

//! Inclusive projection of row predicates onto partition values
//!
//! The projection of `p` is a predicate `p'` over the partition tuple such
//! that every row matching `p` lives in a partition matching `p'`. Terms
//! that a transform cannot express become always-true.

use super::{BoundPredicate, BoundReference, PredicateOperator};
use crate::error::Result;
use crate::spec::datatypes::{PrimitiveType, StructType};
use crate::spec::partition::{PartitionField, PartitionSpec};
use crate::spec::transform::Transform;
use crate::spec::values::{Datum, PrimitiveLiteral};

/// Projects bound row predicates through one partition spec
#[derive(Debug, Clone)]
pub struct InclusiveProjection<'a> {
    spec: &'a PartitionSpec,
    partition_type: &'a StructType,
}

impl<'a> InclusiveProjection<'a> {
    /// `partition_type` is the spec's partition tuple type
    pub fn new(spec: &'a PartitionSpec, partition_type: &'a StructType) -> Self {
        InclusiveProjection {
            spec,
            partition_type,
        }
    }

    /// Projects a NOT-free bound predicate onto partition field references
    pub fn project(&self, predicate: &BoundPredicate) -> Result<BoundPredicate> {
        predicate.map_leaves(&mut |leaf| Ok(self.project_leaf(leaf)))
    }

    fn project_leaf(&self, leaf: &BoundPredicate) -> BoundPredicate {
        let source_id = match leaf {
            BoundPredicate::Unary { term, .. }
            | BoundPredicate::Binary { term, .. }
            | BoundPredicate::Set { term, .. } => term.field_id(),
            other => return other.clone(),
        };
        // Several partition fields over one column each narrow the match
        self.spec
            .fields_by_source_id(source_id)
            .filter_map(|field| {
                let result_type = self
                    .partition_type
                    .field_by_id(field.field_id)
                    .and_then(|f| f.field_type.as_primitive())?;
                Some(project_field(leaf, field, result_type))
            })
            .fold(BoundPredicate::AlwaysTrue, BoundPredicate::and)
    }
}

fn project_field(
    leaf: &BoundPredicate,
    field: &PartitionField,
    result_type: &PrimitiveType,
) -> BoundPredicate {
    let part = BoundReference::new(field.field_id, field.name.clone(), *result_type, false);
    let transform = field.transform;
    match leaf {
        BoundPredicate::Unary { op, .. } => match (transform, op) {
            (Transform::Void, _) => BoundPredicate::AlwaysTrue,
            // Transforms map null to null and nothing else to null
            (_, PredicateOperator::IsNull | PredicateOperator::NotNull)
            | (Transform::Identity, _) => BoundPredicate::Unary {
                term: part,
                op: *op,
            },
            _ => BoundPredicate::AlwaysTrue,
        },
        BoundPredicate::Binary { op, literal, .. } => match transform {
            Transform::Void => BoundPredicate::AlwaysTrue,
            Transform::Identity => BoundPredicate::Binary {
                term: part,
                op: *op,
                literal: literal.clone(),
            },
            Transform::Bucket(_) if *op == PredicateOperator::Eq => {
                binary(part, PredicateOperator::Eq, transform, literal)
            }
            Transform::Bucket(_) => BoundPredicate::AlwaysTrue,
            Transform::Truncate(width) => project_truncate(part, *op, width, literal),
            Transform::Year | Transform::Month | Transform::Day | Transform::Hour => {
                project_ordered(part, *op, transform, literal)
            }
        },
        BoundPredicate::Set { op, literals, .. } => match transform {
            Transform::Void => BoundPredicate::AlwaysTrue,
            Transform::Identity => BoundPredicate::Set {
                term: part,
                op: *op,
                literals: literals.clone(),
            },
            _ if *op == PredicateOperator::In => {
                let mut projected: Vec<Datum> = Vec::with_capacity(literals.len());
                for literal in literals {
                    match transform.apply(literal) {
                        Ok(Some(value)) => {
                            if !projected.contains(&value) {
                                projected.push(value);
                            }
                        }
                        _ => return BoundPredicate::AlwaysTrue,
                    }
                }
                if projected.len() == 1 {
                    BoundPredicate::Binary {
                        term: part,
                        op: PredicateOperator::Eq,
                        literal: projected.remove(0),
                    }
                } else {
                    BoundPredicate::Set {
                        term: part,
                        op: PredicateOperator::In,
                        literals: projected,
                    }
                }
            }
            _ => BoundPredicate::AlwaysTrue,
        },
        other => other.clone(),
    }
}

/// `part op transform(value)`, or always-true when the value has no image
fn binary(
    part: BoundReference,
    op: PredicateOperator,
    transform: Transform,
    value: &Datum,
) -> BoundPredicate {
    match transform.apply(value) {
        Ok(Some(literal)) => BoundPredicate::Binary {
            term: part,
            op,
            literal,
        },
        _ => BoundPredicate::AlwaysTrue,
    }
}

/// Shifts an integer-like datum by `delta` units
fn step(value: &Datum, delta: i64) -> Option<Datum> {
    let literal = match value.literal() {
        PrimitiveLiteral::Int(v) => {
            PrimitiveLiteral::Int(v.checked_add(i32::try_from(delta).ok()?)?)
        }
        PrimitiveLiteral::Long(v) => PrimitiveLiteral::Long(v.checked_add(delta)?),
        PrimitiveLiteral::Decimal(v) => {
            PrimitiveLiteral::Decimal(v.checked_add(i128::from(delta))?)
        }
        _ => return None,
    };
    Some(Datum::with_literal(*value.data_type(), literal))
}

/// Projection through a monotonic transform over a discrete source domain
///
/// Strict bounds are first made inclusive on the source value so that
/// `x < v` becomes `f(x) <= f(v - 1)`.
fn project_ordered(
    part: BoundReference,
    op: PredicateOperator,
    transform: Transform,
    value: &Datum,
) -> BoundPredicate {
    let (op, value) = match op {
        PredicateOperator::LessThan => (PredicateOperator::LessThanOrEq, step(value, -1)),
        PredicateOperator::GreaterThan => (PredicateOperator::GreaterThanOrEq, step(value, 1)),
        PredicateOperator::LessThanOrEq
        | PredicateOperator::GreaterThanOrEq
        | PredicateOperator::Eq => (op, Some(value.clone())),
        _ => return BoundPredicate::AlwaysTrue,
    };
    match value {
        Some(value) => binary(part, op, transform, &value),
        None => BoundPredicate::AlwaysTrue,
    }
}

fn project_truncate(
    part: BoundReference,
    op: PredicateOperator,
    width: u32,
    value: &Datum,
) -> BoundPredicate {
    let transform = Transform::Truncate(width);
    match value.data_type() {
        PrimitiveType::String | PrimitiveType::Binary => match op {
            PredicateOperator::LessThan | PredicateOperator::LessThanOrEq => {
                binary(part, PredicateOperator::LessThanOrEq, transform, value)
            }
            PredicateOperator::GreaterThan | PredicateOperator::GreaterThanOrEq => {
                binary(part, PredicateOperator::GreaterThanOrEq, transform, value)
            }
            PredicateOperator::Eq => binary(part, PredicateOperator::Eq, transform, value),
            PredicateOperator::StartsWith => match value.as_str() {
                Some(prefix) if prefix.chars().count() < width as usize => {
                    BoundPredicate::Binary {
                        term: part,
                        op: PredicateOperator::StartsWith,
                        literal: value.clone(),
                    }
                }
                Some(_) => binary(part, PredicateOperator::Eq, transform, value),
                None => BoundPredicate::AlwaysTrue,
            },
            _ => BoundPredicate::AlwaysTrue,
        },
        _ => project_ordered(part, op, transform, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExpressionEvaluator, Reference};
    use crate::spec::datatypes::NestedField;
    use crate::spec::schema::Schema;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::try_new(
            0,
            vec![
                NestedField::optional(1, "x", PrimitiveType::Long.into()),
                NestedField::optional(2, "s", PrimitiveType::String.into()),
                NestedField::optional(3, "ts", PrimitiveType::Timestamp.into()),
                NestedField::optional(4, "d", PrimitiveType::Date.into()),
            ],
        )
        .unwrap()
    }

    fn spec(fields: &[(i32, i32, &str, Transform)]) -> PartitionSpec {
        PartitionSpec {
            spec_id: 0,
            fields: fields
                .iter()
                .map(|(source_id, field_id, name, transform)| PartitionField {
                    source_id: *source_id,
                    field_id: *field_id,
                    name: name.to_string(),
                    transform: *transform,
                })
                .collect(),
        }
    }

    fn project(spec: &PartitionSpec, filter: crate::expr::Predicate) -> serde_json::Value {
        let schema = schema();
        let partition_type = spec.partition_type([&schema]).unwrap();
        let bound = filter.bind(&schema, true).unwrap();
        InclusiveProjection::new(spec, &partition_type)
            .project(&bound)
            .unwrap()
            .to_json()
    }

    #[test]
    fn test_identity_keeps_operator() {
        let spec = spec(&[(1, 1000, "x", Transform::Identity)]);
        assert_eq!(
            project(&spec, Reference::new("x").not_equal_to(5)),
            json!({"type": "not-eq", "term": "x", "value": 5})
        );
        assert_eq!(
            project(&spec, Reference::new("s").equal_to("a")),
            json!({"type": "true"})
        );
    }

    #[test]
    fn test_bucket_only_equality() {
        let spec = spec(&[(1, 1000, "x_bucket", Transform::Bucket(16))]);
        let bucket = Transform::Bucket(16)
            .apply(&Datum::long(34))
            .unwrap()
            .unwrap();
        assert_eq!(
            project(&spec, Reference::new("x").equal_to(34)),
            json!({"type": "eq", "term": "x_bucket", "value": bucket.to_json()})
        );
        assert_eq!(
            project(&spec, Reference::new("x").greater_than(34)),
            json!({"type": "true"})
        );
        assert_eq!(
            project(&spec, Reference::new("x").is_null()),
            json!({"type": "is-null", "term": "x_bucket"})
        );
    }

    #[test]
    fn test_truncate_widens_ranges() {
        let spec = spec(&[
            (1, 1000, "x_trunc", Transform::Truncate(10)),
            (2, 1001, "s_trunc", Transform::Truncate(3)),
        ]);
        assert_eq!(
            project(&spec, Reference::new("x").less_than(100)),
            json!({"type": "lt-eq", "term": "x_trunc", "value": 90})
        );
        assert_eq!(
            project(&spec, Reference::new("x").greater_than(100)),
            json!({"type": "gt-eq", "term": "x_trunc", "value": 100})
        );
        assert_eq!(
            project(&spec, Reference::new("s").starts_with("ab")),
            json!({"type": "starts-with", "term": "s_trunc", "value": "ab"})
        );
        assert_eq!(
            project(&spec, Reference::new("s").starts_with("abcd")),
            json!({"type": "eq", "term": "s_trunc", "value": "abc"})
        );
        // no truncated value exists below the type minimum
        assert_eq!(
            project(&spec, Reference::new("x").equal_to(i64::MIN)),
            json!({"type": "true"})
        );
        assert_eq!(
            project(&spec, Reference::new("s").not_starts_with("abcd")),
            json!({"type": "true"})
        );
    }

    #[test]
    fn test_temporal_projection() {
        let spec = spec(&[
            (3, 1000, "ts_day", Transform::Day),
            (4, 1001, "d_month", Transform::Month),
        ]);
        // 2024-01-02T00:00:00 is exclusive, so the last matching day is 2024-01-01
        assert_eq!(
            project(
                &spec,
                Reference::new("ts").less_than(Datum::timestamp_micros(1_704_153_600_000_000))
            ),
            json!({"type": "lt-eq", "term": "ts_day", "value": "2024-01-01"})
        );
        assert_eq!(
            project(&spec, Reference::new("d").greater_than_or_equal_to("2024-03-15")),
            json!({"type": "gt-eq", "term": "d_month", "value": 650})
        );
        assert_eq!(
            project(&spec, Reference::new("d").is_in(["2024-03-01", "2024-03-31"])),
            json!({"type": "eq", "term": "d_month", "value": 650})
        );
    }

    #[test]
    fn test_and_or_project_per_leaf() {
        let spec = spec(&[(1, 1000, "x", Transform::Identity)]);
        assert_eq!(
            project(
                &spec,
                Reference::new("x")
                    .equal_to(1)
                    .or(Reference::new("s").equal_to("a"))
            ),
            json!({"type": "true"})
        );
        assert_eq!(
            project(
                &spec,
                Reference::new("x")
                    .equal_to(1)
                    .and(Reference::new("s").equal_to("a"))
            ),
            json!({"type": "eq", "term": "x", "value": 1})
        );
    }

    fn row_matches(op: PredicateOperator, x: i64, v: i64) -> bool {
        match op {
            PredicateOperator::LessThan => x < v,
            PredicateOperator::LessThanOrEq => x <= v,
            PredicateOperator::GreaterThan => x > v,
            PredicateOperator::GreaterThanOrEq => x >= v,
            PredicateOperator::Eq => x == v,
            _ => x != v,
        }
    }

    fn projection_keeps_row(transform: Transform, x: i64, v: i64, op_index: u8) -> bool {
        let ops = [
            PredicateOperator::LessThan,
            PredicateOperator::LessThanOrEq,
            PredicateOperator::GreaterThan,
            PredicateOperator::GreaterThanOrEq,
            PredicateOperator::Eq,
            PredicateOperator::NotEq,
        ];
        let op = ops[op_index as usize % ops.len()];
        if !row_matches(op, x, v) {
            return true;
        }
        let spec = spec(&[(1, 1000, "p", transform)]);
        let schema = schema();
        let partition_type = spec.partition_type([&schema]).unwrap();
        let row = BoundPredicate::Binary {
            term: BoundReference::new(1, "x", PrimitiveType::Long, false),
            op,
            literal: Datum::long(v),
        };
        let projected = InclusiveProjection::new(&spec, &partition_type)
            .project(&row)
            .unwrap();
        let partition = spec
            .partition_values(|_| Some(Datum::long(x)))
            .unwrap();
        ExpressionEvaluator::new(projected, &spec)
            .eval(&partition)
            .unwrap()
    }

    quickcheck! {
        fn prop_truncate_projection_is_inclusive(x: i64, v: i64, op: u8) -> bool {
            projection_keeps_row(Transform::Truncate(10), x / 2, v / 2, op)
        }

        fn prop_bucket_projection_is_inclusive(x: i64, v: i64, op: u8) -> bool {
            projection_keeps_row(Transform::Bucket(8), x, v, op)
                && projection_keeps_row(Transform::Bucket(8), x, x, op)
        }
    }
}
