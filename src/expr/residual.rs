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

//! Per-file residual predicates

use super::{BoundPredicate, BoundReference, ExpressionEvaluator, PredicateOperator};
use crate::error::Result;
use crate::spec::partition::{PartitionSpec, PartitionValues};
use crate::spec::values::Datum;

/// Simplifies a row predicate using a file's identity partition values
///
/// Every leaf over a column that `spec` partitions by identity is decided by
/// the file's partition value and replaced with `AlwaysTrue` or
/// `AlwaysFalse`. Other leaves are kept as-is, so the residual is what a
/// reader still has to apply to the rows of the file.
#[derive(Debug, Clone)]
pub struct ResidualEvaluator {
    predicate: BoundPredicate,
}

impl ResidualEvaluator {
    /// `predicate` is bound to the table schema
    pub fn new(predicate: BoundPredicate) -> Self {
        ResidualEvaluator { predicate }
    }

    pub fn predicate(&self) -> &BoundPredicate {
        &self.predicate
    }

    /// Residual of the predicate for a file written under `spec`
    pub fn residual_for(
        &self,
        spec: &PartitionSpec,
        partition: &PartitionValues,
    ) -> Result<BoundPredicate> {
        if spec.is_unpartitioned()
            || matches!(
                self.predicate,
                BoundPredicate::AlwaysTrue | BoundPredicate::AlwaysFalse
            )
        {
            return Ok(self.predicate.clone());
        }
        self.predicate
            .map_leaves(&mut |leaf| residual_leaf(leaf, spec, partition))
    }
}

fn residual_leaf(
    leaf: &BoundPredicate,
    spec: &PartitionSpec,
    partition: &PartitionValues,
) -> Result<BoundPredicate> {
    let term = match leaf {
        BoundPredicate::Unary { term, .. }
        | BoundPredicate::Binary { term, .. }
        | BoundPredicate::Set { term, .. } => term,
        other => return Ok(other.clone()),
    };
    let Some(field) = spec
        .fields_by_source_id(term.field_id())
        .find(|f| f.transform.is_identity())
    else {
        return Ok(leaf.clone());
    };
    // A missing slot means the tuple was written under another layout.
    let Some(slot) = spec
        .position_of(field.field_id)
        .and_then(|pos| partition.get(pos))
    else {
        return Ok(leaf.clone());
    };
    // A value with no order against the literal (NaN) decides nothing.
    if let Some(value) = slot {
        let incomparable = |literal: &Datum| value.compare(literal).is_none();
        let undecided = match leaf {
            BoundPredicate::Binary { op, literal, .. } => {
                !matches!(
                    op,
                    PredicateOperator::StartsWith | PredicateOperator::NotStartsWith
                ) && incomparable(literal)
            }
            BoundPredicate::Set { literals, .. } => literals.iter().any(incomparable),
            _ => false,
        };
        if undecided {
            return Ok(leaf.clone());
        }
    }

    // Identity keeps the source type, so the leaf can be re-pointed at the
    // partition field and evaluated against the tuple directly.
    let retarget = BoundReference::new(
        field.field_id,
        field.name.clone(),
        *term.field_type(),
        false,
    );
    let on_partition = match leaf {
        BoundPredicate::Unary { op, .. } => BoundPredicate::Unary {
            term: retarget,
            op: *op,
        },
        BoundPredicate::Binary { op, literal, .. } => BoundPredicate::Binary {
            term: retarget,
            op: *op,
            literal: literal.clone(),
        },
        BoundPredicate::Set { op, literals, .. } => BoundPredicate::Set {
            term: retarget,
            op: *op,
            literals: literals.clone(),
        },
        other => return Ok(other.clone()),
    };
    if ExpressionEvaluator::new(on_partition, spec).eval(partition)? {
        Ok(BoundPredicate::AlwaysTrue)
    } else {
        Ok(BoundPredicate::AlwaysFalse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Predicate, Reference};
    use crate::spec::datatypes::{NestedField, PrimitiveType, Type};
    use crate::spec::partition::PartitionField;
    use crate::spec::schema::Schema;
    use crate::spec::transform::Transform;
    use crate::spec::values::Datum;

    fn schema() -> Schema {
        Schema::try_new(
            0,
            vec![
                NestedField::required(1, "id", Type::Primitive(PrimitiveType::Long)),
                NestedField::optional(2, "region", Type::Primitive(PrimitiveType::String)),
                NestedField::optional(3, "ts", Type::Primitive(PrimitiveType::Timestamp)),
            ],
        )
        .unwrap()
    }

    fn spec() -> PartitionSpec {
        PartitionSpec {
            spec_id: 1,
            fields: vec![
                PartitionField {
                    source_id: 2,
                    field_id: 1000,
                    name: "region".into(),
                    transform: Transform::Identity,
                },
                PartitionField {
                    source_id: 3,
                    field_id: 1001,
                    name: "ts_day".into(),
                    transform: Transform::Day,
                },
            ],
        }
    }

    fn residual(filter: Predicate, partition: PartitionValues) -> BoundPredicate {
        let bound = filter.bind(&schema(), true).unwrap();
        ResidualEvaluator::new(bound)
            .residual_for(&spec(), &partition)
            .unwrap()
    }

    #[test]
    fn test_identity_terms_are_decided() {
        let filter = Reference::new("region")
            .equal_to("eu")
            .and(Reference::new("id").greater_than(10_i64));

        let kept = residual(filter.clone(), vec![Some(Datum::string("eu")), None]);
        assert_eq!(
            kept,
            Reference::new("id")
                .greater_than(10_i64)
                .bind(&schema(), true)
                .unwrap()
        );

        let dropped = residual(filter, vec![Some(Datum::string("us")), None]);
        assert_eq!(dropped, BoundPredicate::AlwaysFalse);
    }

    #[test]
    fn test_non_identity_terms_are_kept() {
        let filter = Reference::new("ts").greater_than("2024-01-01T00:00:00");
        let bound = filter.bind(&schema(), true).unwrap();
        let out = residual(filter, vec![Some(Datum::string("eu")), Some(Datum::int(19000))]);
        assert_eq!(out, bound);
    }

    #[test]
    fn test_or_collapses_to_true() {
        let filter = Reference::new("region")
            .is_in(["eu", "us"])
            .or(Reference::new("id").less_than(0_i64));
        let out = residual(filter, vec![Some(Datum::string("us")), None]);
        assert_eq!(out, BoundPredicate::AlwaysTrue);
    }

    #[test]
    fn test_null_partition_value() {
        let out = residual(
            Reference::new("region").is_null(),
            vec![None, Some(Datum::int(1))],
        );
        assert_eq!(out, BoundPredicate::AlwaysTrue);

        let out = residual(
            Reference::new("region").equal_to("eu"),
            vec![None, Some(Datum::int(1))],
        );
        assert_eq!(out, BoundPredicate::AlwaysFalse);
    }

    #[test]
    fn test_unpartitioned_spec_keeps_predicate() {
        let filter = Reference::new("region").equal_to("eu");
        let bound = filter.bind(&schema(), true).unwrap();
        let out = ResidualEvaluator::new(bound.clone())
            .residual_for(&PartitionSpec::unpartitioned(0), &Vec::new())
            .unwrap();
        assert_eq!(out, bound);
    }

    #[test]
    fn test_nan_partition_value_keeps_predicate() {
        let schema = Schema::try_new(
            0,
            vec![NestedField::optional(
                1,
                "score",
                Type::Primitive(PrimitiveType::Double),
            )],
        )
        .unwrap();
        let spec = PartitionSpec {
            spec_id: 1,
            fields: vec![PartitionField {
                source_id: 1,
                field_id: 1000,
                name: "score".into(),
                transform: Transform::Identity,
            }],
        };
        let nan = vec![Some(Datum::double(f64::NAN))];

        for filter in [
            Reference::new("score").less_than(5.0),
            Reference::new("score").is_in([1.0, 2.0]),
        ] {
            let bound = filter.bind(&schema, true).unwrap();
            let out = ResidualEvaluator::new(bound.clone())
                .residual_for(&spec, &nan)
                .unwrap();
            assert_eq!(out, bound);
        }

        let bound = Reference::new("score").is_nan().bind(&schema, true).unwrap();
        let out = ResidualEvaluator::new(bound).residual_for(&spec, &nan).unwrap();
        assert_eq!(out, BoundPredicate::AlwaysTrue);

        let bound = Reference::new("score")
            .less_than(5.0)
            .bind(&schema, true)
            .unwrap();
        let out = ResidualEvaluator::new(bound)
            .residual_for(&spec, &vec![Some(Datum::double(1.5))])
            .unwrap();
        assert_eq!(out, BoundPredicate::AlwaysTrue);
    }
}
