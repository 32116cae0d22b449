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

//! Evaluation of projected predicates against a file's partition tuple

use super::{BoundPredicate, BoundPredicateVisitor, BoundReference, visit};
use crate::error::Result;
use crate::spec::partition::{PartitionSpec, PartitionValues};
use crate::spec::values::Datum;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Evaluates a partition predicate against concrete partition values
///
/// Comparisons with a null partition value are false, as in SQL. Values
/// whose types have no common order are treated as a possible match.
#[derive(Debug, Clone)]
pub struct ExpressionEvaluator {
    predicate: BoundPredicate,
    positions: HashMap<i32, usize>,
}

impl ExpressionEvaluator {
    /// `predicate` must reference the partition fields of `spec`
    pub fn new(predicate: BoundPredicate, spec: &PartitionSpec) -> Self {
        let positions = spec
            .fields
            .iter()
            .enumerate()
            .map(|(pos, f)| (f.field_id, pos))
            .collect();
        ExpressionEvaluator {
            predicate,
            positions,
        }
    }

    /// Whether rows of a partition with these values might match
    pub fn eval(&self, partition: &PartitionValues) -> Result<bool> {
        visit(
            &mut TupleVisitor {
                positions: &self.positions,
                partition,
            },
            &self.predicate,
        )
    }
}

struct TupleVisitor<'a> {
    positions: &'a HashMap<i32, usize>,
    partition: &'a PartitionValues,
}

/// Slot state of one partition field
enum Slot<'a> {
    /// Field not in this tuple
    Unknown,
    Null,
    Value(&'a Datum),
}

impl<'a> TupleVisitor<'a> {
    fn slot(&self, term: &BoundReference) -> Slot<'a> {
        match self
            .positions
            .get(&term.field_id())
            .and_then(|pos| self.partition.get(*pos))
        {
            None => Slot::Unknown,
            Some(None) => Slot::Null,
            Some(Some(value)) => Slot::Value(value),
        }
    }

    fn compare(
        &self,
        term: &BoundReference,
        literal: &Datum,
        accept: fn(Ordering) -> bool,
    ) -> bool {
        match self.slot(term) {
            Slot::Unknown => true,
            Slot::Null => false,
            Slot::Value(value) => value.compare(literal).is_none_or(accept),
        }
    }
}

impl BoundPredicateVisitor for TupleVisitor<'_> {
    type T = bool;

    fn always_true(&mut self) -> Result<bool> {
        Ok(true)
    }

    fn always_false(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn and(&mut self, lhs: bool, rhs: bool) -> Result<bool> {
        Ok(lhs && rhs)
    }

    fn or(&mut self, lhs: bool, rhs: bool) -> Result<bool> {
        Ok(lhs || rhs)
    }

    fn is_null(&mut self, term: &BoundReference) -> Result<bool> {
        Ok(!matches!(self.slot(term), Slot::Value(_)))
    }

    fn not_null(&mut self, term: &BoundReference) -> Result<bool> {
        Ok(!matches!(self.slot(term), Slot::Null))
    }

    fn is_nan(&mut self, term: &BoundReference) -> Result<bool> {
        Ok(match self.slot(term) {
            Slot::Unknown => true,
            Slot::Null => false,
            Slot::Value(v) => v.is_nan(),
        })
    }

    fn not_nan(&mut self, term: &BoundReference) -> Result<bool> {
        Ok(match self.slot(term) {
            Slot::Unknown => true,
            Slot::Null => false,
            Slot::Value(v) => !v.is_nan(),
        })
    }

    fn less_than(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        Ok(self.compare(term, literal, Ordering::is_lt))
    }

    fn less_than_or_eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        Ok(self.compare(term, literal, Ordering::is_le))
    }

    fn greater_than(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        Ok(self.compare(term, literal, Ordering::is_gt))
    }

    fn greater_than_or_eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        Ok(self.compare(term, literal, Ordering::is_ge))
    }

    fn eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        Ok(self.compare(term, literal, Ordering::is_eq))
    }

    fn not_eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        Ok(self.compare(term, literal, Ordering::is_ne))
    }

    fn starts_with(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        Ok(match (self.slot(term), literal.as_str()) {
            (Slot::Null, _) => false,
            (Slot::Value(v), Some(prefix)) => v.as_str().is_none_or(|s| s.starts_with(prefix)),
            _ => true,
        })
    }

    fn not_starts_with(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        Ok(match (self.slot(term), literal.as_str()) {
            (Slot::Null, _) => false,
            (Slot::Value(v), Some(prefix)) => v.as_str().is_none_or(|s| !s.starts_with(prefix)),
            _ => true,
        })
    }

    fn is_in(&mut self, term: &BoundReference, literals: &[Datum]) -> Result<bool> {
        Ok(match self.slot(term) {
            Slot::Unknown => true,
            Slot::Null => false,
            Slot::Value(v) => literals
                .iter()
                .any(|l| v.compare(l).is_none_or(Ordering::is_eq)),
        })
    }

    fn not_in(&mut self, term: &BoundReference, literals: &[Datum]) -> Result<bool> {
        Ok(match self.slot(term) {
            Slot::Unknown => true,
            Slot::Null => false,
            Slot::Value(v) => literals
                .iter()
                .all(|l| v.compare(l).is_none_or(Ordering::is_ne)),
        })
    }
}
