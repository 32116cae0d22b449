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

//! Data file pruning from column metrics
//!
//! The evaluator is inclusive: it returns `false` only when the file's
//! metrics prove that no row can match. Missing counts or bounds, and
//! values without a common order (NaN, mismatched decimal scales), keep
//! the file.

use super::{BoundPredicate, BoundPredicateVisitor, BoundReference, visit};
use crate::error::{Error, Result};
use crate::spec::manifest::DataFile;
use crate::spec::values::Datum;
use std::cmp::Ordering;

/// Evaluates a bound row predicate against a data file's column metrics
#[derive(Debug, Clone)]
pub struct InclusiveMetricsEvaluator {
    predicate: BoundPredicate,
}

impl InclusiveMetricsEvaluator {
    /// `predicate` is bound to the table schema
    pub fn new(predicate: BoundPredicate) -> Self {
        InclusiveMetricsEvaluator { predicate }
    }

    /// Whether the file might contain matching rows
    pub fn eval(&self, file: &DataFile) -> Result<bool> {
        if file.record_count == 0 {
            return Ok(false);
        }
        if matches!(self.predicate, BoundPredicate::AlwaysTrue) {
            return Ok(true);
        }
        visit(&mut MetricsVisitor { file }, &self.predicate)
    }
}

struct MetricsVisitor<'a> {
    file: &'a DataFile,
}

impl MetricsVisitor<'_> {
    fn count(map: &std::collections::HashMap<i32, i64>, id: i32) -> Option<i64> {
        map.get(&id).copied()
    }

    fn nulls_only(&self, term: &BoundReference) -> bool {
        let id = term.field_id();
        match (
            Self::count(&self.file.value_counts, id),
            Self::count(&self.file.null_value_counts, id),
        ) {
            (Some(values), Some(nulls)) => values == nulls,
            _ => false,
        }
    }

    fn nans_only(&self, term: &BoundReference) -> bool {
        let id = term.field_id();
        match (
            Self::count(&self.file.value_counts, id),
            Self::count(&self.file.nan_value_counts, id),
        ) {
            (Some(values), Some(nans)) => values == nans,
            _ => false,
        }
    }

    /// No non-null, non-NaN value can satisfy a comparison
    fn no_comparable_values(&self, term: &BoundReference) -> bool {
        self.nulls_only(term) || self.nans_only(term)
    }

    fn bounds(&self, term: &BoundReference) -> Result<(Option<Datum>, Option<Datum>)> {
        let corrupt = |e: Error| {
            Error::manifest_corrupt(
                &self.file.file_path,
                format!("metrics of column '{}': {e}", term.name()),
            )
        };
        let lower = self
            .file
            .lower_bound(term.field_id(), term.field_type())
            .map_err(corrupt)?;
        let upper = self
            .file
            .upper_bound(term.field_id(), term.field_type())
            .map_err(corrupt)?;
        Ok((lower, upper))
    }
}

fn check(bound: &Option<Datum>, literal: &Datum, accept: fn(Ordering) -> bool) -> bool {
    match bound {
        Some(bound) => bound.compare(literal).is_none_or(accept),
        None => true,
    }
}

fn prefix_of(value: &Datum, len: usize) -> Option<&str> {
    let s = value.as_str()?;
    Some(match s.char_indices().nth(len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    })
}

impl BoundPredicateVisitor for MetricsVisitor<'_> {
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
        Ok(Self::count(&self.file.null_value_counts, term.field_id()) != Some(0))
    }

    fn not_null(&mut self, term: &BoundReference) -> Result<bool> {
        Ok(!self.nulls_only(term))
    }

    fn is_nan(&mut self, term: &BoundReference) -> Result<bool> {
        if Self::count(&self.file.nan_value_counts, term.field_id()) == Some(0) {
            return Ok(false);
        }
        Ok(!self.nulls_only(term))
    }

    fn not_nan(&mut self, term: &BoundReference) -> Result<bool> {
        Ok(!self.nans_only(term))
    }

    fn less_than(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.no_comparable_values(term) {
            return Ok(false);
        }
        let (lower, _) = self.bounds(term)?;
        Ok(check(&lower, literal, Ordering::is_lt))
    }

    fn less_than_or_eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.no_comparable_values(term) {
            return Ok(false);
        }
        let (lower, _) = self.bounds(term)?;
        Ok(check(&lower, literal, Ordering::is_le))
    }

    fn greater_than(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.no_comparable_values(term) {
            return Ok(false);
        }
        let (_, upper) = self.bounds(term)?;
        Ok(check(&upper, literal, Ordering::is_gt))
    }

    fn greater_than_or_eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.no_comparable_values(term) {
            return Ok(false);
        }
        let (_, upper) = self.bounds(term)?;
        Ok(check(&upper, literal, Ordering::is_ge))
    }

    fn eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.no_comparable_values(term) {
            return Ok(false);
        }
        let (lower, upper) = self.bounds(term)?;
        Ok(check(&lower, literal, Ordering::is_le) && check(&upper, literal, Ordering::is_ge))
    }

    fn not_eq(&mut self, _term: &BoundReference, _literal: &Datum) -> Result<bool> {
        Ok(true)
    }

    fn starts_with(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.nulls_only(term) {
            return Ok(false);
        }
        let Some(prefix) = literal.as_str() else {
            return Ok(true);
        };
        let len = prefix.chars().count();
        let (lower, upper) = self.bounds(term)?;
        if lower
            .as_ref()
            .and_then(|l| prefix_of(l, len))
            .is_some_and(|l| l > prefix)
        {
            return Ok(false);
        }
        if upper
            .as_ref()
            .and_then(|u| prefix_of(u, len))
            .is_some_and(|u| u < prefix)
        {
            return Ok(false);
        }
        Ok(true)
    }

    fn not_starts_with(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.nulls_only(term) {
            return Ok(false);
        }
        let Some(prefix) = literal.as_str() else {
            return Ok(true);
        };
        // Nulls never match, so only a null-free file can be proven empty
        if Self::count(&self.file.null_value_counts, term.field_id()) != Some(0) {
            return Ok(true);
        }
        let (lower, upper) = self.bounds(term)?;
        let both_prefixed = matches!(
            (lower.as_ref().and_then(Datum::as_str), upper.as_ref().and_then(Datum::as_str)),
            (Some(l), Some(u)) if l.starts_with(prefix) && u.starts_with(prefix)
        );
        Ok(!both_prefixed)
    }

    fn is_in(&mut self, term: &BoundReference, literals: &[Datum]) -> Result<bool> {
        if self.no_comparable_values(term) {
            return Ok(false);
        }
        let (lower, upper) = self.bounds(term)?;
        Ok(literals.iter().any(|l| {
            check(&lower, l, Ordering::is_le) && check(&upper, l, Ordering::is_ge)
        }))
    }

    fn not_in(&mut self, _term: &BoundReference, _literals: &[Datum]) -> Result<bool> {
        Ok(true)
    }
}
