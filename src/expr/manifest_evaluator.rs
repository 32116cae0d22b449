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

//! Manifest pruning from manifest list partition summaries

use super::{BoundPredicate, BoundPredicateVisitor, BoundReference, visit};
use crate::error::{Error, Result};
use crate::spec::manifest_list::{FieldSummary, ManifestFile};
use crate::spec::partition::PartitionSpec;
use crate::spec::values::Datum;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Decides whether a manifest may contain files matching a partition predicate
///
/// Uses the per-partition-field `FieldSummary` of each manifest list entry.
/// Missing summaries or bounds never exclude a manifest.
#[derive(Debug, Clone)]
pub struct ManifestEvaluator {
    predicate: BoundPredicate,
    positions: HashMap<i32, usize>,
}

impl ManifestEvaluator {
    /// `predicate` is the inclusive projection onto `spec`
    pub fn new(predicate: BoundPredicate, spec: &PartitionSpec) -> Self {
        let positions = spec
            .fields
            .iter()
            .enumerate()
            .map(|(pos, f)| (f.field_id, pos))
            .collect();
        ManifestEvaluator {
            predicate,
            positions,
        }
    }

    /// Whether the manifest might contain matching files
    pub fn eval(&self, manifest: &ManifestFile) -> Result<bool> {
        if matches!(self.predicate, BoundPredicate::AlwaysTrue) {
            return Ok(true);
        }
        visit(
            &mut SummaryVisitor {
                positions: &self.positions,
                manifest,
            },
            &self.predicate,
        )
    }
}

struct SummaryVisitor<'a> {
    positions: &'a HashMap<i32, usize>,
    manifest: &'a ManifestFile,
}

impl<'a> SummaryVisitor<'a> {
    fn summary(&self, term: &BoundReference) -> Option<&'a FieldSummary> {
        self.positions
            .get(&term.field_id())
            .and_then(|pos| self.manifest.partitions.get(*pos))
    }

    fn bounds(&self, term: &BoundReference) -> Result<(Option<Datum>, Option<Datum>)> {
        let Some(summary) = self.summary(term) else {
            return Ok((None, None));
        };
        let corrupt = |e: Error| {
            Error::manifest_corrupt(
                &self.manifest.manifest_path,
                format!("partition summary of '{}': {e}", term.name()),
            )
        };
        let lower = summary.lower_bound(term.field_type()).map_err(corrupt)?;
        let upper = summary.upper_bound(term.field_type()).map_err(corrupt)?;
        Ok((lower, upper))
    }

    /// Whether every partition value of the manifest is null
    fn all_null(&self, term: &BoundReference) -> bool {
        self.summary(term).is_some_and(|s| {
            s.contains_null
                && s.contains_nan == Some(false)
                && s.lower_bound.is_none()
                && s.upper_bound.is_none()
        })
    }
}

/// `bound cmp literal` is one of the accepted orderings; unknown keeps the manifest
fn check(bound: &Option<Datum>, literal: &Datum, accept: fn(Ordering) -> bool) -> bool {
    match bound {
        Some(bound) => bound.compare(literal).is_none_or(accept),
        None => true,
    }
}

fn prefix_of<'s>(value: &'s Datum, len: usize) -> Option<&'s str> {
    let s = value.as_str()?;
    Some(match s.char_indices().nth(len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    })
}

impl BoundPredicateVisitor for SummaryVisitor<'_> {
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
        Ok(self.summary(term).is_none_or(|s| s.contains_null))
    }

    fn not_null(&mut self, term: &BoundReference) -> Result<bool> {
        Ok(!self.all_null(term))
    }

    fn is_nan(&mut self, term: &BoundReference) -> Result<bool> {
        Ok(self
            .summary(term)
            .is_none_or(|s| s.contains_nan != Some(false)))
    }

    fn not_nan(&mut self, _term: &BoundReference) -> Result<bool> {
        Ok(true)
    }

    fn less_than(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.all_null(term) {
            return Ok(false);
        }
        let (lower, _) = self.bounds(term)?;
        Ok(check(&lower, literal, Ordering::is_lt))
    }

    fn less_than_or_eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.all_null(term) {
            return Ok(false);
        }
        let (lower, _) = self.bounds(term)?;
        Ok(check(&lower, literal, Ordering::is_le))
    }

    fn greater_than(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.all_null(term) {
            return Ok(false);
        }
        let (_, upper) = self.bounds(term)?;
        Ok(check(&upper, literal, Ordering::is_gt))
    }

    fn greater_than_or_eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.all_null(term) {
            return Ok(false);
        }
        let (_, upper) = self.bounds(term)?;
        Ok(check(&upper, literal, Ordering::is_ge))
    }

    fn eq(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.all_null(term) {
            return Ok(false);
        }
        let (lower, upper) = self.bounds(term)?;
        Ok(check(&lower, literal, Ordering::is_le) && check(&upper, literal, Ordering::is_ge))
    }

    fn not_eq(&mut self, _term: &BoundReference, _literal: &Datum) -> Result<bool> {
        Ok(true)
    }

    fn starts_with(&mut self, term: &BoundReference, literal: &Datum) -> Result<bool> {
        if self.all_null(term) {
            return Ok(false);
        }
        let Some(prefix) = literal.as_str() else {
            return Ok(true);
        };
        let len = prefix.chars().count();
        let (lower, upper) = self.bounds(term)?;
        let below = lower
            .as_ref()
            .and_then(|l| prefix_of(l, len))
            .is_some_and(|l| l > prefix);
        let above = upper
            .as_ref()
            .and_then(|u| prefix_of(u, len))
            .is_some_and(|u| u < prefix);
        Ok(!below && !above)
    }

    fn not_starts_with(&mut self, _term: &BoundReference, _literal: &Datum) -> Result<bool> {
        Ok(true)
    }

    fn is_in(&mut self, term: &BoundReference, literals: &[Datum]) -> Result<bool> {
        if self.all_null(term) {
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
