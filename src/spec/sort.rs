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

//! Sort orders
//!
//! Carried through metadata round-trips; planning does not use them.

use crate::spec::transform::Transform;
use serde::{Deserialize, Serialize};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order
    Asc,
    /// Descending order
    Desc,
}

/// Null ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullOrder {
    /// Nulls sort before all values
    NullsFirst,
    /// Nulls sort after all values
    NullsLast,
}

/// Sort field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Source field ID
    #[serde(rename = "source-id")]
    pub source_id: i32,
    /// Transform applied before sorting
    pub transform: Transform,
    /// Sort direction
    pub direction: SortDirection,
    /// Null ordering
    #[serde(rename = "null-order")]
    pub null_order: NullOrder,
}

/// Sort order specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Sort order ID
    #[serde(rename = "order-id")]
    pub order_id: i64,
    /// Sort fields
    pub fields: Vec<SortField>,
}

impl SortOrder {
    /// Order id reserved for unsorted tables
    pub const UNSORTED_ORDER_ID: i64 = 0;

    /// The unsorted order
    pub fn unsorted() -> Self {
        SortOrder {
            order_id: Self::UNSORTED_ORDER_ID,
            fields: Vec::new(),
        }
    }
}
