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

//! Catalog collaborator
//!
//! The planner never talks to a metastore itself. A [`Catalog`] turns a
//! table identifier into the location of its current metadata document,
//! and optionally the locations of earlier documents.

use crate::error::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::str::FromStr;

/// Table identifier: a namespace path and a table name
///
/// # Example
///
/// ```
/// use iceberg_planner::catalog::TableIdent;
///
/// let ident: TableIdent = "warehouse.sales.orders".parse().unwrap();
/// assert_eq!(ident.namespace(), ["warehouse", "sales"]);
/// assert_eq!(ident.name(), "orders");
/// assert_eq!(ident.to_string(), "warehouse.sales.orders");
///
/// assert!("orders".parse::<TableIdent>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdent {
    namespace: Vec<String>,
    name: String,
}

impl TableIdent {
    /// Creates an identifier; every level and the name must be non-empty
    pub fn new(namespace: Vec<String>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if namespace.is_empty() {
            return Err(Error::invalid_argument("namespace cannot be empty"));
        }
        if namespace.iter().any(String::is_empty) {
            return Err(Error::invalid_argument("namespace levels cannot be empty"));
        }
        if name.is_empty() {
            return Err(Error::invalid_argument("table name cannot be empty"));
        }
        Ok(TableIdent { namespace, name })
    }

    /// Namespace levels, outermost first
    pub fn namespace(&self) -> &[String] {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TableIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace.join("."), self.name)
    }
}

impl FromStr for TableIdent {
    type Err = Error;

    /// Parses `level[.level...].name`
    fn from_str(s: &str) -> Result<Self> {
        let mut parts: Vec<String> = s.split('.').map(str::to_string).collect();
        let name = parts.pop().unwrap_or_default();
        TableIdent::new(parts, name)
    }
}

/// Resolves table identifiers to metadata locations
#[async_trait]
pub trait Catalog: fmt::Debug + Send + Sync {
    /// Location of the table's current metadata document
    async fn metadata_location(&self, ident: &TableIdent) -> Result<String>;

    /// Locations of all known metadata documents, oldest first
    ///
    /// The last entry is the current document.
    async fn metadata_history(&self, ident: &TableIdent) -> Result<Vec<String>>;
}

/// In-memory catalog with registered tables
///
/// Each registration appends a metadata location; the latest one is the
/// table's current document.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    tables: DashMap<TableIdent, Vec<String>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the table at a new metadata document
    pub fn register(&self, ident: TableIdent, metadata_location: impl Into<String>) {
        self.tables
            .entry(ident)
            .or_default()
            .push(metadata_location.into());
    }

    pub fn drop_table(&self, ident: &TableIdent) -> bool {
        self.tables.remove(ident).is_some()
    }

    fn not_found(ident: &TableIdent) -> Error {
        Error::TableNotFound {
            table: ident.to_string(),
        }
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn metadata_location(&self, ident: &TableIdent) -> Result<String> {
        self.tables
            .get(ident)
            .and_then(|history| history.last().cloned())
            .ok_or_else(|| Self::not_found(ident))
    }

    async fn metadata_history(&self, ident: &TableIdent) -> Result<Vec<String>> {
        self.tables
            .get(ident)
            .map(|history| history.value().clone())
            .ok_or_else(|| Self::not_found(ident))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> TableIdent {
        TableIdent::new(vec!["db".into()], name).unwrap()
    }

    #[test]
    fn test_ident_validation() {
        assert!(TableIdent::new(vec![], "t").is_err());
        assert!(TableIdent::new(vec!["".into()], "t").is_err());
        assert!(TableIdent::new(vec!["db".into()], "").is_err());
        assert!("db..t".parse::<TableIdent>().is_err());
        assert_eq!("db.t".parse::<TableIdent>().unwrap(), ident("t"));
    }

    #[tokio::test]
    async fn test_static_catalog() {
        let catalog = StaticCatalog::new();
        catalog.register(ident("t"), "mem://t/v1.metadata.json");
        catalog.register(ident("t"), "mem://t/v2.metadata.json");

        assert_eq!(
            catalog.metadata_location(&ident("t")).await.unwrap(),
            "mem://t/v2.metadata.json"
        );
        assert_eq!(
            catalog.metadata_history(&ident("t")).await.unwrap(),
            vec!["mem://t/v1.metadata.json", "mem://t/v2.metadata.json"]
        );

        let err = catalog.metadata_location(&ident("other")).await.unwrap_err();
        assert_eq!(err.to_string(), "table not found: db.other");

        assert!(catalog.drop_table(&ident("t")));
        assert!(catalog.metadata_history(&ident("t")).await.is_err());
    }
}
