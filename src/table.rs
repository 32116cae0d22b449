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

//! Loaded table handle

use crate::catalog::{Catalog, TableIdent};
use crate::error::{Error, Result};
use crate::io::{FileIO, ObjectCache, RetryPolicy};
use crate::scan::{TableScan, TableScanBldr};
use crate::spec::table_metadata::TableMetadata;
use std::sync::Arc;

/// A table at one metadata version
///
/// Cheap to clone: the metadata, file I/O and cache are shared.
#[derive(Clone, Debug)]
pub struct Table {
    ident: Option<TableIdent>,
    name: String,
    metadata_location: String,
    metadata: Arc<TableMetadata>,
    io: Arc<dyn FileIO>,
    cache: Arc<ObjectCache>,
}

impl Table {
    /// Loads the table's current metadata through `catalog`
    pub async fn load(
        catalog: &dyn Catalog,
        io: Arc<dyn FileIO>,
        ident: &TableIdent,
    ) -> Result<Table> {
        Self::load_with_cache(catalog, io, ident, Arc::new(ObjectCache::default())).await
    }

    /// Like [`load`](Self::load), sharing `cache` with other tables
    pub async fn load_with_cache(
        catalog: &dyn Catalog,
        io: Arc<dyn FileIO>,
        ident: &TableIdent,
        cache: Arc<ObjectCache>,
    ) -> Result<Table> {
        let location = RetryPolicy::default()
            .run(&format!("catalog lookup of {ident}"), || {
                catalog.metadata_location(ident)
            })
            .await?;
        log::debug!("catalog resolved {ident} to {location}");
        let mut table = Self::from_metadata_location_with_cache(io, &location, cache).await?;
        table.name = ident.to_string();
        table.ident = Some(ident.clone());
        Ok(table)
    }

    /// Loads an earlier metadata version of a catalog table
    ///
    /// `location` must appear in the catalog's metadata history.
    pub async fn load_metadata_version(
        catalog: &dyn Catalog,
        io: Arc<dyn FileIO>,
        ident: &TableIdent,
        location: &str,
    ) -> Result<Table> {
        let history = RetryPolicy::default()
            .run(&format!("catalog history of {ident}"), || {
                catalog.metadata_history(ident)
            })
            .await?;
        if !history.iter().any(|l| l == location) {
            return Err(Error::invalid_argument(format!(
                "'{location}' is not a metadata version of {ident}"
            )));
        }
        let mut table =
            Self::from_metadata_location_with_cache(io, location, Arc::new(ObjectCache::default()))
                .await?;
        table.name = ident.to_string();
        table.ident = Some(ident.clone());
        Ok(table)
    }

    /// Loads a table straight from a metadata document, without a catalog
    pub async fn from_metadata_location(io: Arc<dyn FileIO>, location: &str) -> Result<Table> {
        Self::from_metadata_location_with_cache(io, location, Arc::new(ObjectCache::default()))
            .await
    }

    pub async fn from_metadata_location_with_cache(
        io: Arc<dyn FileIO>,
        location: &str,
        cache: Arc<ObjectCache>,
    ) -> Result<Table> {
        let metadata = cache
            .metadata(location, || async {
                let bytes = io.read(location, None).await?;
                TableMetadata::from_json_slice_at(&bytes, location)
            })
            .await?;
        log::debug!(
            "loaded {location}: format v{}, {} snapshots",
            metadata.format_version() as u8,
            metadata.snapshots().count()
        );
        Ok(Self::from_metadata(location, metadata, io, cache))
    }

    /// Wraps metadata that is already loaded
    pub fn from_metadata(
        location: impl Into<String>,
        metadata: Arc<TableMetadata>,
        io: Arc<dyn FileIO>,
        cache: Arc<ObjectCache>,
    ) -> Table {
        let metadata_location = location.into();
        Table {
            ident: None,
            name: metadata_location.clone(),
            metadata_location,
            metadata,
            io,
            cache,
        }
    }

    /// Catalog identifier, when loaded through a catalog
    pub fn ident(&self) -> Option<&TableIdent> {
        self.ident.as_ref()
    }

    /// Identifier, or the metadata location for tables loaded without one
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata_location(&self) -> &str {
        &self.metadata_location
    }

    pub fn metadata(&self) -> &Arc<TableMetadata> {
        &self.metadata
    }

    pub fn io(&self) -> &Arc<dyn FileIO> {
        &self.io
    }

    pub fn cache(&self) -> &Arc<ObjectCache> {
        &self.cache
    }

    /// Starts a scan of this table
    pub fn scan(&self) -> TableScanBldr {
        TableScan::builder().table(self.clone())
    }
}
