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

//! Shared cache of parsed, immutable table artifacts
//!
//! Committed metadata documents, manifest lists and manifests never change
//! once written, so a parse is cached under its location. Each artifact
//! kind lives in its own `moka` cache with LRU eviction: concurrent callers
//! asking for the same key wait on one load, and a load that fails or is
//! dropped leaves nothing behind.

use crate::error::Result;
use crate::spec::manifest::Manifest;
use crate::spec::manifest_list::ManifestList;
use crate::spec::table_metadata::TableMetadata;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use typed_builder::TypedBuilder;

/// Cache limits
#[derive(Clone, Debug, TypedBuilder)]
pub struct ObjectCacheConfig {
    /// Cache parsed metadata documents
    #[builder(default = true)]
    pub cache_metadata: bool,
    /// Cache parsed manifest lists and manifests
    #[builder(default = true)]
    pub cache_manifests: bool,
    /// Entries kept per artifact kind; the least recently used go first
    #[builder(default = 4096)]
    pub max_entries: u64,
}

impl Default for ObjectCacheConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Work-deduplicating cache keyed by content location
#[derive(Debug)]
pub struct ObjectCache {
    config: ObjectCacheConfig,
    metadata: Cache<String, Arc<TableMetadata>>,
    manifest_lists: Cache<String, Arc<ManifestList>>,
    manifests: Cache<(String, i64), Arc<Manifest>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

fn lru<K, V>(max_entries: u64) -> Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .eviction_policy(EvictionPolicy::lru())
        .max_capacity(max_entries)
        .build()
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new(ObjectCacheConfig::default())
    }
}

impl ObjectCache {
    pub fn new(config: ObjectCacheConfig) -> Self {
        ObjectCache {
            metadata: lru(config.max_entries),
            manifest_lists: lru(config.max_entries),
            manifests: lru(config.max_entries),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache that retains nothing
    pub fn disabled() -> Self {
        Self::new(
            ObjectCacheConfig::builder()
                .cache_metadata(false)
                .cache_manifests(false)
                .build(),
        )
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Metadata document at `location`, loading it with `load` on a miss
    pub async fn metadata<F, Fut>(&self, location: &str, load: F) -> Result<Arc<TableMetadata>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TableMetadata>>,
    {
        if !self.config.cache_metadata {
            return load().await.map(Arc::new);
        }
        self.get_or_load(&self.metadata, location.to_string(), load)
            .await
    }

    /// Manifest list at `path`
    pub async fn manifest_list<F, Fut>(&self, path: &str, load: F) -> Result<Arc<ManifestList>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ManifestList>>,
    {
        if !self.config.cache_manifests {
            return load().await.map(Arc::new);
        }
        self.get_or_load(&self.manifest_lists, path.to_string(), load)
            .await
    }

    /// Manifest at `path` with the length recorded in its manifest list
    pub async fn manifest<F, Fut>(&self, path: &str, length: i64, load: F) -> Result<Arc<Manifest>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Manifest>>,
    {
        if !self.config.cache_manifests {
            return load().await.map(Arc::new);
        }
        self.get_or_load(&self.manifests, (path.to_string(), length), load)
            .await
    }

    async fn get_or_load<K, V, F, Fut>(
        &self,
        cache: &Cache<K, Arc<V>>,
        key: K,
        load: F,
    ) -> Result<Arc<V>>
    where
        K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
        V: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let entry = match cache
            .entry(key.clone())
            .or_try_insert_with(async { load().await.map(Arc::new) })
            .await
        {
            Ok(entry) => entry,
            Err(err) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                // waiters on the same failed load share one error
                return Err(Arc::try_unwrap(err).unwrap_or_else(|shared| shared.duplicate()));
            }
        };

        if entry.is_fresh() {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("cache hit for {key:?}");
        }
        Ok(entry.into_value())
    }
}
