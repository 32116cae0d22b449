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

//! Filesystem collaborator
//!
//! Planning reads metadata documents, manifest lists and manifests through
//! the [`FileIO`] trait and nothing else. Two implementations ship with the
//! crate:
//!
//! - [`LocalFileIO`] reads plain paths and `file:` URLs with `tokio::fs`
//! - [`MemoryFileIO`] serves byte buffers registered up front
//!
//! [`RetryingFileIO`] wraps either with bounded exponential backoff, and
//! [`ObjectCache`] deduplicates parses of immutable artifacts.
//!
//! # Example
//!
//! ```no_run
//! use iceberg_planner::io::{FileIO, LocalFileIO, RetryingFileIO};
//!
//! # async fn example() -> iceberg_planner::error::Result<()> {
//! let io = RetryingFileIO::new(LocalFileIO::new());
//! let bytes = io.read("file:///warehouse/db/t/metadata/v1.metadata.json", None).await?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod retry;

pub use cache::{CacheStats, ObjectCache, ObjectCacheConfig};
pub use retry::{RetryPolicy, RetryingFileIO};

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use url::Url;

/// Read-only access to the shared filesystem
#[async_trait]
pub trait FileIO: fmt::Debug + Send + Sync {
    /// Reads `range` of the file, or the whole file when `range` is `None`
    ///
    /// A range reaching past the end of the file is a `StorageUnavailable`
    /// error that is not retryable, never a short read.
    async fn read(&self, path: &str, range: Option<Range<u64>>) -> Result<Bytes>;

    /// Size of the file in bytes
    async fn length(&self, path: &str) -> Result<u64>;
}

#[async_trait]
impl<T: FileIO + ?Sized> FileIO for Arc<T> {
    async fn read(&self, path: &str, range: Option<Range<u64>>) -> Result<Bytes> {
        (**self).read(path, range).await
    }

    async fn length(&self, path: &str) -> Result<u64> {
        (**self).length(path).await
    }
}

fn short_read(path: &str, range: &Range<u64>, len: u64) -> Error {
    Error::io(
        path,
        std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("range {}..{} past end of {len}-byte file", range.start, range.end),
        ),
    )
}

fn check_range(path: &str, range: &Range<u64>) -> Result<()> {
    if range.start > range.end {
        return Err(Error::invalid_argument(format!(
            "invalid range {}..{} for '{path}'",
            range.start, range.end
        )));
    }
    Ok(())
}

// ============================================================================
// Local filesystem
// ============================================================================

/// Reads from the local filesystem
///
/// Accepts absolute or relative paths and `file:` URLs. Any other URL
/// scheme is rejected with `InvalidArgument`.
#[derive(Debug, Clone, Default)]
pub struct LocalFileIO {
    root: Option<PathBuf>,
}

impl LocalFileIO {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative paths against `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        LocalFileIO {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let local = if path.starts_with("file:") {
            let url = Url::parse(path)
                .map_err(|e| Error::invalid_argument(format!("invalid URL '{path}': {e}")))?;
            url.to_file_path()
                .map_err(|_| Error::invalid_argument(format!("not a local file URL: '{path}'")))?
        } else if let Some((scheme, _)) = path.split_once("://") {
            return Err(Error::invalid_argument(format!(
                "unsupported scheme '{scheme}' in '{path}'"
            )));
        } else {
            PathBuf::from(path)
        };
        Ok(match &self.root {
            Some(root) if local.is_relative() => root.join(local),
            _ => local,
        })
    }
}

#[async_trait]
impl FileIO for LocalFileIO {
    async fn read(&self, path: &str, range: Option<Range<u64>>) -> Result<Bytes> {
        let local = self.resolve(path)?;
        let Some(range) = range else {
            let data = tokio::fs::read(&local)
                .await
                .map_err(|e| Error::io(path, e))?;
            return Ok(Bytes::from(data));
        };
        check_range(path, &range)?;

        let mut file = tokio::fs::File::open(&local)
            .await
            .map_err(|e| Error::io(path, e))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| Error::io(path, e))?
            .len();
        if range.end > len {
            return Err(short_read(path, &range, len));
        }
        file.seek(std::io::SeekFrom::Start(range.start))
            .await
            .map_err(|e| Error::io(path, e))?;
        let mut buf = vec![0u8; (range.end - range.start) as usize];
        file.read_exact(&mut buf)
            .await
            .map_err(|e| Error::io(path, e))?;
        Ok(Bytes::from(buf))
    }

    async fn length(&self, path: &str) -> Result<u64> {
        let local = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&local)
            .await
            .map_err(|e| Error::io(path, e))?;
        Ok(metadata.len())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Serves files from memory
///
/// Used by tests and by callers that already hold the artifacts. Counts
/// every read so callers can observe cache behaviour.
#[derive(Debug, Default)]
pub struct MemoryFileIO {
    files: DashMap<String, Bytes>,
    reads: AtomicU64,
}

impl MemoryFileIO {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a file
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Bytes>) {
        self.files.insert(path.into(), data.into());
    }

    pub fn remove(&self, path: &str) -> bool {
        self.files.remove(path).is_some()
    }

    /// Number of reads served so far
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn get(&self, path: &str) -> Result<Bytes> {
        self.files
            .get(path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::NotFound {
                path: path.to_string(),
            })
    }
}

#[async_trait]
impl FileIO for MemoryFileIO {
    async fn read(&self, path: &str, range: Option<Range<u64>>) -> Result<Bytes> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let data = self.get(path)?;
        let Some(range) = range else {
            return Ok(data);
        };
        check_range(path, &range)?;
        let len = data.len() as u64;
        if range.end > len {
            return Err(short_read(path, &range, len));
        }
        Ok(data.slice(range.start as usize..range.end as usize))
    }

    async fn length(&self, path: &str) -> Result<u64> {
        Ok(self.get(path)?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_io() {
        let io = MemoryFileIO::new();
        io.insert("mem://a", "hello world");

        assert_eq!(io.read("mem://a", None).await.unwrap(), "hello world");
        assert_eq!(io.read("mem://a", Some(6..11)).await.unwrap(), "world");
        assert_eq!(io.length("mem://a").await.unwrap(), 11);
        assert_eq!(io.reads(), 2);

        let err = io.read("mem://a", Some(6..20)).await.unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable { .. }));
        assert!(!err.is_retryable());
        let err = io.read("mem://missing", None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_local_io() {
        let dir = std::env::temp_dir().join(format!("iceberg-planner-io-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let file = dir.join("data.bin");
        tokio::fs::write(&file, b"0123456789").await.unwrap();

        let io = LocalFileIO::new();
        let path = file.to_str().unwrap();
        assert_eq!(io.read(path, Some(2..5)).await.unwrap(), "234");
        assert_eq!(io.length(path).await.unwrap(), 10);

        let url = Url::from_file_path(&file).unwrap();
        assert_eq!(io.read(url.as_str(), None).await.unwrap(), "0123456789");

        let rooted = LocalFileIO::with_root(&dir);
        assert_eq!(rooted.length("data.bin").await.unwrap(), 10);

        let err = io.read("s3://bucket/key", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        let err = rooted.read("nope.bin", None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
