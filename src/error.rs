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

//! Error types for metadata loading and scan planning
//!
//! Every failure surfaces as a single [`Error`] value naming the artifact
//! (metadata file, manifest, data file or snapshot) that caused it.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Planning errors
///
/// Decode errors are fatal for the current plan: no partial task list is
/// ever returned alongside one of these.
#[derive(Debug, Error)]
pub enum Error {
    /// Table format version newer than this crate understands
    #[error("unsupported table format version {version} (highest supported is {supported})")]
    UnsupportedVersion {
        /// Version found in the document or manifest
        version: i64,
        /// Highest version this crate can read
        supported: u8,
    },

    /// Table metadata document is malformed or inconsistent
    #[error("corrupt table metadata{}: {message}", fmt_location(.location))]
    MetadataCorrupt {
        /// Location of the metadata document, when known
        location: Option<String>,
        /// What was wrong with it
        message: String,
    },

    /// Manifest list or manifest file is malformed
    #[error("corrupt manifest '{path}': {message}")]
    ManifestCorrupt {
        /// Path of the manifest list or manifest file
        path: String,
        /// What was wrong with it
        message: String,
    },

    /// No snapshot matched the requested selector
    #[error("snapshot not found: {selector}")]
    SnapshotNotFound {
        /// Human-readable form of the selector
        selector: String,
    },

    /// Requested column does not exist in the current schema
    #[error("projection error: {message}")]
    ProjectionError {
        /// Description of the unresolved column
        message: String,
    },

    /// Predicate literal cannot be coerced to the column type
    #[error("predicate type error: {message}")]
    PredicateTypeError {
        /// Description of the type mismatch
        message: String,
    },

    /// Catalog collaborator failed to resolve a table
    #[error("catalog unavailable: {message}")]
    CatalogUnavailable {
        /// Failure reported by the catalog
        message: String,
    },

    /// Catalog has no table with the given identifier
    #[error("table not found: {table}")]
    TableNotFound {
        /// Table identifier
        table: String,
    },

    /// Filesystem collaborator failed to serve a read
    #[error("storage unavailable for '{path}': {source}")]
    StorageUnavailable {
        /// Path being read
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Path does not exist on the filesystem collaborator
    #[error("file not found: {path}")]
    NotFound {
        /// Missing path
        path: String,
    },

    /// Planning was cancelled or ran past its deadline
    #[error("scan planning cancelled")]
    Cancelled,

    /// Caller supplied an invalid configuration value
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid value
        message: String,
    },

    /// Error raised while planning a specific snapshot
    #[error("snapshot {snapshot_id}: {source}")]
    InSnapshot {
        /// Snapshot being planned
        snapshot_id: i64,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
}

fn fmt_location(location: &Option<String>) -> String {
    match location {
        Some(location) => format!(" '{location}'"),
        None => String::new(),
    }
}

impl Error {
    /// Creates a `MetadataCorrupt` error without a location
    pub fn metadata_corrupt(message: impl Into<String>) -> Self {
        Error::MetadataCorrupt {
            location: None,
            message: message.into(),
        }
    }

    /// Creates a `ManifestCorrupt` error for the given path
    pub fn manifest_corrupt(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ManifestCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn projection(message: impl Into<String>) -> Self {
        Error::ProjectionError {
            message: message.into(),
        }
    }

    pub(crate) fn predicate_type(message: impl Into<String>) -> Self {
        Error::PredicateTypeError {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Maps an I/O failure on `path`; a missing file is not retryable
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound { path },
            _ => Error::StorageUnavailable { path, source },
        }
    }

    /// Attaches a metadata location to a `MetadataCorrupt` error
    pub fn with_location(self, location: &str) -> Self {
        match self {
            Error::MetadataCorrupt {
                location: None,
                message,
            } => Error::MetadataCorrupt {
                location: Some(location.to_string()),
                message,
            },
            other => other,
        }
    }

    /// Wraps the error with the snapshot being planned
    ///
    /// Cancellation is left unwrapped so callers can match on it directly.
    pub fn with_snapshot(self, snapshot_id: i64) -> Self {
        match self {
            Error::Cancelled | Error::InSnapshot { .. } => self,
            other => Error::InSnapshot {
                snapshot_id,
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, skipping snapshot context
    pub fn root(&self) -> &Error {
        match self {
            Error::InSnapshot { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether a retry at the collaborator boundary may succeed
    ///
    /// A read past the end of a file fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            Error::StorageUnavailable { source, .. } => {
                source.kind() != std::io::ErrorKind::UnexpectedEof
            }
            Error::CatalogUnavailable { .. } => true,
            _ => false,
        }
    }

    /// Rebuilds an error that several waiters observed through one shared load
    pub(crate) fn duplicate(&self) -> Error {
        match self {
            Error::UnsupportedVersion { version, supported } => Error::UnsupportedVersion {
                version: *version,
                supported: *supported,
            },
            Error::MetadataCorrupt { location, message } => Error::MetadataCorrupt {
                location: location.clone(),
                message: message.clone(),
            },
            Error::ManifestCorrupt { path, message } => Error::ManifestCorrupt {
                path: path.clone(),
                message: message.clone(),
            },
            Error::SnapshotNotFound { selector } => Error::SnapshotNotFound {
                selector: selector.clone(),
            },
            Error::ProjectionError { message } => Error::projection(message.clone()),
            Error::PredicateTypeError { message } => Error::predicate_type(message.clone()),
            Error::CatalogUnavailable { message } => Error::CatalogUnavailable {
                message: message.clone(),
            },
            Error::TableNotFound { table } => Error::TableNotFound {
                table: table.clone(),
            },
            Error::StorageUnavailable { path, source } => Error::StorageUnavailable {
                path: path.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            Error::NotFound { path } => Error::NotFound { path: path.clone() },
            Error::Cancelled => Error::Cancelled,
            Error::InvalidArgument { message } => Error::invalid_argument(message.clone()),
            Error::InSnapshot {
                snapshot_id,
                source,
            } => Error::InSnapshot {
                snapshot_id: *snapshot_id,
                source: Box::new(source.duplicate()),
            },
        }
    }

    /// Whether planning was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Error::Cancelled)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::metadata_corrupt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnsupportedVersion {
            version: 3,
            supported: 2,
        };
        assert_eq!(
            err.to_string(),
            "unsupported table format version 3 (highest supported is 2)"
        );

        let err = Error::manifest_corrupt("s3://b/m0.avro", "truncated block");
        assert_eq!(
            err.to_string(),
            "corrupt manifest 's3://b/m0.avro': truncated block"
        );

        let err = Error::metadata_corrupt("missing schemas").with_location("/t/v1.metadata.json");
        assert_eq!(
            err.to_string(),
            "corrupt table metadata '/t/v1.metadata.json': missing schemas"
        );
    }

    #[test]
    fn test_snapshot_context() {
        let err = Error::manifest_corrupt("m0.avro", "bad").with_snapshot(42);
        assert_eq!(err.to_string(), "snapshot 42: corrupt manifest 'm0.avro': bad");
        assert!(matches!(err.root(), Error::ManifestCorrupt { .. }));

        // Wrapping twice keeps the first snapshot
        let err = err.with_snapshot(7);
        assert!(matches!(err, Error::InSnapshot { snapshot_id: 42, .. }));

        assert!(matches!(Error::Cancelled.with_snapshot(1), Error::Cancelled));
    }

    #[test]
    fn test_retryable() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout");
        let err = Error::StorageUnavailable {
            path: "m.avro".into(),
            source: io,
        };
        assert!(err.is_retryable());
        assert!(err.with_snapshot(1).is_retryable());
        assert!(!Error::NotFound { path: "x".into() }.is_retryable());
        assert!(!Error::metadata_corrupt("x").is_retryable());

        let eof = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert!(!Error::io("m.avro", eof).is_retryable());
    }

    #[test]
    fn test_io_mapping() {
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(matches!(Error::io("a", missing), Error::NotFound { .. }));

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let err = Error::io("a", denied);
        assert!(matches!(err, Error::StorageUnavailable { ref path, .. } if path == "a"));
    }

    #[test]
    fn test_duplicate() {
        let err = Error::io("m.avro", std::io::Error::from(std::io::ErrorKind::TimedOut))
            .with_snapshot(3);
        let copy = err.duplicate();
        assert_eq!(copy.to_string(), err.to_string());
        assert!(copy.is_retryable());
        assert!(matches!(copy, Error::InSnapshot { snapshot_id: 3, .. }));
    }
}
