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

//! Iceberg table format model
//!
//! Types for the JSON metadata document and the Avro manifest structures:
//! schemas and their field-id indexes, partition specs and transforms,
//! snapshots, manifest lists and manifests.

mod avro;
pub mod datatypes;
pub mod manifest;
pub mod manifest_list;
pub mod partition;
pub mod schema;
pub mod snapshot;
pub mod sort;
pub mod table_metadata;
pub mod transform;
pub mod values;

pub use datatypes::{ListType, MapType, NestedField, PrimitiveType, StructType, Type};
pub use manifest::{
    DataContentType, DataFile, DataFileFormat, Manifest, ManifestEntry, ManifestMetadata,
    ManifestStatus,
};
pub use manifest_list::{FieldSummary, ManifestContentType, ManifestFile, ManifestList};
pub use partition::{PartitionField, PartitionSpec, PartitionValues};
pub use schema::Schema;
pub use snapshot::{Operation, Snapshot, SnapshotReference, SnapshotRetention, Summary};
pub use sort::{NullOrder, SortDirection, SortField, SortOrder};
pub use table_metadata::{FormatVersion, TableMetadata};
pub use transform::Transform;
pub use values::{Datum, PrimitiveLiteral};
