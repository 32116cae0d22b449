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

//! # Iceberg scan planner (`iceberg-planner`)
//!
//! This crate turns the versioned metadata of an Apache Iceberg table into an
//! ordered list of data files to read. It is read-only: it never writes or
//! commits table state.
//!
//! Planning works on the immutable artifacts of a table:
//!
//! - the JSON metadata document ([`spec::TableMetadata`])
//! - per-snapshot manifest lists and manifests, stored as Avro container
//!   files ([`spec::ManifestList`], [`spec::Manifest`])
//!
//! A scan is configured with a typed builder and produces [`scan::FileScanTask`]s
//! with their residual filters and delete files.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use iceberg_planner::catalog::{StaticCatalog, TableIdent};
//! use iceberg_planner::expr::Reference;
//! use iceberg_planner::io::{LocalFileIO, RetryingFileIO};
//! use iceberg_planner::spec::Datum;
//! use iceberg_planner::table::Table;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let catalog = StaticCatalog::new();
//!     let ident: TableIdent = "db.events".parse().unwrap();
//!     catalog.register(ident.clone(), "/warehouse/db/events/metadata/v3.metadata.json");
//!
//!     let io = Arc::new(RetryingFileIO::new(LocalFileIO::new()));
//!     let table = Table::load(&catalog, io, &ident).await.expect("load failed");
//!
//!     let plan = table
//!         .scan()
//!         .select(vec![1, 2])
//!         .filter(Reference::new("x").greater_than(Datum::long(100)))
//!         .build()
//!         .plan_files()
//!         .await
//!         .expect("planning failed");
//!
//!     println!("{} files to read", plan.tasks.len());
//! }
//! ```
//!
//! ## Design
//! - Collaborators sit behind async traits: [`catalog::Catalog`] resolves table
//!   names and [`io::FileIO`] reads files
//! - Parsed metadata, manifest lists and manifests are shared through
//!   [`io::ObjectCache`]
//! - Every failure is an [`error::Error`] naming the artifact that caused it

#![allow(clippy::result_large_err)]

pub mod catalog;
pub mod error;
pub mod expr;
pub mod io;
pub mod scan;
pub mod spec;
pub mod table;

pub use error::{Error, Result};
pub use scan::{FileScanTask, ScanPlan, SnapshotSelector, TableScan};
pub use table::Table;

#[cfg(test)]
#[macro_use]
extern crate quickcheck;
