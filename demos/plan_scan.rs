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

use clap::Parser;
use iceberg_planner::expr::Predicate;
use iceberg_planner::io::{LocalFileIO, RetryingFileIO};
use iceberg_planner::scan::{ColumnSelection, SnapshotSelector};
use iceberg_planner::Table;
use log::info;
use std::sync::Arc;

/// Plan a scan of a table on the local filesystem and print its file scan tasks as JSON.
#[derive(Parser)]
struct Cli {
    /// Path or file: URL of a table metadata JSON document
    metadata: String,
    /// Snapshot to read instead of the current one
    #[arg(long, conflicts_with_all = ["reference", "as_of"])]
    snapshot_id: Option<i64>,
    /// Branch or tag to read
    #[arg(long = "ref", conflicts_with = "as_of")]
    reference: Option<String>,
    /// Read the table as of this time (milliseconds since epoch)
    #[arg(long)]
    as_of: Option<i64>,
    /// Row filter as Iceberg REST expression JSON, e.g. '{"type":"gt","term":"x","value":100}'
    #[arg(long)]
    filter: Option<String>,
    /// Comma separated column names to project
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
    /// Match column names case-insensitively
    #[arg(long)]
    ignore_case: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init(); // Note: set environment variable RUST_LOG="DEBUG" to see pruning decisions
    let args = Cli::parse();

    let snapshot = match (args.snapshot_id, args.reference, args.as_of) {
        (Some(id), _, _) => SnapshotSelector::Id(id),
        (_, Some(name), _) => SnapshotSelector::Ref(name),
        (_, _, Some(ts)) => SnapshotSelector::AsOfTimestamp(ts),
        _ => SnapshotSelector::Current,
    };
    let filter = match &args.filter {
        Some(raw) => Some(Predicate::from_json(&serde_json::from_str(raw)?)?),
        None => None,
    };
    let select = match args.columns.is_empty() {
        true => ColumnSelection::All,
        false => ColumnSelection::Names(args.columns),
    };

    let io = Arc::new(RetryingFileIO::new(LocalFileIO::new()));
    let table = Table::from_metadata_location(io, &args.metadata).await?;
    let plan = table
        .scan()
        .snapshot(snapshot)
        .select(select)
        .filter(filter)
        .case_sensitive(!args.ignore_case)
        .build()
        .plan_files()
        .await?;

    info!("{}", plan.stats);
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
