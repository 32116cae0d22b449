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

//! End-to-end scan planning over in-memory tables

use apache_avro::types::Value as AvroValue;
use iceberg_planner::expr::{BoundPredicate, Predicate, Reference};
use iceberg_planner::io::{FileIO, MemoryFileIO};
use iceberg_planner::scan::{ColumnSelection, FieldSource, SnapshotSelector};
use iceberg_planner::spec::{DataContentType, Datum};
use iceberg_planner::spec::manifest::POSITION_DELETE_FILE_PATH_ID;
use iceberg_planner::{Error, ScanPlan, Table};
use iceberg_planner_common::avro::*;
use iceberg_planner_common::metadata::TableMetadataFixture;
use iceberg_planner_common::string_bound;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LOCATION: &str = "mem://warehouse/db/events";
const METADATA: &str = "mem://warehouse/db/events/metadata/v1.metadata.json";

fn meta_path(name: &str) -> String {
    format!("{LOCATION}/metadata/{name}.avro")
}

fn data_path(name: &str) -> String {
    format!("{LOCATION}/data/{name}")
}

fn partition(x: i32) -> Vec<Option<AvroValue>> {
    vec![Some(AvroValue::Int(x))]
}

fn data_file(name: &str, x: i32) -> DataFileFixture {
    DataFileFixture::data(&data_path(name), 10).with_partition(partition(x))
}

/// Writes a manifest and returns its manifest list entry
fn write_manifest(
    io: &MemoryFileIO,
    name: &str,
    content: &str,
    (snapshot_id, sequence_number): (i64, i64),
    summary: (i32, i32),
    entries: Vec<EntryFixture>,
) -> ManifestFileFixture {
    let path = meta_path(name);
    let mut writer = ManifestWriter::new(2, content, vec![PartitionFieldFixture::new(
        1000, "x", "int",
    )]);
    for entry in entries {
        writer = writer.entry(entry);
    }
    let bytes = writer.write();
    let list_entry = match content {
        "deletes" => ManifestFileFixture::deletes(&path, bytes.len(), snapshot_id, sequence_number),
        _ => ManifestFileFixture::data(&path, bytes.len(), snapshot_id, sequence_number),
    };
    io.insert(path, bytes);
    list_entry.with_summary(FieldSummaryFixture::ints(summary.0, summary.1))
}

fn write_list(io: &MemoryFileIO, name: &str, manifests: Vec<ManifestFileFixture>) -> String {
    let mut list = ManifestListWriter::new(2);
    for manifest in manifests {
        list = list.entry(manifest);
    }
    let path = meta_path(name);
    io.insert(path.clone(), list.write());
    path
}

async fn open(io: &Arc<MemoryFileIO>, fixture: TableMetadataFixture) -> Table {
    io.insert(METADATA, fixture.to_bytes());
    Table::from_metadata_location(io.clone(), METADATA)
        .await
        .unwrap()
}

/// Snapshot 1 with two manifests: x in [10, 20] and x in [150, 300]
async fn two_manifest_table() -> (Table, Arc<MemoryFileIO>) {
    let io = Arc::new(MemoryFileIO::new());
    let m0 = write_manifest(
        &io,
        "m0",
        "data",
        (1, 1),
        (10, 20),
        vec![
            EntryFixture::added(data_file("a.parquet", 10)),
            EntryFixture::added(data_file("b.parquet", 20)),
        ],
    );
    let m1 = write_manifest(
        &io,
        "m1",
        "data",
        (1, 1),
        (150, 300),
        vec![
            EntryFixture::added(
                data_file("c.parquet", 150)
                    .with_bounds(2, string_bound("apple"), string_bound("mango")),
            ),
            EntryFixture::added(
                data_file("d.parquet", 300)
                    .with_bounds(2, string_bound("nectarine"), string_bound("quince")),
            ),
        ],
    );
    let list = write_list(&io, "snap-1", vec![m0, m1]);
    let table = open(
        &io,
        TableMetadataFixture::v2(LOCATION).with_snapshot(1, None, 1, 1_700_000_001_000, &list),
    )
    .await;
    (table, io)
}

fn names(plan: &ScanPlan) -> Vec<&str> {
    plan.file_paths()
        .map(|p| p.rsplit('/').next().unwrap_or(p))
        .collect()
}

#[tokio::test]
async fn manifest_outside_filter_is_never_read() {
    let (table, io) = two_manifest_table().await;
    let reads_before = io.reads();

    let plan = table
        .scan()
        .filter(Reference::new("x").greater_than(Datum::int(100)))
        .build()
        .plan_files()
        .await
        .unwrap();

    assert_eq!(names(&plan), vec!["c.parquet", "d.parquet"]);
    assert_eq!(plan.stats.manifests_pruned, 1);
    // manifest list and m1 only
    assert_eq!(io.reads() - reads_before, 2);
    for task in &plan.tasks {
        assert_eq!(task.residual_predicate, BoundPredicate::AlwaysTrue);
    }
}

#[tokio::test]
async fn column_metrics_prune_files() {
    let (table, _) = two_manifest_table().await;
    let plan = table
        .scan()
        .filter(Reference::new("name").equal_to("banana"))
        .build()
        .plan_files()
        .await
        .unwrap();

    // a and b carry no bounds for name and may match
    assert_eq!(names(&plan), vec!["a.parquet", "b.parquet", "c.parquet"]);
    assert_eq!(plan.stats.files_total, 4);
    assert_eq!(plan.stats.files_pruned_by_metrics, 1);
    assert_ne!(plan.tasks[0].residual_predicate, BoundPredicate::AlwaysTrue);
}

#[tokio::test]
async fn unknown_snapshot_fails() {
    let (table, _) = two_manifest_table().await;
    let err = table
        .scan()
        .snapshot(SnapshotSelector::Id(999))
        .build()
        .plan_files()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SnapshotNotFound { .. }));
}

#[tokio::test]
async fn empty_table_plans_nothing() {
    let io = Arc::new(MemoryFileIO::new());
    let table = open(&io, TableMetadataFixture::v2(LOCATION)).await;
    let plan = table.scan().build().plan_files().await.unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.snapshot_id, None);
}

#[tokio::test]
async fn truncated_manifest_fails_whole_plan() {
    let (table, io) = two_manifest_table().await;
    let path = meta_path("m1");
    let bytes = io.read(&path, None).await.unwrap();
    io.insert(path.clone(), bytes[..bytes.len() / 2].to_vec());

    let err = table.scan().build().plan_files().await.unwrap_err();
    assert!(matches!(err, Error::InSnapshot { snapshot_id: 1, .. }));
    assert!(
        matches!(err.root(), Error::ManifestCorrupt { path: p, .. } if *p == path),
        "{err}"
    );
}

#[tokio::test]
async fn planning_is_deterministic() {
    let (table, _) = two_manifest_table().await;
    let filter =
        Predicate::from_json(&json!({"type": "gt-eq", "term": "x", "value": 15})).unwrap();
    let plan = |concurrency: usize| {
        table
            .scan()
            .filter(filter.clone())
            .planning_concurrency(concurrency)
            .build()
            .plan_files()
    };
    let first = plan(1).await.unwrap();
    let second = plan(8).await.unwrap();
    assert_eq!(names(&first), vec!["b.parquet", "c.parquet", "d.parquet"]);
    assert_eq!(
        serde_json::to_value(&first.tasks).unwrap(),
        serde_json::to_value(&second.tasks).unwrap()
    );
}

#[tokio::test]
async fn manifest_of_only_deleted_entries_removes_files() {
    let io = Arc::new(MemoryFileIO::new());
    let m0 = write_manifest(
        &io,
        "m0",
        "data",
        (1, 1),
        (1, 2),
        vec![
            EntryFixture::added(data_file("a.parquet", 1)),
            EntryFixture::added(data_file("b.parquet", 2)),
        ],
    )
    .with_file_counts(2, 0, 0);
    let m1 = write_manifest(
        &io,
        "m1",
        "data",
        (1, 1),
        (1, 1),
        vec![EntryFixture::deleted(data_file("a.parquet", 1), 1, 1)],
    )
    .with_file_counts(0, 0, 1);
    let list = write_list(&io, "snap-1", vec![m0, m1]);
    let table = open(
        &io,
        TableMetadataFixture::v2(LOCATION).with_snapshot(1, None, 1, 1_700_000_001_000, &list),
    )
    .await;

    let plan = table.scan().build().plan_files().await.unwrap();
    assert_eq!(names(&plan), vec!["b.parquet"]);
    assert_eq!(plan.stats.manifests_pruned, 0);
}

#[tokio::test]
async fn cancelled_plan_reads_nothing() {
    let (table, io) = two_manifest_table().await;
    let reads_before = io.reads();
    let token = CancellationToken::new();
    token.cancel();

    let err = table
        .scan()
        .cancellation(token)
        .build()
        .plan_files()
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(io.reads(), reads_before);
}

#[tokio::test]
async fn projection_survives_schema_evolution() {
    let io = Arc::new(MemoryFileIO::new());
    let m0 = write_manifest(
        &io,
        "m0",
        "data",
        (1, 1),
        (1, 1),
        vec![EntryFixture::added(data_file("a.parquet", 1))],
    );
    let list = write_list(&io, "snap-1", vec![m0]);
    let fixture = TableMetadataFixture::v2(LOCATION)
        .with_snapshot(1, None, 1, 1_700_000_001_000, &list)
        .with_current_schema(json!({
            "type": "struct",
            "schema-id": 1,
            "fields": [
                {"id": 1, "name": "x", "required": false, "type": "int"},
                {"id": 2, "name": "label", "required": false, "type": "string"},
                {"id": 9, "name": "region", "required": false, "type": "string",
                 "initial-default": "us-east"},
                {"id": 10, "name": "score", "required": false, "type": "double"}
            ]
        }));
    let table = open(&io, fixture).await;

    let plan = table
        .scan()
        .select(ColumnSelection::Names(vec![
            "label".into(),
            "region".into(),
            "score".into(),
        ]))
        .build()
        .plan_files()
        .await
        .unwrap();
    assert_eq!(plan.schema.schema_id(), 1);

    let file_schema = table.metadata().schema_by_id(0).unwrap();
    assert_eq!(
        plan.tasks[0].projected_schema.resolve_against(file_schema),
        vec![
            (2, FieldSource::Present { name: "name".into() }),
            (9, FieldSource::Default(json!("us-east"))),
            (10, FieldSource::Null),
        ]
    );

    let err = table
        .scan()
        .select(ColumnSelection::Names(vec!["name".into()]))
        .build()
        .plan_files()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProjectionError { .. }));
}

#[tokio::test]
async fn delete_files_attach_by_partition_and_sequence() {
    let io = Arc::new(MemoryFileIO::new());
    let data = write_manifest(
        &io,
        "data-1",
        "data",
        (1, 1),
        (1, 2),
        vec![
            EntryFixture::added(data_file("a.parquet", 1)),
            EntryFixture::added(data_file("b.parquet", 2)),
        ],
    );
    let a_path = data_path("a.parquet");
    let deletes = write_manifest(
        &io,
        "deletes-2",
        "deletes",
        (2, 2),
        (1, 2),
        vec![
            EntryFixture::added(
                DataFileFixture::position_deletes(&data_path("pos-a.parquet"), 2)
                    .with_partition(partition(1))
                    .with_bounds(
                        POSITION_DELETE_FILE_PATH_ID,
                        string_bound(&a_path),
                        string_bound(&a_path),
                    ),
            ),
            EntryFixture::added(
                DataFileFixture::position_deletes(&data_path("pos-z.parquet"), 2)
                    .with_partition(partition(1))
                    .with_bounds(
                        POSITION_DELETE_FILE_PATH_ID,
                        string_bound(&data_path("z.parquet")),
                        string_bound(&data_path("z.parquet")),
                    ),
            ),
            EntryFixture::added(
                DataFileFixture::equality_deletes(&data_path("eq-b.parquet"), 1, vec![2])
                    .with_partition(partition(2)),
            ),
        ],
    );
    let list = write_list(&io, "snap-2", vec![data, deletes]);
    let table = open(
        &io,
        TableMetadataFixture::v2(LOCATION)
            .with_snapshot(1, None, 1, 1_700_000_001_000, &meta_path("snap-1"))
            .with_snapshot(2, Some(1), 2, 1_700_000_002_000, &list),
    )
    .await;

    let plan = table.scan().build().plan_files().await.unwrap();
    assert_eq!(names(&plan), vec!["a.parquet", "b.parquet"]);
    assert_eq!(plan.stats.delete_files, 3);

    let a = &plan.tasks[0];
    assert_eq!(a.deletes.len(), 1);
    assert_eq!(a.deletes[0].file_path, data_path("pos-a.parquet"));
    assert_eq!(a.deletes[0].content, DataContentType::PositionDeletes);
    assert_eq!(a.deletes[0].sequence_number, 2);

    let b = &plan.tasks[1];
    assert_eq!(b.deletes.len(), 1);
    assert_eq!(b.deletes[0].content, DataContentType::EqualityDeletes);
    assert_eq!(b.deletes[0].equality_ids, Some(vec![2]));
}

#[tokio::test]
async fn task_json_names_file_and_deletes() {
    let (table, _) = two_manifest_table().await;
    let plan = table
        .scan()
        .select(vec![1])
        .filter(Reference::new("x").equal_to(Datum::int(150)))
        .build()
        .plan_files()
        .await
        .unwrap();
    assert_eq!(plan.tasks.len(), 1);

    let value = serde_json::to_value(&plan).unwrap();
    let task = &value["file-scan-tasks"][0];
    assert_eq!(task["file-path"], data_path("c.parquet"));
    assert_eq!(task["file-format"], "parquet");
    assert_eq!(task["start"], 0);
    assert_eq!(task["length"], 10 * 16 + 128);
    assert_eq!(task["record-count"], 10);
    assert_eq!(task["partition"], json!([150]));
    assert_eq!(task["data-sequence-number"], 1);
    assert_eq!(task["residual"], json!({"type": "true"}));
    assert_eq!(task["delete-files"], json!([]));
    assert_eq!(
        task["projected-schema"]["fields"],
        json!([{"id": 1, "name": "x", "required": false, "type": "int"}])
    );
}
