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

//! Scan planning
//!
//! [`TableScan`] turns a snapshot of a table into an ordered list of
//! [`FileScanTask`]s:
//!
//! 1. resolve the snapshot, the projection and the row filter
//! 2. read the snapshot's manifest list
//! 3. skip manifests whose partition summaries cannot match the filter
//! 4. decode the remaining manifests, at most `planning_concurrency` at once
//! 5. skip files by partition value, then by column metrics
//! 6. merge entries in manifest-list order and attach delete files
//!
//! # Example
//!
//! ```no_run
//! use iceberg_planner::expr::Reference;
//! use iceberg_planner::io::LocalFileIO;
//! use iceberg_planner::scan::SnapshotSelector;
//! use iceberg_planner::spec::Datum;
//! use iceberg_planner::table::Table;
//! use std::sync::Arc;
//!
//! # async fn example() -> iceberg_planner::error::Result<()> {
//! let table = Table::from_metadata_location(
//!     Arc::new(LocalFileIO::new()),
//!     "/warehouse/db/events/metadata/v3.metadata.json",
//! )
//! .await?;
//!
//! let plan = table
//!     .scan()
//!     .snapshot(SnapshotSelector::Ref("main".into()))
//!     .filter(Reference::new("x").greater_than(Datum::long(100)))
//!     .build()
//!     .plan_files()
//!     .await?;
//!
//! for task in &plan.tasks {
//!     println!("{} ({} records)", task.file_path, task.record_count);
//! }
//! # Ok(())
//! # }
//! ```

mod delete_index;
mod projection;
mod selector;
mod task;

pub use projection::{ColumnSelection, FieldSource, ProjectedSchema};
pub use selector::{Ancestors, SnapshotLineage, SnapshotSelector};
pub use task::{DeleteFileRef, FileScanTask, PruningStats, ScanPlan};

use crate::error::{Error, Result};
use crate::expr::{
    BoundPredicate, ExpressionEvaluator, InclusiveMetricsEvaluator, InclusiveProjection,
    ManifestEvaluator, Predicate, ResidualEvaluator,
};
use crate::spec::datatypes::StructType;
use crate::spec::manifest::{Manifest, ManifestEntry, ManifestStatus};
use crate::spec::manifest_list::{ManifestContentType, ManifestFile, ManifestList};
use crate::spec::partition::PartitionSpec;
use crate::spec::snapshot::Snapshot;
use crate::spec::table_metadata::{FormatVersion, TableMetadata};
use crate::table::Table;
use delete_index::DeleteFileIndex;
use futures_util::{StreamExt, TryStreamExt, stream};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

/// Table property overriding the default planning concurrency
pub const PLANNING_CONCURRENCY_PROPERTY: &str = "read.planning.concurrency";

/// Manifests decoded at once when neither the scan nor the table says otherwise
pub const DEFAULT_PLANNING_CONCURRENCY: usize = 8;

/// Scan of one table snapshot
///
/// Built with [`Table::scan`]; run with [`plan_files`](Self::plan_files).
#[derive(Clone, Debug, TypedBuilder)]
pub struct TableScan {
    #[builder(!default)] // force required
    table: Table,
    #[builder(default, setter(into))]
    snapshot: SnapshotSelector,
    #[builder(default, setter(into))]
    select: ColumnSelection,
    #[builder(default, setter(into))]
    filter: Option<Predicate>,
    #[builder(default = true)]
    case_sensitive: bool,
    /// Overrides `read.planning.concurrency`
    #[builder(default, setter(into))]
    planning_concurrency: Option<usize>,
    #[builder(default)]
    cancellation: CancellationToken,
    /// Planning fails with `Cancelled` once this instant passes
    #[builder(default, setter(into))]
    deadline: Option<Instant>,
}

/// Builder type alias for [`TableScan`].
///
/// Returned by [`Table::scan`] with the table already set.
pub type TableScanBldr = TableScanBuilder<((Table,), (), (), (), (), (), (), ())>;

/// Partition spec of a manifest with the filter projected onto it
struct SpecContext {
    spec: Arc<PartitionSpec>,
    partition_type: StructType,
    manifest_evaluator: ManifestEvaluator,
    partition_evaluator: ExpressionEvaluator,
}

/// Filter state shared by every manifest of a plan
struct FilterContext {
    specs: HashMap<i32, SpecContext>,
    metrics: InclusiveMetricsEvaluator,
    residuals: ResidualEvaluator,
    projected: Arc<ProjectedSchema>,
}

/// Change a manifest entry makes to the planned file set
enum EntryChange {
    Add(FileScanTask),
    Remove(String),
    Delete { entry: ManifestEntry, unpartitioned: bool },
}

#[derive(Default)]
struct ManifestOutcome {
    changes: Vec<EntryChange>,
    files_total: usize,
    pruned_by_partition: usize,
    pruned_by_metrics: usize,
}

impl TableScan {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn snapshot_selector(&self) -> &SnapshotSelector {
        &self.snapshot
    }

    /// Manifests decoded at once: the scan setting, the table property, or 8
    pub fn planning_concurrency(&self) -> Result<usize> {
        let concurrency = match self.planning_concurrency {
            Some(n) => n,
            None => match self
                .table
                .metadata()
                .properties()
                .get(PLANNING_CONCURRENCY_PROPERTY)
            {
                Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                    Error::invalid_argument(format!(
                        "table property {PLANNING_CONCURRENCY_PROPERTY} is not a positive integer: '{raw}'"
                    ))
                })?,
                None => DEFAULT_PLANNING_CONCURRENCY,
            },
        };
        if concurrency == 0 {
            return Err(Error::invalid_argument(
                "planning concurrency must be at least 1",
            ));
        }
        Ok(concurrency)
    }

    /// Plans the scan
    ///
    /// A table without snapshots plans to no tasks when the current snapshot
    /// is requested. Any decode error fails the whole plan; no partial task
    /// list is returned.
    pub async fn plan_files(self) -> Result<ScanPlan> {
        let metadata = self.table.metadata().clone();
        let concurrency = self.planning_concurrency()?;
        let schema = metadata.current_schema();
        let projected = Arc::new(ProjectedSchema::resolve(
            schema,
            &self.select,
            self.case_sensitive,
        )?);
        let filter = match &self.filter {
            Some(filter) => filter.bind(schema, self.case_sensitive)?,
            None => BoundPredicate::AlwaysTrue,
        };

        if self.snapshot == SnapshotSelector::Current && metadata.current_snapshot_id().is_none() {
            log::debug!("table {} has no snapshots", self.table.name());
            return Ok(ScanPlan::empty(projected));
        }
        let snapshot = self.snapshot.resolve(&metadata)?;
        let snapshot_id = snapshot.snapshot_id;

        let plan = self
            .plan_snapshot(&metadata, &snapshot, projected, filter, concurrency)
            .await
            .map_err(|e| e.with_snapshot(snapshot_id))?;
        log::debug!(
            "planned snapshot {snapshot_id} of {}: {} tasks, {}",
            self.table.name(),
            plan.tasks.len(),
            plan.stats
        );
        Ok(plan)
    }

    async fn plan_snapshot(
        &self,
        metadata: &TableMetadata,
        snapshot: &Snapshot,
        projected: Arc<ProjectedSchema>,
        filter: BoundPredicate,
        concurrency: usize,
    ) -> Result<ScanPlan> {
        let version = metadata.format_version();
        let manifest_list = self
            .guarded(self.load_manifest_list(&snapshot.manifest_list, version))
            .await?;

        let context = FilterContext {
            specs: spec_contexts(metadata, manifest_list.entries(), &filter)?,
            metrics: InclusiveMetricsEvaluator::new(filter.clone()),
            residuals: ResidualEvaluator::new(filter),
            projected: projected.clone(),
        };

        let mut stats = PruningStats {
            manifests_total: manifest_list.entries().len(),
            ..Default::default()
        };
        let mut selected = Vec::new();
        for manifest in manifest_list.entries() {
            let spec = context.spec(manifest)?;
            // deleted entries still have to reach the merge
            let empty = !manifest.has_live_files() && !manifest.has_deleted_files();
            if empty || !spec.manifest_evaluator.eval(manifest)? {
                log::debug!("skipping manifest {}", manifest.manifest_path);
                stats.manifests_pruned += 1;
                continue;
            }
            selected.push((manifest, spec));
        }

        let outcomes: Vec<ManifestOutcome> = stream::iter(selected.into_iter().map(
            |(manifest_file, spec)| {
                let context = &context;
                async move {
                    let manifest = self
                        .guarded(self.load_manifest(manifest_file, &spec.partition_type, version))
                        .await?;
                    context.plan_manifest(manifest_file, &manifest, spec)
                }
            },
        ))
        .buffered(concurrency)
        .try_collect()
        .await?;

        let tasks = merge(outcomes, &mut stats);
        Ok(ScanPlan {
            snapshot_id: Some(snapshot.snapshot_id),
            schema: projected,
            tasks,
            stats,
        })
    }

    async fn load_manifest_list(
        &self,
        path: &str,
        version: FormatVersion,
    ) -> Result<Arc<ManifestList>> {
        let io = self.table.io();
        self.table
            .cache()
            .manifest_list(path, || async {
                let bytes = io.read(path, None).await?;
                ManifestList::parse(&bytes, path, version)
            })
            .await
    }

    async fn load_manifest(
        &self,
        manifest: &ManifestFile,
        partition_type: &StructType,
        version: FormatVersion,
    ) -> Result<Arc<Manifest>> {
        let io = self.table.io();
        let path = manifest.manifest_path.as_str();
        self.table
            .cache()
            .manifest(path, manifest.manifest_length, || async {
                let bytes = io.read(path, None).await?;
                Manifest::parse(&bytes, manifest, partition_type, version)
            })
            .await
    }

    /// Runs `fut` unless the scan is cancelled or its deadline passes first
    async fn guarded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(Error::Cancelled),
            _ = deadline => {
                log::debug!("scan planning of {} ran past its deadline", self.table.name());
                Err(Error::Cancelled)
            }
            result = fut => result,
        }
    }
}

fn spec_contexts(
    metadata: &TableMetadata,
    manifests: &[ManifestFile],
    filter: &BoundPredicate,
) -> Result<HashMap<i32, SpecContext>> {
    let mut specs = HashMap::new();
    for manifest in manifests {
        let spec_id = manifest.partition_spec_id;
        if specs.contains_key(&spec_id) {
            continue;
        }
        let spec = metadata.partition_spec_by_id(spec_id).ok_or_else(|| {
            Error::manifest_corrupt(
                &manifest.manifest_path,
                format!("unknown partition spec id {spec_id}"),
            )
        })?;
        let partition_type = metadata.partition_type(spec_id)?;
        let projected = InclusiveProjection::new(spec, &partition_type).project(filter)?;
        log::debug!("filter projected onto spec {spec_id}: {}", projected.to_json());
        specs.insert(
            spec_id,
            SpecContext {
                spec: spec.clone(),
                manifest_evaluator: ManifestEvaluator::new(projected.clone(), spec),
                partition_evaluator: ExpressionEvaluator::new(projected, spec),
                partition_type,
            },
        );
    }
    Ok(specs)
}

impl FilterContext {
    fn spec(&self, manifest: &ManifestFile) -> Result<&SpecContext> {
        self.specs.get(&manifest.partition_spec_id).ok_or_else(|| {
            Error::manifest_corrupt(
                &manifest.manifest_path,
                format!("unknown partition spec id {}", manifest.partition_spec_id),
            )
        })
    }

    /// Prunes the entries of one decoded manifest
    fn plan_manifest(
        &self,
        manifest_file: &ManifestFile,
        manifest: &Manifest,
        spec: &SpecContext,
    ) -> Result<ManifestOutcome> {
        let mut outcome = ManifestOutcome::default();
        let unpartitioned = spec.spec.is_unpartitioned();

        for entry in manifest.entries() {
            let file = &entry.data_file;
            if file.is_delete() {
                if entry.is_alive() {
                    outcome.changes.push(EntryChange::Delete {
                        entry: entry.clone(),
                        unpartitioned,
                    });
                }
                continue;
            }
            if manifest_file.content == ManifestContentType::Deletes {
                return Err(Error::manifest_corrupt(
                    &manifest_file.manifest_path,
                    format!("delete manifest lists data file '{}'", file.file_path),
                ));
            }
            if entry.status == ManifestStatus::Deleted {
                outcome.changes.push(EntryChange::Remove(file.file_path.clone()));
                continue;
            }

            outcome.files_total += 1;
            if !spec.partition_evaluator.eval(&file.partition)? {
                outcome.pruned_by_partition += 1;
                continue;
            }
            if !self.metrics.eval(file)? {
                outcome.pruned_by_metrics += 1;
                continue;
            }
            let residual = self.residuals.residual_for(&spec.spec, &file.partition)?;
            outcome.changes.push(EntryChange::Add(FileScanTask::new(
                file,
                entry.sequence_number,
                self.projected.clone(),
                residual,
            )));
        }
        Ok(outcome)
    }
}

/// Applies entry changes in manifest-list order
///
/// The first live entry for a path wins; a deleted entry drops the path
/// if it was planned by an earlier entry.
fn merge(outcomes: Vec<ManifestOutcome>, stats: &mut PruningStats) -> Vec<FileScanTask> {
    let mut slots: Vec<Option<FileScanTask>> = Vec::new();
    let mut by_path: HashMap<String, usize> = HashMap::new();
    let mut deletes = DeleteFileIndex::default();

    for outcome in outcomes {
        stats.files_total += outcome.files_total;
        stats.files_pruned_by_partition += outcome.pruned_by_partition;
        stats.files_pruned_by_metrics += outcome.pruned_by_metrics;
        for change in outcome.changes {
            match change {
                EntryChange::Add(task) => {
                    if by_path.contains_key(&task.file_path) {
                        log::debug!("dropping duplicate entry for {}", task.file_path);
                        continue;
                    }
                    by_path.insert(task.file_path.clone(), slots.len());
                    slots.push(Some(task));
                }
                EntryChange::Remove(path) => {
                    if let Some(slot) = by_path.remove(&path) {
                        slots[slot] = None;
                    }
                }
                EntryChange::Delete {
                    entry,
                    unpartitioned,
                } => deletes.add(&entry.data_file, entry.sequence_number, unpartitioned),
            }
        }
    }
    stats.delete_files = deletes.len();

    slots
        .into_iter()
        .flatten()
        .map(|mut task| {
            task.deletes = deletes.for_data_file(
                task.spec_id,
                &task.partition_values,
                &task.file_path,
                task.data_sequence_number,
            );
            task
        })
        .collect()
}
