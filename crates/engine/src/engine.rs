//! The execution engine abstraction.
//!
//! An engine does one thing: run a batch of independent partition tasks and
//! hand back their outputs. Partitioning, schema enforcement and merging are
//! shared by every engine and live in the provided methods of
//! [`ExecutionEngine`], so engines only differ in how they schedule tasks.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use shardcast_core::{Frame, JobId, KeyValue, Schema, SchemaSpec, ID_COL};

use crate::broadcast::Broadcast;
use crate::conf::EngineConf;
use crate::error::{EngineError, EngineResult, WorkerError};
use crate::table::{RemoteFrame, Table};

/// Worker applied to one partition.
pub type PartitionFn<'a> = dyn Fn(Frame, &Broadcast) -> Result<Frame, WorkerError> + Send + Sync + 'a;

/// Worker applied to the matching partitions of two co-grouped tables.
pub type CoPartitionFn<'a> =
    dyn Fn(Frame, Frame, &Broadcast) -> Result<Frame, WorkerError> + Send + Sync + 'a;

/// How to split a table into independently processed groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub by: String,
}

impl PartitionSpec {
    pub fn by(column: impl Into<String>) -> Self {
        Self { by: column.into() }
    }

    /// One partition per entity.
    pub fn entity() -> Self {
        Self::by(ID_COL)
    }
}

/// A partitioned map over one table.
#[derive(Clone, Copy)]
pub struct TransformJob<'a> {
    pub worker: &'a PartitionFn<'a>,
    pub params: &'a Broadcast,
    pub schema: &'a SchemaSpec,
    pub partition: &'a PartitionSpec,
    pub conf: &'a EngineConf,
}

/// A co-grouped map over two tables.
#[derive(Clone, Copy)]
pub struct ZipJob<'a> {
    pub worker: &'a CoPartitionFn<'a>,
    pub params: &'a Broadcast,
    pub schema: &'a SchemaSpec,
    pub partition: &'a PartitionSpec,
    pub conf: &'a EngineConf,
}

/// One unit of schedulable work: a partition key and the closure producing its output.
pub struct Task<'a> {
    pub key: KeyValue,
    run: Box<dyn FnOnce() -> EngineResult<Frame> + Send + 'a>,
}

impl<'a> Task<'a> {
    pub fn new(key: KeyValue, run: impl FnOnce() -> EngineResult<Frame> + Send + 'a) -> Self {
        Self {
            key,
            run: Box::new(run),
        }
    }

    pub fn run(self) -> (KeyValue, EngineResult<Frame>) {
        (self.key, (self.run)())
    }
}

impl fmt::Debug for Task<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("key", &self.key).finish_non_exhaustive()
    }
}

/// Something that can run partition tasks.
pub trait ExecutionEngine: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Run every task and return the outputs in task order.
    ///
    /// Any failed task fails the whole batch.
    fn run_tasks(&self, tasks: Vec<Task<'_>>, conf: &EngineConf) -> EngineResult<Vec<Frame>>;

    /// Register a table with this engine as a native dataset.
    fn persist(&self, table: Table) -> RemoteFrame {
        match table {
            Table::Remote(remote) => remote,
            Table::Local(frame) => {
                let schema = frame.schema().clone();
                RemoteFrame::new(self.name(), schema, vec![frame])
            }
        }
    }

    /// Partition `input`, apply the worker to each partition, merge the results.
    fn transform(&self, input: &Table, job: TransformJob<'_>) -> EngineResult<RemoteFrame> {
        let job_id = JobId::new();
        let span = info_span!("transform", job = %job_id, engine = self.name());
        let _guard = span.enter();

        let output = job.schema.resolve(input.schema())?;
        let parts = input.partition_by(&job.partition.by)?;
        info!(
            partitions = parts.len(),
            by = %job.partition.by,
            schema = %output,
            params_bytes = job.params.size(),
            "submitting partitioned transform"
        );

        let tasks: Vec<Task<'_>> = parts
            .into_iter()
            .map(|(key, part)| {
                let output = &output;
                let partition = key.to_string();
                Task::new(key, move || {
                    let rows = part.len();
                    let out = (job.worker)(part, job.params).map_err(|source| EngineError::Worker {
                        partition: partition.clone(),
                        source,
                    })?;
                    debug!(partition = %partition, rows_in = rows, rows_out = out.len(), "partition done");
                    conform(out, output, partition)
                })
            })
            .collect();

        let frames = self.run_tasks(tasks, job.conf)?;
        Ok(RemoteFrame::new(self.name(), output, frames))
    }

    /// Co-group `left` and `right` by the partition key and apply the worker to
    /// each pair.
    ///
    /// Every key of `left` is processed; when `right` has no rows for it, the
    /// worker receives an empty frame with `right`'s schema. Keys present only
    /// in `right` are ignored.
    fn zip_transform(&self, left: &Table, right: &Table, job: ZipJob<'_>) -> EngineResult<RemoteFrame> {
        let job_id = JobId::new();
        let span = info_span!("zip_transform", job = %job_id, engine = self.name());
        let _guard = span.enter();

        let output = job.schema.resolve(left.schema())?;
        let left_parts = left.partition_by(&job.partition.by)?;
        let mut right_parts = right.partition_by(&job.partition.by)?;
        let right_schema: Schema = right.schema().clone();
        let unmatched = right_parts
            .keys()
            .filter(|k| !left_parts.contains_key(*k))
            .count();
        info!(
            partitions = left_parts.len(),
            unmatched_right = unmatched,
            by = %job.partition.by,
            schema = %output,
            "submitting co-partitioned transform"
        );

        let tasks: Vec<Task<'_>> = left_parts
            .into_iter()
            .map(|(key, left_part)| {
                let right_part = right_parts
                    .remove(&key)
                    .unwrap_or_else(|| Frame::new(right_schema.clone()));
                let output = &output;
                let partition = key.to_string();
                Task::new(key, move || {
                    let out = (job.worker)(left_part, right_part, job.params).map_err(|source| {
                        EngineError::Worker {
                            partition: partition.clone(),
                            source,
                        }
                    })?;
                    debug!(partition = %partition, rows_out = out.len(), "co-partition done");
                    conform(out, output, partition)
                })
            })
            .collect();

        let frames = self.run_tasks(tasks, job.conf)?;
        Ok(RemoteFrame::new(self.name(), output, frames))
    }
}

fn conform(frame: Frame, schema: &Schema, partition: String) -> EngineResult<Frame> {
    frame
        .conform(schema)
        .map_err(|source| EngineError::SchemaMismatch { partition, source })
}

/// Keep the first error in task order, after logging every failure.
pub(crate) fn first_error(
    results: Vec<(KeyValue, EngineResult<Frame>)>,
) -> EngineResult<Vec<Frame>> {
    let mut frames = Vec::with_capacity(results.len());
    let mut first: Option<EngineError> = None;
    for (key, result) in results {
        match result {
            Ok(frame) => frames.push(frame),
            Err(err) => {
                tracing::error!(partition = %key, error = %err, "partition failed");
                first.get_or_insert(err);
            }
        }
    }
    match first {
        Some(err) => Err(err),
        None => Ok(frames),
    }
}
