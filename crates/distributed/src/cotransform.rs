//! Co-partitioned execution over two tables.

use tracing::info;

use shardcast_engine::{select_output, ExecutionEngine, OutputOptions, Table, ZipJob};

use crate::error::{surface, DistributedResult};

/// Co-group `left` and `right` by the job's partition key, run the worker on
/// each matching pair and return the single merged result.
///
/// The result is engine-native when `options.force_native` is set or either
/// input already was; `options.as_local` overrides both and collects it here.
/// Worker failures come back as job failures with their original error.
pub fn co_transform<E: ExecutionEngine + ?Sized>(
    engine: &E,
    left: &Table,
    right: &Table,
    job: ZipJob<'_>,
    options: OutputOptions,
) -> DistributedResult<Table> {
    let kind = select_output(left.is_native() || right.is_native(), options);
    let result = engine.zip_transform(left, right, job).map_err(surface)?;
    info!(
        engine = engine.name(),
        dataset = %result.dataset(),
        rows = result.len(),
        output = ?kind,
        "co-partitioned job finished"
    );
    Ok(kind.apply(result)?)
}
