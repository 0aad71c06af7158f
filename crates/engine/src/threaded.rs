//! Thread-pool engine backed by rayon.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use shardcast_core::Frame;

use crate::conf::{EngineConf, THREAD_NAME_PREFIX};
use crate::engine::{first_error, ExecutionEngine, Task};
use crate::error::{EngineError, EngineResult};

/// Runs partitions in parallel on a dedicated rayon pool.
///
/// The pool is built per job and dropped when the job finishes, so the engine
/// itself is plain configuration: it can be cloned, serialized and shipped
/// without dragging threads along.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadedEngine {
    /// Pool size when the job configuration does not set one.
    #[serde(default)]
    pub workers: Option<usize>,
}

const DEFAULT_THREAD_PREFIX: &str = "shardcast-worker";

impl ThreadedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: Some(workers),
        }
    }

    fn pool_size(&self, conf: &EngineConf, tasks: usize) -> usize {
        let available = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        conf.max_workers
            .or(self.workers)
            .unwrap_or(available)
            .clamp(1, tasks.max(1))
    }
}

impl ExecutionEngine for ThreadedEngine {
    fn name(&self) -> &str {
        "threaded"
    }

    fn run_tasks(&self, tasks: Vec<Task<'_>>, conf: &EngineConf) -> EngineResult<Vec<Frame>> {
        let threads = self.pool_size(conf, tasks.len());
        let prefix = conf.option(THREAD_NAME_PREFIX).unwrap_or(DEFAULT_THREAD_PREFIX).to_owned();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()
            .map_err(|e| EngineError::Startup(e.to_string()))?;
        debug!(threads, tasks = tasks.len(), "worker pool started");

        if conf.fail_fast {
            return pool.install(|| {
                tasks
                    .into_par_iter()
                    .map(|task| task.run().1)
                    .collect()
            });
        }
        let results = pool.install(|| tasks.into_par_iter().map(Task::run).collect());
        first_error(results)
    }
}
