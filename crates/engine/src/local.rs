//! Sequential in-process engine.

use serde::{Deserialize, Serialize};

use shardcast_core::Frame;

use crate::conf::EngineConf;
use crate::engine::{first_error, ExecutionEngine, Task};
use crate::error::EngineResult;

/// Runs partitions one after another on the calling thread.
///
/// Useful for tests and small inputs; output is identical to the threaded
/// engine's because merging happens in key order either way.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEngine;

impl LocalEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionEngine for LocalEngine {
    fn name(&self) -> &str {
        "local"
    }

    fn run_tasks(&self, tasks: Vec<Task<'_>>, conf: &EngineConf) -> EngineResult<Vec<Frame>> {
        if conf.fail_fast {
            return tasks
                .into_iter()
                .map(|task| task.run().1)
                .collect();
        }
        first_error(tasks.into_iter().map(Task::run).collect())
    }
}
