//! Serializable engine selection.

use serde::{Deserialize, Serialize};

use shardcast_core::Frame;

use crate::conf::EngineConf;
use crate::engine::{ExecutionEngine, Task};
use crate::error::EngineResult;
use crate::local::LocalEngine;
use crate::threaded::ThreadedEngine;

const LOCAL: &LocalEngine = &LocalEngine;

/// One of the built-in engines.
///
/// A handle is configuration only; shipping it to another process and
/// deserializing it there yields an equivalent engine.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "snake_case")]
pub enum EngineHandle {
    #[default]
    Local,
    Threaded(ThreadedEngine),
}

impl EngineHandle {
    pub fn local() -> Self {
        EngineHandle::Local
    }

    pub fn threaded(workers: Option<usize>) -> Self {
        EngineHandle::Threaded(ThreadedEngine { workers })
    }
}

impl ExecutionEngine for EngineHandle {
    fn name(&self) -> &str {
        match self {
            EngineHandle::Local => LOCAL.name(),
            EngineHandle::Threaded(engine) => engine.name(),
        }
    }

    fn run_tasks(&self, tasks: Vec<Task<'_>>, conf: &EngineConf) -> EngineResult<Vec<Frame>> {
        match self {
            EngineHandle::Local => LOCAL.run_tasks(tasks, conf),
            EngineHandle::Threaded(engine) => engine.run_tasks(tasks, conf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_serialize_as_tagged_configuration() {
        let handle = EngineHandle::threaded(Some(4));
        let json = serde_json::to_value(handle).unwrap();
        assert_eq!(json, serde_json::json!({"engine": "threaded", "workers": 4}));
        let back: EngineHandle = serde_json::from_value(json).unwrap();
        assert_eq!(back, handle);
        assert_eq!(back.name(), "threaded");

        let local = serde_json::to_value(EngineHandle::local()).unwrap();
        assert_eq!(local, serde_json::json!({"engine": "local"}));
    }
}
