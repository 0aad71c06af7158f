//! Engine configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable overriding [`EngineConf::max_workers`].
pub const MAX_WORKERS_ENV: &str = "SHARDCAST_MAX_WORKERS";

/// [`EngineConf::extra`] key naming the threads of a threaded engine's pool.
pub const THREAD_NAME_PREFIX: &str = "thread_name_prefix";

/// Per-job engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConf {
    /// Upper bound on concurrently running partitions (`None`: one per core).
    #[serde(default)]
    pub max_workers: Option<usize>,
    /// Stop scheduling partitions after the first failure.
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
    /// Engine-specific options. Engines ignore keys they do not recognise;
    /// the threaded engine reads [`THREAD_NAME_PREFIX`].
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

fn default_fail_fast() -> bool {
    true
}

impl Default for EngineConf {
    fn default() -> Self {
        Self {
            max_workers: None,
            fail_fast: default_fail_fast(),
            extra: BTreeMap::new(),
        }
    }
}

impl EngineConf {
    /// Defaults, with `max_workers` taken from `SHARDCAST_MAX_WORKERS` when set.
    pub fn from_env() -> Self {
        let conf = Self::default();
        match std::env::var(MAX_WORKERS_ENV) {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => conf.with_max_workers(n),
                _ => {
                    warn!(value = %raw, "{MAX_WORKERS_ENV} is not a positive integer; ignoring");
                    conf
                }
            },
            Err(_) => conf,
        }
    }

    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = Some(max);
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}
