//! Backend configuration.

use serde::{Deserialize, Serialize};

use shardcast_core::ForecastArgs;
use shardcast_engine::{EngineConf, EngineHandle, OutputOptions};

/// Everything a backend is constructed with.
///
/// Plain data: a configured backend can be serialized, shipped and rebuilt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "E: Deserialize<'de> + Default"))]
pub struct BackendConfig<E = EngineHandle> {
    #[serde(default)]
    pub engine: E,
    #[serde(default)]
    pub conf: EngineConf,
    #[serde(default)]
    pub output: OutputOptions,
    /// Arguments applied to every call; per-call arguments win.
    #[serde(default)]
    pub defaults: ForecastArgs,
}

impl<E> BackendConfig<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            conf: EngineConf::default(),
            output: OutputOptions::default(),
            defaults: ForecastArgs::default(),
        }
    }

    pub fn with_conf(mut self, conf: EngineConf) -> Self {
        self.conf = conf;
        self
    }

    pub fn with_output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }

    pub fn with_defaults(mut self, defaults: ForecastArgs) -> Self {
        self.defaults = defaults;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: BackendConfig = serde_json::from_str(r#"{"engine":{"engine":"threaded","workers":2}}"#).unwrap();
        assert_eq!(config.engine, EngineHandle::threaded(Some(2)));
        assert_eq!(config.conf, EngineConf::default());
        assert!(config.defaults.get("h").is_none());
    }
}
