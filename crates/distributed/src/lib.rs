//! `shardcast-distributed`
//!
//! **Responsibility:** run per-series forecasting and cross-validation over a
//! partitioned table.
//!
//! - Schema resolution (`schema`): output columns from the model list and mode.
//! - Co-partitioned execution (`cotransform`): history and future regressors of
//!   one series delivered to one worker.
//! - Dispatch (`backend`): one engine job per call, stateless between calls.
//!
//! The forecasting itself is `shardcast-models`; scheduling is
//! `shardcast-engine`.

pub mod backend;
pub mod config;
pub mod cotransform;
pub mod error;
pub mod schema;
pub mod workers;

pub use backend::{EngineBackend, ParallelBackend};
pub use config::BackendConfig;
pub use cotransform::co_transform;
pub use error::{DistributedError, DistributedResult, ErrorKind};
pub use schema::{cross_validation_spec, forecast_spec, pinned_forecast_spec, resolve_schema, Mode};
pub use workers::{cross_validate_partition, forecast_partition, forecast_partition_with_exog, JobParams};
