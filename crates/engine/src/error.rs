//! Engine error model.

use shardcast_core::CoreError;
use thiserror::Error;

/// Error returned by a partition worker.
///
/// Kept as a boxed trait object so the original error reaches the caller
/// untouched and can be downcast there.
pub type WorkerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type used across engines.
pub type EngineResult<T> = Result<T, EngineError>;

/// Job-level failure.
///
/// A job either returns every partition or fails as a whole; there is no
/// partial result.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A worker returned an error for one partition.
    #[error("partition `{partition}` failed: {source}")]
    Worker {
        partition: String,
        #[source]
        source: WorkerError,
    },

    /// A worker returned a frame that does not fit the declared schema.
    #[error("partition `{partition}` output does not match the declared schema: {source}")]
    SchemaMismatch {
        partition: String,
        #[source]
        source: CoreError,
    },

    /// Job parameters could not be serialized for shipping to workers.
    #[error("cannot broadcast job parameters: {0}")]
    Broadcast(String),

    /// The worker pool could not be started.
    #[error("cannot start worker pool: {0}")]
    Startup(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EngineError {
    /// The partition that failed, if the failure is partition-scoped.
    pub fn partition(&self) -> Option<&str> {
        match self {
            EngineError::Worker { partition, .. } | EngineError::SchemaMismatch { partition, .. } => {
                Some(partition)
            }
            _ => None,
        }
    }
}
