//! Dispatch error model.
//!
//! Errors are grouped into three kinds for callers:
//! - configuration: bad model lists, bad arguments, horizon mismatches
//! - forecasting: a series could not be forecast
//! - engine: scheduling, serialization or contract failures of the engine

use std::error::Error as StdError;

use shardcast_core::CoreError;
use shardcast_engine::EngineError;
use shardcast_models::ForecastError;
use thiserror::Error;

pub type DistributedResult<T> = Result<T, DistributedError>;

#[derive(Debug, Error)]
pub enum DistributedError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Future regressors for a series do not cover exactly the horizon.
    #[error("horizon mismatch for series `{entity}`: X_df has {rows} rows but h={h}")]
    HorizonMismatch { entity: String, rows: usize, h: usize },

    /// Job parameters could not be decoded on a worker.
    #[error("cannot decode job parameters: {0}")]
    Params(#[from] serde_json::Error),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Coarse classification of a [`DistributedError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Forecasting,
    Engine,
}

impl DistributedError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        DistributedError::Configuration(msg.into())
    }

    /// Classify the error, looking through engine wrappers at the worker's own error.
    ///
    /// A bare [`CoreError`] is always `Configuration`, whether raised here or by
    /// a worker: it reports input that does not fit the table model. `Forecasting`
    /// is reserved for [`ForecastError`], including the core errors a forecaster
    /// wraps while fitting a series.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DistributedError::Configuration(_)
            | DistributedError::HorizonMismatch { .. }
            | DistributedError::Core(_) => ErrorKind::Configuration,
            DistributedError::Forecast(_) => ErrorKind::Forecasting,
            DistributedError::Params(_) => ErrorKind::Engine,
            DistributedError::Engine(err) => engine_kind(err),
        }
    }
}

fn engine_kind(err: &EngineError) -> ErrorKind {
    match err {
        EngineError::Worker { source, .. } => worker_kind(source.as_ref()),
        EngineError::Core(_) => ErrorKind::Configuration,
        EngineError::SchemaMismatch { .. } | EngineError::Broadcast(_) | EngineError::Startup(_) => {
            ErrorKind::Engine
        }
    }
}

fn worker_kind(source: &(dyn StdError + Send + Sync + 'static)) -> ErrorKind {
    let mut current = Some(source as &(dyn StdError + 'static));
    while let Some(err) = current {
        if let Some(dist) = err.downcast_ref::<DistributedError>() {
            return dist.kind();
        }
        if err.is::<ForecastError>() {
            return ErrorKind::Forecasting;
        }
        if err.is::<CoreError>() {
            return ErrorKind::Configuration;
        }
        if let Some(engine) = err.downcast_ref::<EngineError>() {
            return engine_kind(engine);
        }
        current = err.source();
    }
    ErrorKind::Engine
}

/// Surface errors a worker raised about the caller's configuration as they are.
///
/// Everything else stays wrapped in the engine error so the failing partition
/// is still reported.
pub(crate) fn surface(err: EngineError) -> DistributedError {
    match err {
        EngineError::Worker { partition, source } => match source.downcast::<DistributedError>() {
            Ok(dist) if dist.kind() == ErrorKind::Configuration => *dist,
            Ok(dist) => EngineError::Worker {
                partition,
                source: dist,
            }
            .into(),
            Err(source) => EngineError::Worker { partition, source }.into(),
        },
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_failures_are_classified_by_their_source() {
        let forecast = EngineError::Worker {
            partition: "a".into(),
            source: Box::new(DistributedError::from(ForecastError::invalid_input("bad"))),
        };
        assert_eq!(DistributedError::from(forecast).kind(), ErrorKind::Forecasting);

        let opaque = EngineError::Worker {
            partition: "a".into(),
            source: "lost connection".into(),
        };
        assert_eq!(DistributedError::from(opaque).kind(), ErrorKind::Engine);

        let mismatch = EngineError::SchemaMismatch {
            partition: "a".into(),
            source: CoreError::unknown_column("Naive"),
        };
        assert_eq!(DistributedError::from(mismatch).kind(), ErrorKind::Engine);
    }

    #[test]
    fn core_errors_classify_the_same_at_any_depth() {
        let direct = DistributedError::from(CoreError::unknown_column("ds"));
        let on_worker = DistributedError::from(EngineError::Worker {
            partition: "a".into(),
            source: Box::new(CoreError::unknown_column("ds")),
        });
        let nested = DistributedError::from(EngineError::Worker {
            partition: "a".into(),
            source: Box::new(DistributedError::from(CoreError::unknown_column("ds"))),
        });
        for err in [direct, on_worker, nested] {
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }

        let wrapped = DistributedError::from(EngineError::Worker {
            partition: "a".into(),
            source: Box::new(ForecastError::from(CoreError::unknown_column("ds"))),
        });
        assert_eq!(wrapped.kind(), ErrorKind::Forecasting);
    }

    #[test]
    fn configuration_errors_raised_on_workers_are_unwrapped() {
        let err = surface(EngineError::Worker {
            partition: "a".into(),
            source: Box::new(DistributedError::HorizonMismatch {
                entity: "a".into(),
                rows: 3,
                h: 4,
            }),
        });
        assert!(matches!(err, DistributedError::HorizonMismatch { rows: 3, h: 4, .. }));

        let err = surface(EngineError::Worker {
            partition: "b".into(),
            source: Box::new(DistributedError::from(ForecastError::invalid_input("bad"))),
        });
        match err {
            DistributedError::Engine(engine) => assert_eq!(engine.partition(), Some("b")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
