//! `shardcast-models`
//!
//! **Responsibility:** the single-machine forecasting component.
//!
//! Everything here works on one local frame at a time and knows nothing about
//! partitions or engines:
//! - model descriptors are plain serializable values, safe to ship to workers;
//! - fitting is sequential, one series after another;
//! - a failing model is replaced by the fallback model when one is configured.

pub mod error;
pub mod forecaster;
pub mod methods;
pub mod model;

pub use error::{ForecastError, ForecastResult};
pub use forecaster::{fit_and_cross_validate, fit_and_forecast, SeriesForecaster};
pub use model::{ForecastModel, ModelKind, ModelSpec, Regressors, SeriesInput};
