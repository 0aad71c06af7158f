use shardcast_core::CoreError;
use thiserror::Error;

/// Result type of the forecasting component.
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Failure while fitting or predicting one series.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForecastError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient data for {context}: need at least {needed} observations, got {got}")]
    InsufficientData {
        context: String,
        needed: usize,
        got: usize,
    },

    #[error("model `{model}` failed: {reason}")]
    ModelFailed { model: String, reason: String },

    #[error("exogenous mismatch: {0}")]
    ExogenousMismatch(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ForecastError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn insufficient(context: impl Into<String>, needed: usize, got: usize) -> Self {
        Self::InsufficientData {
            context: context.into(),
            needed,
            got,
        }
    }

    pub fn model_failed(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelFailed {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub fn exogenous(msg: impl Into<String>) -> Self {
        Self::ExogenousMismatch(msg.into())
    }
}
