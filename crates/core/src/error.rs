//! Core error model.

use thiserror::Error;

/// Result type used across the table primitives.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while building, validating or reshaping tables.
///
/// These are deterministic input failures; nothing here is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A value or argument failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A schema was malformed (bad type name, duplicate column, ...).
    #[error("invalid schema: {0}")]
    Schema(String),

    /// A column referenced by name does not exist.
    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    /// A value did not match the declared column type.
    #[error("type mismatch in column `{column}`: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    /// A value cannot be used as a partition key.
    #[error("invalid partition key in column `{column}`: {reason}")]
    InvalidPartitionKey { column: String, reason: String },

    /// A frequency alias could not be parsed or applied.
    #[error("invalid frequency: {0}")]
    InvalidFrequency(String),

    /// A per-call forecast argument was missing or malformed.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: String, reason: String },
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn unknown_column(name: impl Into<String>) -> Self {
        Self::UnknownColumn(name.into())
    }

    pub fn invalid_frequency(msg: impl Into<String>) -> Self {
        Self::InvalidFrequency(msg.into())
    }

    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
