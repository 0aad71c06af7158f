//! `shardcast-core`: table primitives shared by every layer.
//!
//! This crate has no notion of models or engines: it only knows how to hold,
//! validate, partition and reshape tables of time-series rows.

pub mod args;
pub mod error;
pub mod frame;
pub mod freq;
pub mod id;
pub mod schema;
pub mod value;

pub use args::{CvWindows, ForecastArgs};
pub use error::{CoreError, CoreResult};
pub use frame::{Frame, Row};
pub use freq::{Freq, FreqUnit};
pub use id::{DatasetId, JobId};
pub use schema::{Field, Schema, SchemaSpec, CUTOFF_COL, ID_COL, TARGET_COL, TIME_COL};
pub use value::{DType, KeyValue, Value};
