//! Job parameters shipped to every partition.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{EngineError, EngineResult};

/// Read-only parameters serialized once per job.
///
/// Every partition decodes its own copy, so parameters cross the worker
/// boundary exactly as they would cross a process boundary: anything that does
/// not survive serialization fails the job up front instead of on a worker.
#[derive(Debug, Clone)]
pub struct Broadcast {
    payload: Arc<[u8]>,
}

impl Broadcast {
    pub fn encode<P: Serialize>(params: &P) -> EngineResult<Self> {
        let bytes = serde_json::to_vec(params).map_err(|e| EngineError::Broadcast(e.to_string()))?;
        Ok(Self {
            payload: bytes.into(),
        })
    }

    /// Decode a fresh, worker-local copy of the parameters.
    pub fn decode<P: DeserializeOwned>(&self) -> Result<P, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
