//! Local versus engine-resident tables.

use std::collections::BTreeMap;
use std::sync::Arc;

use shardcast_core::{CoreResult, DatasetId, Frame, KeyValue, Schema};

/// A table handed to or returned by an engine.
#[derive(Debug, Clone)]
pub enum Table {
    /// Fully materialized in this process.
    Local(Frame),
    /// Held by an execution engine as partitions.
    Remote(RemoteFrame),
}

impl Table {
    pub fn schema(&self) -> &Schema {
        match self {
            Table::Local(frame) => frame.schema(),
            Table::Remote(remote) => remote.schema(),
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Table::Remote(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Table::Local(frame) => frame.len(),
            Table::Remote(remote) => remote.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Group rows by `key`, merging a key's rows across remote partitions.
    pub fn partition_by(&self, key: &str) -> CoreResult<BTreeMap<KeyValue, Frame>> {
        match self {
            Table::Local(frame) => frame.partition_by(key),
            Table::Remote(remote) => {
                let mut merged: BTreeMap<KeyValue, Frame> = BTreeMap::new();
                for part in remote.partitions() {
                    for (k, frame) in part.partition_by(key)? {
                        match merged.remove(&k) {
                            Some(existing) => {
                                let joined = Frame::concat(remote.schema().clone(), [existing, frame])?;
                                merged.insert(k, joined);
                            }
                            None => {
                                merged.insert(k, frame);
                            }
                        }
                    }
                }
                Ok(merged)
            }
        }
    }

    /// Materialize locally.
    pub fn collect(self) -> CoreResult<Frame> {
        match self {
            Table::Local(frame) => Ok(frame),
            Table::Remote(remote) => remote.collect(),
        }
    }

    pub fn as_local(&self) -> Option<&Frame> {
        match self {
            Table::Local(frame) => Some(frame),
            Table::Remote(_) => None,
        }
    }

    pub fn as_remote(&self) -> Option<&RemoteFrame> {
        match self {
            Table::Local(_) => None,
            Table::Remote(remote) => Some(remote),
        }
    }
}

impl From<Frame> for Table {
    fn from(frame: Frame) -> Self {
        Table::Local(frame)
    }
}

impl From<RemoteFrame> for Table {
    fn from(remote: RemoteFrame) -> Self {
        Table::Remote(remote)
    }
}

/// Handle to a dataset held by an engine.
///
/// Cloning is cheap: partitions are shared, never copied.
#[derive(Debug, Clone)]
pub struct RemoteFrame {
    dataset: DatasetId,
    engine: String,
    schema: Schema,
    partitions: Arc<[Frame]>,
}

impl RemoteFrame {
    pub fn new(engine: impl Into<String>, schema: Schema, partitions: Vec<Frame>) -> Self {
        Self {
            dataset: DatasetId::new(),
            engine: engine.into(),
            schema,
            partitions: partitions.into(),
        }
    }

    pub fn dataset(&self) -> DatasetId {
        self.dataset
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn partitions(&self) -> &[Frame] {
        &self.partitions
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(Frame::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenate every partition into one local frame.
    pub fn collect(&self) -> CoreResult<Frame> {
        Frame::concat(self.schema.clone(), self.partitions.iter().cloned())
    }
}
