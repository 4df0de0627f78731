use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Node names with this prefix are framework internals and are never scored
pub const INTERNAL_NODE_PREFIX: &str = "__";

/// One node's output, as emitted by a graph run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    /// Name of the node that produced the output
    pub node: String,
    /// Raw output payload
    #[serde(default)]
    pub output: Value,
}

impl NodeUpdate {
    /// Create a new NodeUpdate
    pub fn new(node: impl Into<String>, output: Value) -> Self {
        Self {
            node: node.into(),
            output,
        }
    }

    /// Check if this update comes from a framework-internal node
    pub fn is_internal(&self) -> bool {
        self.node.starts_with(INTERNAL_NODE_PREFIX)
    }
}

/// Ordered, pull-based stream of node updates from one graph run
#[async_trait]
pub trait EventStream: Send {
    /// Pull the next update, or None when the run has finished
    async fn next_update(&mut self) -> Result<Option<NodeUpdate>>;
}

/// Trait for executable orchestration graphs (recorded, simulated or real)
#[async_trait]
pub trait Graph: Send + Sync {
    /// Start a run and stream its node updates
    async fn stream(&self, input: &Value) -> Result<Box<dyn EventStream>>;

    /// Run to completion without streaming and return the final output
    async fn invoke(&self, input: &Value) -> Result<Value>;
}
