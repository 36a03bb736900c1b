//! Edge definition as submitted by the editor.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// A directed connection from an output handle to an input handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Source node ID.
    pub source: NodeId,
    /// Output port on the source node.
    #[serde(rename = "sourceHandle")]
    pub source_handle: String,
    /// Target node ID.
    pub target: NodeId,
    /// Input port on the target node.
    #[serde(rename = "targetHandle")]
    pub target_handle: String,
}

impl Edge {
    /// Create a new edge.
    pub fn new(
        source: impl Into<NodeId>,
        source_handle: impl Into<String>,
        target: impl Into<NodeId>,
        target_handle: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            source_handle: source_handle.into(),
            target: target.into(),
            target_handle: target_handle.into(),
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source, self.source_handle, self.target, self.target_handle
        )
    }
}
