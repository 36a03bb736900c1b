//! Node definition as submitted by the editor.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Visual grouping box in the editor; never executed.
pub const GROUP_NODE_TYPE: &str = "Group";

/// Visual frame in the editor; never executed.
pub const FRAME_NODE_TYPE: &str = "Frame";

/// Whether a node type is purely visual and skipped during execution.
pub fn is_visual_only(node_type: &str) -> bool {
    node_type == GROUP_NODE_TYPE || node_type == FRAME_NODE_TYPE
}

/// A node in a submitted graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Node ID, equal to its key in the graph's node map.
    pub id: NodeId,

    /// Registered node type (e.g., "LoadModel", "Generate", "SaveImage").
    #[serde(rename = "type")]
    pub node_type: String,

    /// Static node configuration (widget values, file paths, ...).
    #[serde(default)]
    pub data: Map<String, Value>,

    /// When set, the node is not executed and forwards its inputs instead.
    #[serde(default)]
    pub bypassed: bool,
}

impl GraphNode {
    /// Create a node with empty data.
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data: Map::new(),
            bypassed: false,
        }
    }

    /// Set a data field.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Mark the node as bypassed.
    pub fn bypassed(mut self) -> Self {
        self.bypassed = true;
        self
    }

    /// Whether this node is a visual-only Group/Frame.
    pub fn is_visual_only(&self) -> bool {
        is_visual_only(&self.node_type)
    }

    /// Get a string data field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}
