//! Convenient re-exports for node authors.
//!
//! ```ignore
//! use leaxer_core::prelude::*;
//! ```

pub use crate::error::{LeaxerError, Result};
pub use crate::graph::{Edge, Graph, GraphNode};
pub use crate::registry::NodeRegistry;
pub use crate::settings::{CachingStrategy, ComputeBackend};
pub use crate::traits::{
    Node, NodeConfig, NodeContext, NodeFuture, NodeInfo, Port, PortDirection, PortType,
    PortValues, ProgressReporter,
};
pub use crate::types::{JobId, NodeId};

pub use serde_json::{Value, json};
