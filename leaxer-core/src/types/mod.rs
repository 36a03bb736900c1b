//! Core identifier types for Leaxer.
//!
//! - `JobId`: Unique identifier for a queued job (one graph execution)
//! - `NodeId`: Identifier for a node within a graph

mod ids;

pub use ids::{JobId, NodeId};
