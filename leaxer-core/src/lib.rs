//! # Leaxer Core
//!
//! Core types and traits for the Leaxer node-graph execution engine.
//!
//! This crate provides the building blocks shared by the engine, node
//! libraries and front ends:
//!
//! - **Graph**: the submitted node graph and its structural checks
//! - **Node**: the trait node implementations fulfil, with typed ports
//! - **Registry**: lookup of node implementations by type name
//! - **Errors**: one error enum with stable codes
//!
//! ## Example
//!
//! ```ignore
//! use leaxer_core::prelude::*;
//!
//! let graph = Graph::new()
//!     .with_node(GraphNode::new("a", "Constant"))
//!     .with_node(GraphNode::new("b", "Preview"))
//!     .with_edge(Edge::new("a", "value", "b", "value"));
//! graph.validate_structure()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod graph;
pub mod prelude;
pub mod registry;
pub mod settings;
pub mod traits;
pub mod types;

pub use error::{LeaxerError, Result};
pub use graph::{Edge, Graph, GraphNode};
pub use registry::NodeRegistry;
pub use settings::{CachingStrategy, ComputeBackend};
pub use traits::{Node, NodeContext, NodeInfo, Port, PortType, PortValues};
pub use types::{JobId, NodeId};
