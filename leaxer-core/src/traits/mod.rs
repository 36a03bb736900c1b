//! Core traits for Leaxer nodes.
//!
//! - `Node`: the contract every registered node type implements
//! - `NodeContext`: per-invocation identifiers, cancellation and progress
//! - `ProgressReporter`: sink for intra-node progress and previews

mod context;
mod node;

pub use context::{NodeContext, NoopReporter, ProgressReporter};
pub use node::{
    Node, NodeConfig, NodeFuture, NodeInfo, Port, PortDirection, PortType, PortValues,
};
