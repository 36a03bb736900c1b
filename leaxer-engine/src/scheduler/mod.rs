//! Graph validation and layered topological sorting.
//!
//! - [`FlowGraph`] - edge index over a submitted [`Graph`](leaxer_core::Graph)
//! - [`sort_and_validate`] - full validation plus Kahn layering
//! - [`Layers`] - the resulting execution plan

mod graph;

pub use graph::{FlowGraph, Layers, sort_and_validate};
