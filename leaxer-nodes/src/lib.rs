//! Built-in utility nodes for Leaxer.
//!
//! ## Data (`data::*`)
//! - [`data::ConstantNode`] - Emits a literal value from node data
//! - [`data::ConcatNode`] - Joins two strings with a separator
//! - [`data::MathNode`] - Float arithmetic (add, subtract, multiply, divide)
//!
//! ## Flow (`flow::*`)
//! - [`flow::DelayNode`] - Sleeps in steps, reporting progress and honouring cancellation
//! - [`flow::PreviewNode`] - Sink that previews and returns its input

#![warn(missing_docs)]

pub mod data;
pub mod flow;

pub use data::{ConcatNode, ConstantNode, MathNode, MathOperation};
pub use flow::{DelayNode, PreviewNode};

use leaxer_core::registry::NodeRegistry;

/// Register every built-in node type.
///
/// Existing registrations with the same type name are replaced.
pub fn register_builtin_nodes(registry: &NodeRegistry) {
    registry.register(ConstantNode);
    registry.register(ConcatNode);
    registry.register(MathNode);
    registry.register(DelayNode);
    registry.register(PreviewNode);
    tracing::debug!(node_types = registry.len(), "Registered built-in nodes");
}

/// A registry holding only the built-in nodes.
pub fn builtin_registry() -> NodeRegistry {
    let registry = NodeRegistry::new();
    register_builtin_nodes(&registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_builtins() {
        let registry = builtin_registry();
        assert_eq!(
            registry.node_types(),
            vec!["Concat", "Constant", "Delay", "Math", "Preview"]
        );
        for node_type in registry.node_types() {
            assert_eq!(registry.info(&node_type).unwrap().node_type, node_type);
        }
    }
}
