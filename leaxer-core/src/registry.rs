//! Registry of node implementations keyed by type name.

use crate::traits::{Node, NodeInfo};
use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe map from node type name to implementation.
///
/// Populated at startup and then only read; cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: Arc<DashMap<String, Arc<dyn Node>>>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under the type name from its `info()`.
    ///
    /// Returns the previous implementation if the type was already registered.
    pub fn register(&self, node: impl Node + 'static) -> Option<Arc<dyn Node>> {
        self.register_arc(Arc::new(node))
    }

    /// Register an already shared implementation.
    pub fn register_arc(&self, node: Arc<dyn Node>) -> Option<Arc<dyn Node>> {
        let node_type = node.info().node_type;
        tracing::debug!(node_type = %node_type, "Registered node type");
        self.nodes.insert(node_type, node)
    }

    /// Look up an implementation.
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn Node>> {
        self.nodes.get(node_type).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether a type is registered.
    pub fn contains(&self, node_type: &str) -> bool {
        self.nodes.contains_key(node_type)
    }

    /// Port contract of a registered type.
    pub fn info(&self, node_type: &str) -> Option<NodeInfo> {
        self.nodes.get(node_type).map(|entry| entry.value().info())
    }

    /// All registered type names, sorted.
    pub fn node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.nodes.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Call `shutdown` on every registered node.
    pub fn shutdown_all(&self) {
        for entry in self.nodes.iter() {
            entry.value().shutdown();
        }
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("node_types", &self.node_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{NodeConfig, NodeContext, NodeFuture, PortValues};

    struct Named(&'static str);

    impl Node for Named {
        fn info(&self) -> NodeInfo {
            NodeInfo::new(self.0)
        }

        fn process<'a>(
            &'a self,
            _ctx: NodeContext,
            _inputs: PortValues,
            _config: NodeConfig,
        ) -> NodeFuture<'a> {
            Box::pin(async { Ok(PortValues::new()) })
        }
    }

    #[test]
    fn register_and_lookup() {
        let registry = NodeRegistry::new();
        assert!(registry.register(Named("Sampler")).is_none());
        registry.register(Named("LoadModel"));

        assert!(registry.contains("Sampler"));
        assert!(!registry.contains("Upscale"));
        assert_eq!(registry.node_types(), vec!["LoadModel", "Sampler"]);
        assert_eq!(registry.info("Sampler").unwrap().node_type, "Sampler");
    }

    #[test]
    fn re_registering_replaces() {
        let registry = NodeRegistry::new();
        registry.register(Named("Sampler"));
        assert!(registry.register(Named("Sampler")).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clones_share_entries() {
        let registry = NodeRegistry::new();
        let clone = registry.clone();
        registry.register(Named("Sampler"));
        assert!(clone.get("Sampler").is_some());
    }
}
