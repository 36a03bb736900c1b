//! Graph model for submitted jobs.
//!
//! A graph is what the editor submits: nodes keyed by ID plus an ordered list
//! of edges between named ports.
//!
//! - [`Graph`] - the node map and edge list
//! - [`GraphNode`] - a typed, configurable step
//! - [`Edge`] - a connection from an output handle to an input handle
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "nodes": {
//!     "load":  { "id": "load",  "type": "LoadModel", "data": { "model_path": "sd15.safetensors" } },
//!     "gen":   { "id": "gen",   "type": "Generate",  "data": { "steps": 20 } },
//!     "save":  { "id": "save",  "type": "SaveImage" }
//!   },
//!   "edges": [
//!     { "source": "load", "sourceHandle": "model", "target": "gen",  "targetHandle": "model" },
//!     { "source": "gen",  "sourceHandle": "image", "target": "save", "targetHandle": "image" }
//!   ]
//! }
//! ```

mod edge;
mod node;

pub use edge::Edge;
pub use node::{FRAME_NODE_TYPE, GROUP_NODE_TYPE, GraphNode, is_visual_only};

use crate::error::{LeaxerError, Result};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A submitted compute graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Nodes keyed by node ID.
    #[serde(default)]
    pub nodes: BTreeMap<NodeId, GraphNode>,
    /// Edges in submission order.
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a graph from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add a node, replacing any node with the same ID.
    pub fn add_node(&mut self, node: GraphNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    /// Add an edge.
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Builder-style [`add_node`](Self::add_node).
    pub fn with_node(mut self, node: GraphNode) -> Self {
        self.add_node(node);
        self
    }

    /// Builder-style [`add_edge`](Self::add_edge).
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.add_edge(edge);
        self
    }

    /// Get a node by ID.
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// All node IDs in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Edges starting at `node`.
    pub fn outgoing_edges<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| &edge.source == node)
    }

    /// Number of edges leaving `node`.
    pub fn out_degree(&self, node: &NodeId) -> usize {
        self.outgoing_edges(node).count()
    }

    /// Check referential integrity without looking at node types or cycles.
    ///
    /// Rejects nodes whose map key differs from their `id`, nodes with an
    /// empty type, and edges that reference nodes not in the graph.
    pub fn validate_structure(&self) -> Result<()> {
        for (key, node) in &self.nodes {
            if key != &node.id {
                return Err(LeaxerError::InvalidGraph {
                    cause: format!("node keyed '{}' declares id '{}'", key, node.id),
                });
            }
            if node.node_type.trim().is_empty() {
                return Err(LeaxerError::InvalidGraph {
                    cause: format!("node '{}' has an empty type", node.id),
                });
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !self.nodes.contains_key(endpoint) {
                    return Err(LeaxerError::UnknownNode {
                        from_node: edge.source.clone(),
                        from_handle: edge.source_handle.clone(),
                        to_node: edge.target.clone(),
                        to_handle: edge.target_handle.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Target handles that receive more than one edge.
    ///
    /// Only the last such edge is honoured when inputs are resolved.
    pub fn duplicate_target_handles(&self) -> Vec<(NodeId, String)> {
        let mut counts: HashMap<(&NodeId, &str), usize> = HashMap::new();
        for edge in &self.edges {
            *counts
                .entry((&edge.target, edge.target_handle.as_str()))
                .or_default() += 1;
        }

        let mut duplicates: Vec<(NodeId, String)> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|((node, handle), _)| (node.clone(), handle.to_string()))
            .collect();
        duplicates.sort();
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn linear() -> Graph {
        Graph::new()
            .with_node(GraphNode::new("load", "LoadModel"))
            .with_node(GraphNode::new("gen", "Generate"))
            .with_node(GraphNode::new("save", "SaveImage"))
            .with_edge(Edge::new("load", "model", "gen", "model"))
            .with_edge(Edge::new("gen", "image", "save", "image"))
    }

    #[test]
    fn parses_editor_json() {
        let graph = Graph::from_json(
            r#"{
                "nodes": {
                    "a": { "id": "a", "type": "Constant", "data": { "value": 3 } },
                    "b": { "id": "b", "type": "Preview", "bypassed": true }
                },
                "edges": [
                    { "source": "a", "sourceHandle": "value", "target": "b", "targetHandle": "value" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(graph.len(), 2);
        let a = graph.node(&NodeId::new("a")).unwrap();
        assert_eq!(a.data.get("value"), Some(&json!(3)));
        assert!(graph.node(&NodeId::new("b")).unwrap().bypassed);
        assert_eq!(graph.edges[0].source_handle, "value");
    }

    #[test]
    fn structure_is_valid_for_linear_graph() {
        let graph = linear();
        assert!(graph.validate_structure().is_ok());
        assert_eq!(graph.out_degree(&NodeId::new("load")), 1);
        assert_eq!(graph.out_degree(&NodeId::new("save")), 0);
    }

    #[test]
    fn edge_to_missing_node_is_rejected() {
        let graph = linear().with_edge(Edge::new("save", "image", "ghost", "in"));
        let err = graph.validate_structure().unwrap_err();
        match err {
            LeaxerError::UnknownNode { missing, .. } => assert_eq!(missing, NodeId::new("ghost")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let mut graph = linear();
        graph
            .nodes
            .insert(NodeId::new("alias"), GraphNode::new("other", "Preview"));
        assert!(matches!(
            graph.validate_structure(),
            Err(LeaxerError::InvalidGraph { .. })
        ));
    }

    #[test]
    fn duplicate_target_handles_are_reported() {
        let graph = linear().with_edge(Edge::new("load", "model", "save", "image"));
        assert_eq!(
            graph.duplicate_target_handles(),
            vec![(NodeId::new("save"), "image".to_string())]
        );
    }
}
