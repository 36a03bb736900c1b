//! Flow graph index and layered sort.

use leaxer_core::error::{LeaxerError, Result};
use leaxer_core::graph::{Edge, Graph, GraphNode};
use leaxer_core::registry::NodeRegistry;
use leaxer_core::traits::NodeInfo;
use leaxer_core::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Read-only edge index over a [`Graph`].
#[derive(Debug)]
pub struct FlowGraph<'g> {
    graph: &'g Graph,
    /// Edges indexed by source node.
    outgoing: HashMap<&'g NodeId, Vec<usize>>,
    /// Edges indexed by target node.
    incoming: HashMap<&'g NodeId, Vec<usize>>,
}

impl<'g> FlowGraph<'g> {
    /// Index a graph's edges.
    pub fn new(graph: &'g Graph) -> Self {
        let mut outgoing: HashMap<&NodeId, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<&NodeId, Vec<usize>> = HashMap::new();
        for id in graph.nodes.keys() {
            outgoing.entry(id).or_default();
            incoming.entry(id).or_default();
        }
        for (idx, edge) in graph.edges.iter().enumerate() {
            outgoing.entry(&edge.source).or_default().push(idx);
            incoming.entry(&edge.target).or_default().push(idx);
        }

        Self {
            graph,
            outgoing,
            incoming,
        }
    }

    /// The indexed graph.
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Get a node by ID.
    pub fn get_node(&self, id: &NodeId) -> Option<&'g GraphNode> {
        self.graph.nodes.get(id)
    }

    /// Get outgoing edges from a node.
    pub fn outgoing_edges(&self, node: &NodeId) -> impl Iterator<Item = &'g Edge> + '_ {
        let edges = &self.graph.edges;
        self.outgoing
            .get(node)
            .into_iter()
            .flat_map(move |indices| indices.iter().map(move |&i| &edges[i]))
    }

    /// Get incoming edges to a node.
    pub fn incoming_edges(&self, node: &NodeId) -> impl Iterator<Item = &'g Edge> + '_ {
        let edges = &self.graph.edges;
        self.incoming
            .get(node)
            .into_iter()
            .flat_map(move |indices| indices.iter().map(move |&i| &edges[i]))
    }

    /// Find predecessors of a node.
    pub fn predecessors(&self, node: &NodeId) -> Vec<&'g NodeId> {
        self.incoming_edges(node).map(|edge| &edge.source).collect()
    }

    /// Find successors of a node.
    pub fn successors(&self, node: &NodeId) -> Vec<&'g NodeId> {
        self.outgoing_edges(node).map(|edge| &edge.target).collect()
    }

    /// Group nodes into layers using Kahn's algorithm.
    ///
    /// Each layer holds every node whose predecessors all sit in earlier
    /// layers, sorted by ID. Nodes left over when no zero in-degree node
    /// remains form a cycle and are reported sorted by ID.
    pub fn layers(&self) -> Result<Layers> {
        let mut in_degree: BTreeMap<&NodeId, usize> =
            self.graph.nodes.keys().map(|id| (id, 0)).collect();
        for edge in &self.graph.edges {
            if let Some(degree) = in_degree.get_mut(&edge.target) {
                *degree += 1;
            }
        }

        let mut layers: Vec<Vec<NodeId>> = Vec::new();
        let mut frontier: Vec<&NodeId> = in_degree
            .iter()
            .filter(|&(_, degree)| *degree == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut placed = 0;

        while !frontier.is_empty() {
            frontier.sort();
            let mut next = Vec::new();
            for &node_id in &frontier {
                in_degree.remove(node_id);
                for edge in self.outgoing_edges(node_id) {
                    if let Some(degree) = in_degree.get_mut(&edge.target) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(&edge.target);
                        }
                    }
                }
            }
            placed += frontier.len();
            layers.push(frontier.into_iter().cloned().collect());
            frontier = next;
        }

        if placed != self.graph.nodes.len() {
            // BTreeMap keys are already in ID order.
            let nodes: Vec<NodeId> = in_degree.into_keys().cloned().collect();
            return Err(LeaxerError::CycleDetected { nodes });
        }

        Ok(Layers { layers })
    }

    /// Check node types, handles and port types against the registry.
    pub fn validate_contracts(&self, registry: &NodeRegistry) -> Result<()> {
        let mut infos: HashMap<&NodeId, NodeInfo> = HashMap::new();
        for node in self.graph.nodes.values() {
            if node.is_visual_only() {
                continue;
            }
            let info = registry
                .info(&node.node_type)
                .ok_or_else(|| LeaxerError::UnknownNodeType {
                    node_id: node.id.clone(),
                    node_type: node.node_type.clone(),
                })?;
            infos.insert(&node.id, info);
        }

        for edge in &self.graph.edges {
            // Visual-only nodes declare no ports; any handle on them is invalid.
            let from = infos
                .get(&edge.source)
                .and_then(|info| info.get_output(&edge.source_handle))
                .ok_or_else(|| LeaxerError::InvalidHandle {
                    node_id: edge.source.clone(),
                    handle: edge.source_handle.clone(),
                })?;
            let to = infos
                .get(&edge.target)
                .and_then(|info| info.get_input(&edge.target_handle))
                .ok_or_else(|| LeaxerError::InvalidHandle {
                    node_id: edge.target.clone(),
                    handle: edge.target_handle.clone(),
                })?;

            if !from.port_type.is_compatible_with(to.port_type) {
                return Err(LeaxerError::PortTypeMismatch {
                    from_node: edge.source.clone(),
                    from_handle: edge.source_handle.clone(),
                    from_type: from.port_type.to_string(),
                    to_node: edge.target.clone(),
                    to_handle: edge.target_handle.clone(),
                    to_type: to.port_type.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Validate a graph and group it into execution layers.
///
/// Runs, in order: the structural check, node-type and handle resolution
/// against `registry`, port type compatibility, and the layered sort.
/// Duplicate target handles are logged and tolerated; the last edge wins.
pub fn sort_and_validate(graph: &Graph, registry: &NodeRegistry) -> Result<Layers> {
    graph.validate_structure()?;

    for (node_id, handle) in graph.duplicate_target_handles() {
        tracing::warn!(
            node_id = %node_id,
            handle = %handle,
            "Input receives more than one edge; the last edge wins"
        );
    }

    let flow = FlowGraph::new(graph);
    flow.validate_contracts(registry)?;
    flow.layers()
}

/// Ordered execution layers.
///
/// For every edge `a -> b`, `a` sits in an earlier layer than `b`; members
/// of one layer share no edges and may run concurrently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layers {
    layers: Vec<Vec<NodeId>>,
}

impl Layers {
    /// Iterate layers in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &[NodeId]> {
        self.layers.iter().map(Vec::as_slice)
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether there are no layers (empty graph).
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Total number of nodes across all layers.
    pub fn node_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// Index of the layer containing `node`.
    pub fn layer_of(&self, node: &NodeId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.contains(node))
    }

    /// All nodes in execution order.
    pub fn flatten(&self) -> Vec<NodeId> {
        self.layers.iter().flatten().cloned().collect()
    }
}

impl From<Vec<Vec<NodeId>>> for Layers {
    fn from(layers: Vec<Vec<NodeId>>) -> Self {
        Self { layers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaxer_core::traits::{
        Node, NodeConfig, NodeContext, NodeFuture, Port, PortType, PortValues,
    };

    struct Stub(NodeInfo);

    impl Node for Stub {
        fn info(&self) -> NodeInfo {
            self.0.clone()
        }

        fn process<'a>(
            &'a self,
            _ctx: NodeContext,
            inputs: PortValues,
            _config: NodeConfig,
        ) -> NodeFuture<'a> {
            Box::pin(async move { Ok(inputs) })
        }
    }

    fn registry() -> NodeRegistry {
        let registry = NodeRegistry::new();
        registry.register(Stub(
            NodeInfo::new("Pass")
                .with_inputs(vec![
                    Port::input("in", PortType::Any).optional(),
                    Port::input("b", PortType::Any).optional(),
                ])
                .with_outputs(vec![Port::output("out", PortType::Any)]),
        ));
        registry.register(Stub(
            NodeInfo::new("LoadModel").with_outputs(vec![Port::output("model", PortType::Model)]),
        ));
        registry.register(Stub(
            NodeInfo::new("SaveImage").with_inputs(vec![Port::input("image", PortType::Image)]),
        ));
        registry
    }

    fn pass(id: &str) -> GraphNode {
        GraphNode::new(id, "Pass")
    }

    fn id(s: &str) -> NodeId {
        NodeId::new(s)
    }

    #[test]
    fn linear_graph_layers() {
        let graph = Graph::new()
            .with_node(pass("a"))
            .with_node(pass("b"))
            .with_node(pass("c"))
            .with_edge(Edge::new("a", "out", "b", "in"))
            .with_edge(Edge::new("b", "out", "c", "in"));

        let layers = sort_and_validate(&graph, &registry()).unwrap();
        assert_eq!(layers.len(), 3);
        assert_eq!(layers.flatten(), vec![id("a"), id("b"), id("c")]);
    }

    #[test]
    fn diamond_graph_layers() {
        let graph = Graph::new()
            .with_node(pass("src"))
            .with_node(pass("left"))
            .with_node(pass("right"))
            .with_node(pass("sink"))
            .with_edge(Edge::new("src", "out", "right", "in"))
            .with_edge(Edge::new("src", "out", "left", "in"))
            .with_edge(Edge::new("left", "out", "sink", "in"))
            .with_edge(Edge::new("right", "out", "sink", "b"));

        let layers = sort_and_validate(&graph, &registry()).unwrap();
        let collected: Vec<Vec<NodeId>> = layers.iter().map(<[NodeId]>::to_vec).collect();
        assert_eq!(
            collected,
            vec![vec![id("src")], vec![id("left"), id("right")], vec![id("sink")]]
        );
        assert_eq!(layers.layer_of(&id("sink")), Some(2));
        assert_eq!(layers.node_count(), 4);
    }

    #[test]
    fn disconnected_nodes_share_first_layer() {
        let graph = Graph::new()
            .with_node(pass("z"))
            .with_node(pass("a"))
            .with_node(GraphNode::new("frame", "Frame"));

        let layers = sort_and_validate(&graph, &registry()).unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers.flatten(), vec![id("a"), id("frame"), id("z")]);
    }

    #[test]
    fn cycle_names_remaining_nodes() {
        let graph = Graph::new()
            .with_node(pass("entry"))
            .with_node(pass("x"))
            .with_node(pass("y"))
            .with_node(pass("after"))
            .with_edge(Edge::new("entry", "out", "x", "in"))
            .with_edge(Edge::new("x", "out", "y", "in"))
            .with_edge(Edge::new("y", "out", "x", "b"))
            .with_edge(Edge::new("y", "out", "after", "in"));

        match sort_and_validate(&graph, &registry()) {
            Err(LeaxerError::CycleDetected { nodes }) => {
                assert_eq!(nodes, vec![id("after"), id("x"), id("y")]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let graph = Graph::new()
            .with_node(pass("a"))
            .with_edge(Edge::new("a", "out", "a", "in"));
        assert!(matches!(
            sort_and_validate(&graph, &registry()),
            Err(LeaxerError::CycleDetected { .. })
        ));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let graph = Graph::new().with_node(GraphNode::new("u", "Upscale"));
        let err = sort_and_validate(&graph, &registry()).unwrap_err();
        assert_eq!(err.code(), "E402");
        assert_eq!(err.node_id(), Some(&id("u")));
    }

    #[test]
    fn unknown_handle_is_rejected() {
        let graph = Graph::new()
            .with_node(pass("a"))
            .with_node(pass("b"))
            .with_edge(Edge::new("a", "missing", "b", "in"));
        match sort_and_validate(&graph, &registry()) {
            Err(LeaxerError::InvalidHandle { node_id, handle }) => {
                assert_eq!(node_id, id("a"));
                assert_eq!(handle, "missing");
            }
            other => panic!("expected invalid handle, got {other:?}"),
        }
    }

    #[test]
    fn incompatible_port_types_are_rejected() {
        let graph = Graph::new()
            .with_node(GraphNode::new("load", "LoadModel"))
            .with_node(GraphNode::new("save", "SaveImage"))
            .with_edge(Edge::new("load", "model", "save", "image"));
        let err = sort_and_validate(&graph, &registry()).unwrap_err();
        assert_eq!(err.code(), "E406");
        assert!(err.is_validation_error());
    }

    #[test]
    fn any_port_connects_to_typed_port() {
        let graph = Graph::new()
            .with_node(GraphNode::new("load", "LoadModel"))
            .with_node(pass("p"))
            .with_edge(Edge::new("load", "model", "p", "in"));
        assert!(sort_and_validate(&graph, &registry()).is_ok());
    }

    #[test]
    fn flow_graph_neighbours() {
        let graph = Graph::new()
            .with_node(pass("a"))
            .with_node(pass("b"))
            .with_node(pass("c"))
            .with_edge(Edge::new("a", "out", "b", "in"))
            .with_edge(Edge::new("a", "out", "c", "in"));
        let flow = FlowGraph::new(&graph);
        assert_eq!(flow.successors(&id("a")), vec![&id("b"), &id("c")]);
        assert_eq!(flow.predecessors(&id("c")), vec![&id("a")]);
        assert!(flow.predecessors(&id("a")).is_empty());
    }
}
