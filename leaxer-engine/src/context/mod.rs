//! Per-job store of node outputs with reference-counted eviction.
//!
//! Consumer counts are fixed from edge fan-out when the context is created.
//! A node with no outgoing edges is *final*: its output is kept until the
//! runtime collects it with [`ExecutionContext::take_final_outputs`].

use leaxer_core::graph::Edge;
use leaxer_core::traits::PortValues;
use leaxer_core::types::{JobId, NodeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Output store for one job.
///
/// Owned by the runtime task; node tasks only ever see `Arc` clones of
/// individual outputs.
#[derive(Debug)]
pub struct ExecutionContext {
    job_id: JobId,
    outputs: HashMap<NodeId, Arc<PortValues>>,
    consumers: HashMap<NodeId, usize>,
    /// Sources with at least one outgoing edge, fixed at creation.
    has_consumers: HashSet<NodeId>,
}

impl ExecutionContext {
    /// Create a context, counting consumers per source from `edges`.
    pub fn new(job_id: JobId, edges: &[Edge]) -> Self {
        let mut consumers: HashMap<NodeId, usize> = HashMap::new();
        for edge in edges {
            *consumers.entry(edge.source.clone()).or_default() += 1;
        }
        let has_consumers = consumers.keys().cloned().collect();

        Self {
            job_id,
            outputs: HashMap::new(),
            consumers,
            has_consumers,
        }
    }

    /// The job this context belongs to.
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Store a node's output. Called once per node after it completes.
    pub fn put_output(&mut self, node_id: NodeId, output: PortValues) {
        self.outputs.insert(node_id, Arc::new(output));
    }

    /// Read a node's output, if still held.
    pub fn get_output(&self, node_id: &NodeId) -> Option<Arc<PortValues>> {
        self.outputs.get(node_id).cloned()
    }

    /// Record that one edge out of `source` has been read.
    ///
    /// Evicts the stored output when the last consumer has read it.
    /// Consuming a final node, or consuming past zero, is ignored.
    pub fn consume_input(&mut self, source: &NodeId) {
        let Some(remaining) = self.consumers.get_mut(source) else {
            return;
        };
        if *remaining == 0 {
            return;
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.outputs.remove(source);
            tracing::trace!(job_id = %self.job_id, node_id = %source, "Evicted output");
        }
    }

    /// Consumers of `node` that have not yet read its output.
    pub fn consumer_count(&self, node_id: &NodeId) -> usize {
        self.consumers.get(node_id).copied().unwrap_or(0)
    }

    /// Whether `node` had no outgoing edges when the job started.
    pub fn is_final(&self, node_id: &NodeId) -> bool {
        !self.has_consumers.contains(node_id)
    }

    /// Number of outputs currently held.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Whether no outputs are held.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Remove and return the outputs of every final node, keyed by node ID.
    pub fn take_final_outputs(&mut self) -> BTreeMap<NodeId, PortValues> {
        let finals: Vec<NodeId> = self
            .outputs
            .keys()
            .filter(|id| !self.has_consumers.contains(*id))
            .cloned()
            .collect();

        finals
            .into_iter()
            .filter_map(|id| {
                let output = self.outputs.remove(&id)?;
                let output = Arc::try_unwrap(output).unwrap_or_else(|shared| (*shared).clone());
                Some((id, output))
            })
            .collect()
    }
}
