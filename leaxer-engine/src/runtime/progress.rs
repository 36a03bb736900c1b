//! Progress bookkeeping shared between the runtime and its node tasks.

use crate::events::{EngineEvent, EventBus, NodeProgress, percentage};
use crate::state::ExecutionStateStore;
use leaxer_core::traits::{PortValues, ProgressReporter};
use leaxer_core::types::{JobId, NodeId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Publishes progress events and mirrors them into the execution state.
///
/// Node indices are positions in execution order, fixed up front. The
/// completed count only grows, so graph-level percentage never decreases
/// across completion events. Nothing is reported once a stop was requested,
/// so a force-stopped runtime never writes over the next job's state.
pub(crate) struct ProgressTracker {
    job_id: JobId,
    total: usize,
    indices: HashMap<NodeId, usize>,
    completed: AtomicUsize,
    events: EventBus,
    state: Arc<ExecutionStateStore>,
    cancel: CancellationToken,
}

impl ProgressTracker {
    pub(crate) fn new(
        job_id: JobId,
        order: &[NodeId],
        events: EventBus,
        state: Arc<ExecutionStateStore>,
        cancel: CancellationToken,
    ) -> Self {
        let indices = order
            .iter()
            .enumerate()
            .map(|(index, id)| (id.clone(), index))
            .collect();
        Self {
            job_id,
            total: order.len(),
            indices,
            completed: AtomicUsize::new(0),
            events,
            state,
            cancel,
        }
    }

    fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn index_of(&self, node_id: &NodeId) -> usize {
        self.indices.get(node_id).copied().unwrap_or_default()
    }

    fn graph_percentage(&self) -> f64 {
        percentage(self.completed.load(Ordering::Acquire), self.total)
    }

    fn publish(&self, node_id: &NodeId, node_progress: NodeProgress, graph_percentage: f64) {
        if self.is_stopped() {
            return;
        }
        self.events.publish(EngineEvent::ExecutionProgress {
            job_id: self.job_id,
            node_id: node_id.clone(),
            current_index: self.index_of(node_id),
            total_nodes: self.total,
            percentage: graph_percentage,
            node_progress,
        });
    }

    pub(crate) fn node_started(&self, node_id: &NodeId) {
        if self.is_stopped() {
            return;
        }
        self.state
            .set_current_node(node_id, self.index_of(node_id), self.total);
        self.publish(node_id, NodeProgress::started(), self.graph_percentage());
    }

    pub(crate) fn node_completed(&self, node_id: &NodeId) {
        let done = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        self.publish(
            node_id,
            NodeProgress::completed(),
            percentage(done, self.total),
        );
    }

    pub(crate) fn node_output(&self, node_id: &NodeId, output: PortValues) {
        if self.is_stopped() {
            return;
        }
        self.events.publish(EngineEvent::NodeOutput {
            job_id: self.job_id,
            node_id: node_id.clone(),
            output,
        });
    }
}

impl ProgressReporter for ProgressTracker {
    fn step(&self, node_id: &NodeId, current: u32, total: u32) {
        if self.is_stopped() {
            return;
        }
        let progress = NodeProgress::step(current, total);
        self.state
            .set_step_progress(node_id, current, total, progress.percentage);
        self.publish(node_id, progress, self.graph_percentage());
    }

    fn preview(&self, node_id: &NodeId, value: Value) {
        self.node_output(node_id, PortValues::from([("preview".to_string(), value)]));
    }
}
