//! Recoverable snapshot of the job currently executing.
//!
//! A reconnecting client reads this to render progress immediately instead
//! of waiting for the next event. It is cleared whenever a job ends, however
//! it ends; a stale snapshot would be trusted as ground truth.

use leaxer_core::types::{JobId, NodeId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Step progress inside the current node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepProgress {
    /// Node reporting the steps.
    pub node_id: NodeId,
    /// Steps done.
    pub current_step: u32,
    /// Total steps.
    pub total_steps: u32,
    /// `current_step / total_steps` as a percentage.
    pub percentage: f64,
}

/// What is running right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    /// The executing job.
    pub job_id: JobId,
    /// Always true while a snapshot exists.
    pub is_executing: bool,
    /// Every node of the job in execution order.
    pub node_ids: Vec<NodeId>,
    /// `node_ids.len()`.
    pub total_nodes: usize,
    /// Most recently started node.
    pub current_node: Option<NodeId>,
    /// Zero-based index of the most recently started node.
    pub current_index: usize,
    /// Step progress of the most recently reporting node.
    pub step_progress: Option<StepProgress>,
}

/// Process-lifetime store for the execution snapshot.
///
/// Construct one per engine and share it as `Arc`. Only the runtime and the
/// queue write to it.
#[derive(Debug, Default)]
pub struct ExecutionStateStore {
    state: RwLock<Option<ExecutionSnapshot>>,
}

impl ExecutionStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracking a job.
    pub fn start_execution(&self, job_id: JobId, node_ids: Vec<NodeId>) {
        let total_nodes = node_ids.len();
        *self.state.write() = Some(ExecutionSnapshot {
            job_id,
            is_executing: true,
            node_ids,
            total_nodes,
            current_node: None,
            current_index: 0,
            step_progress: None,
        });
    }

    /// Record the node that just started.
    pub fn set_current_node(&self, node_id: &NodeId, index: usize, total: usize) {
        if let Some(snapshot) = self.state.write().as_mut() {
            snapshot.current_node = Some(node_id.clone());
            snapshot.current_index = index;
            snapshot.total_nodes = total;
        }
    }

    /// Record intra-node step progress.
    pub fn set_step_progress(
        &self,
        node_id: &NodeId,
        current_step: u32,
        total_steps: u32,
        percentage: f64,
    ) {
        if let Some(snapshot) = self.state.write().as_mut() {
            snapshot.step_progress = Some(StepProgress {
                node_id: node_id.clone(),
                current_step,
                total_steps,
                percentage,
            });
        }
    }

    /// Clear the snapshot. Safe to call when nothing is running.
    pub fn complete_execution(&self) {
        self.state.write().take();
    }

    /// Clear the snapshot only if it belongs to `job_id`.
    ///
    /// Returns whether anything was cleared.
    pub fn complete_job(&self, job_id: JobId) -> bool {
        let mut state = self.state.write();
        match state.as_ref() {
            Some(snapshot) if snapshot.job_id == job_id => {
                *state = None;
                true
            }
            _ => false,
        }
    }

    /// Current snapshot, if a job is executing.
    pub fn get_state(&self) -> Option<ExecutionSnapshot> {
        self.state.read().clone()
    }

    /// Whether a job is executing.
    pub fn is_executing(&self) -> bool {
        self.state.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|n| NodeId::new(*n)).collect()
    }

    #[test]
    fn tracks_progress_through_a_job() {
        let store = ExecutionStateStore::new();
        assert!(store.get_state().is_none());

        let job = JobId::new();
        store.start_execution(job, ids(&["load", "gen", "save"]));
        store.set_current_node(&NodeId::new("gen"), 1, 3);
        store.set_step_progress(&NodeId::new("gen"), 5, 20, 25.0);

        let snapshot = store.get_state().unwrap();
        assert!(snapshot.is_executing);
        assert_eq!(snapshot.job_id, job);
        assert_eq!(snapshot.total_nodes, 3);
        assert_eq!(snapshot.current_node, Some(NodeId::new("gen")));
        assert_eq!(snapshot.current_index, 1);
        assert_eq!(snapshot.step_progress.unwrap().current_step, 5);
    }

    #[test]
    fn complete_is_idempotent() {
        let store = ExecutionStateStore::new();
        store.complete_execution();
        store.start_execution(JobId::new(), ids(&["a"]));
        store.complete_execution();
        store.complete_execution();
        assert!(!store.is_executing());
    }

    #[test]
    fn updates_without_execution_are_ignored() {
        let store = ExecutionStateStore::new();
        store.set_current_node(&NodeId::new("a"), 0, 1);
        store.set_step_progress(&NodeId::new("a"), 1, 2, 50.0);
        assert!(store.get_state().is_none());
    }

    #[test]
    fn complete_job_only_clears_matching_job() {
        let store = ExecutionStateStore::new();
        let running = JobId::new();
        store.start_execution(running, ids(&["a"]));
        assert!(!store.complete_job(JobId::new()));
        assert!(store.is_executing());
        assert!(store.complete_job(running));
        assert!(!store.is_executing());
    }
}
