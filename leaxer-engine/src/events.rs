//! Progress and lifecycle event feed.
//!
//! The runtime and the queue publish [`EngineEvent`]s on an [`EventBus`];
//! transports subscribe and forward them. Publishing never blocks and never
//! fails: with no subscribers, events are dropped.

use crate::queue::QueueSnapshot;
use crate::state::{ExecutionSnapshot, ExecutionStateStore};
use leaxer_core::traits::PortValues;
use leaxer_core::types::{JobId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::broadcast;

/// Lifecycle status of a node inside a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// The node was just dispatched.
    Started,
    /// The node reported intra-node steps.
    Running,
    /// The node finished successfully.
    Completed,
}

/// Node-level progress carried by [`EngineEvent::ExecutionProgress`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProgress {
    /// Node lifecycle status.
    pub status: NodeStatus,
    /// Steps done, when the node reports steps.
    pub current_step: Option<u32>,
    /// Total steps, when the node reports steps.
    pub total_steps: Option<u32>,
    /// Node-level percentage.
    pub percentage: f64,
}

impl NodeProgress {
    pub(crate) fn started() -> Self {
        Self {
            status: NodeStatus::Started,
            current_step: None,
            total_steps: None,
            percentage: 0.0,
        }
    }

    pub(crate) fn completed() -> Self {
        Self {
            status: NodeStatus::Completed,
            current_step: None,
            total_steps: None,
            percentage: 100.0,
        }
    }

    pub(crate) fn step(current: u32, total: u32) -> Self {
        Self {
            status: NodeStatus::Running,
            current_step: Some(current),
            total_steps: Some(total),
            percentage: percentage(current as usize, total as usize),
        }
    }
}

/// `done / total` as a percentage; 100 for an empty total.
pub(crate) fn percentage(done: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        (done as f64 / total as f64 * 100.0).min(100.0)
    }
}

/// An event published by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A job's runtime began executing.
    ExecutionStarted {
        /// The job.
        job_id: JobId,
        /// Number of nodes in the job.
        total_nodes: usize,
    },

    /// Node start, node completion or intra-node step.
    ExecutionProgress {
        /// The job.
        job_id: JobId,
        /// The node the event is about.
        node_id: NodeId,
        /// Zero-based position of the node in execution order.
        current_index: usize,
        /// Number of nodes in the job.
        total_nodes: usize,
        /// Graph-level completion: completed nodes over total nodes.
        percentage: f64,
        /// Node-level detail.
        node_progress: NodeProgress,
    },

    /// Best-effort intermediate or final node data.
    NodeOutput {
        /// The job.
        job_id: JobId,
        /// The producing node.
        node_id: NodeId,
        /// The data; may be empty.
        output: PortValues,
    },

    /// Terminal: the job completed.
    ExecutionComplete {
        /// The job.
        job_id: JobId,
        /// Outputs of the job's final nodes.
        outputs: BTreeMap<NodeId, PortValues>,
    },

    /// Terminal: the job failed.
    ExecutionError {
        /// The job.
        job_id: JobId,
        /// The node the failure is attributed to, if any.
        node_id: Option<NodeId>,
        /// Error message.
        error: String,
    },

    /// Terminal: the job was cancelled.
    ExecutionAborted {
        /// The job.
        job_id: JobId,
    },

    /// The queue changed.
    QueueUpdated(QueueSnapshot),

    /// Sent once to a (re)connecting subscriber while a job is running.
    ExecutionResumed(ExecutionSnapshot),
}

impl EngineEvent {
    /// The job this event concerns, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Self::ExecutionStarted { job_id, .. }
            | Self::ExecutionProgress { job_id, .. }
            | Self::NodeOutput { job_id, .. }
            | Self::ExecutionComplete { job_id, .. }
            | Self::ExecutionError { job_id, .. }
            | Self::ExecutionAborted { job_id } => Some(*job_id),
            Self::ExecutionResumed(snapshot) => Some(snapshot.job_id),
            Self::QueueUpdated(_) => None,
        }
    }

    /// Whether this is one of the three terminal job events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ExecutionComplete { .. } | Self::ExecutionError { .. } | Self::ExecutionAborted { .. }
        )
    }
}

/// Broadcast channel for engine events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event.
    pub fn publish(&self, event: EngineEvent) {
        // Err only means there are no subscribers right now.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Subscribe, also returning an `ExecutionResumed` event if a job is running.
    ///
    /// The receiver is created before the snapshot is read, so no progress
    /// published after the snapshot is missed.
    pub fn subscribe_with_resume(
        &self,
        store: &ExecutionStateStore,
    ) -> (Option<EngineEvent>, broadcast::Receiver<EngineEvent>) {
        let receiver = self.sender.subscribe();
        let resumed = store.get_state().map(EngineEvent::ExecutionResumed);
        (resumed, receiver)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn progress_serializes_with_type_tag() {
        let event = EngineEvent::ExecutionProgress {
            job_id: JobId::new(),
            node_id: NodeId::new("gen"),
            current_index: 1,
            total_nodes: 3,
            percentage: 33.3,
            node_progress: NodeProgress::step(5, 20),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("execution_progress"));
        assert_eq!(value["node_id"], json!("gen"));
        assert_eq!(value["node_progress"]["status"], json!("running"));
        assert_eq!(value["node_progress"]["percentage"], json!(25.0));
    }

    #[test]
    fn terminal_events() {
        let job_id = JobId::new();
        assert!(EngineEvent::ExecutionAborted { job_id }.is_terminal());
        assert!(
            !EngineEvent::ExecutionStarted {
                job_id,
                total_nodes: 1
            }
            .is_terminal()
        );
    }

    #[test]
    fn percentage_bounds() {
        assert_eq!(percentage(0, 0), 100.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(5, 4), 100.0);
    }

    #[tokio::test]
    async fn publish_reaches_subscribers() {
        let bus = EventBus::new(8);
        bus.publish(EngineEvent::ExecutionAborted { job_id: JobId::new() });

        let mut rx = bus.subscribe();
        let job_id = JobId::new();
        bus.publish(EngineEvent::ExecutionAborted { job_id });
        assert_eq!(rx.recv().await.unwrap().job_id(), Some(job_id));
    }

    #[test]
    fn resume_only_while_executing() {
        let bus = EventBus::default();
        let store = ExecutionStateStore::new();
        let (resumed, _rx) = bus.subscribe_with_resume(&store);
        assert!(resumed.is_none());

        let job_id = JobId::new();
        store.start_execution(job_id, vec![NodeId::new("a")]);
        let (resumed, _rx) = bus.subscribe_with_resume(&store);
        match resumed {
            Some(EngineEvent::ExecutionResumed(snapshot)) => assert_eq!(snapshot.job_id, job_id),
            other => panic!("unexpected {other:?}"),
        }
    }
}
