//! Per-invocation context handed to nodes.

use crate::types::{JobId, NodeId};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sink for progress reported from inside a running node.
///
/// The engine implements this to forward step counts and previews to
/// subscribers; nodes never talk to subscribers directly.
pub trait ProgressReporter: Send + Sync {
    /// Report that `current` of `total` steps are done.
    fn step(&self, node_id: &NodeId, current: u32, total: u32);

    /// Publish an intermediate preview value.
    fn preview(&self, node_id: &NodeId, value: Value);
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn step(&self, _node_id: &NodeId, _current: u32, _total: u32) {}

    fn preview(&self, _node_id: &NodeId, _value: Value) {}
}

/// Context for one node invocation.
///
/// Cloning is cheap; all clones share the same cancellation token and reporter.
#[derive(Clone)]
pub struct NodeContext {
    job_id: JobId,
    node_id: NodeId,
    cancel: CancellationToken,
    reporter: Arc<dyn ProgressReporter>,
}

impl NodeContext {
    /// Create a context.
    pub fn new(
        job_id: JobId,
        node_id: NodeId,
        cancel: CancellationToken,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            job_id,
            node_id,
            cancel,
            reporter,
        }
    }

    /// Context with a fresh token and no reporter, for driving a node directly.
    pub fn detached(job_id: JobId, node_id: impl Into<NodeId>) -> Self {
        Self::new(
            job_id,
            node_id.into(),
            CancellationToken::new(),
            Arc::new(NoopReporter),
        )
    }

    /// The job being executed.
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// The node being invoked.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Whether a stop has been requested for this job.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once a stop has been requested.
    ///
    /// Long-running nodes should select on this between steps.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// The underlying cancellation token.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Report intra-node step progress.
    pub fn report_step(&self, current: u32, total: u32) {
        self.reporter.step(&self.node_id, current, total);
    }

    /// Publish an intermediate preview.
    pub fn report_preview(&self, value: Value) {
        self.reporter.preview(&self.node_id, value);
    }
}

impl fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeContext")
            .field("job_id", &self.job_id)
            .field("node_id", &self.node_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        steps: Mutex<Vec<(String, u32, u32)>>,
    }

    impl ProgressReporter for Recorder {
        fn step(&self, node_id: &NodeId, current: u32, total: u32) {
            self.steps
                .lock()
                .push((node_id.to_string(), current, total));
        }

        fn preview(&self, _node_id: &NodeId, _value: Value) {}
    }

    #[test]
    fn reports_steps_with_node_id() {
        let recorder = Arc::new(Recorder::default());
        let ctx = NodeContext::new(
            JobId::new(),
            NodeId::new("sampler"),
            CancellationToken::new(),
            recorder.clone(),
        );
        ctx.report_step(1, 20);
        ctx.report_step(2, 20);
        assert_eq!(
            *recorder.steps.lock(),
            vec![
                ("sampler".to_string(), 1, 20),
                ("sampler".to_string(), 2, 20)
            ]
        );
    }

    #[test]
    fn clones_share_cancellation() {
        let ctx = NodeContext::detached(JobId::new(), "n");
        let other = ctx.clone();
        assert!(!other.is_cancelled());
        ctx.cancellation_token().cancel();
        assert!(other.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_wakes_a_waiting_node() {
        let ctx = NodeContext::detached(JobId::new(), "n");
        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.cancelled().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        ctx.cancellation_token().cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter did not wake")
            .unwrap();
    }
}
