//! Handles for observing and stopping a spawned runtime.

use super::job::JobOutcome;
use crate::state::ExecutionStateStore;
use leaxer_core::error::LeaxerError;
use leaxer_core::types::JobId;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Clears the execution state for a job when dropped.
pub(crate) struct StateGuard {
    job_id: JobId,
    state: Arc<ExecutionStateStore>,
}

impl StateGuard {
    pub(crate) fn new(job_id: JobId, state: Arc<ExecutionStateStore>) -> Self {
        Self { job_id, state }
    }
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        self.state.complete_job(self.job_id);
    }
}

/// Stops a runtime without owning its result.
#[derive(Debug, Clone)]
pub struct RuntimeStopper {
    job_id: JobId,
    cancel: CancellationToken,
    abort: AbortHandle,
    state: Arc<ExecutionStateStore>,
}

impl RuntimeStopper {
    /// The job this stopper controls.
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Phase 1: ask the runtime to stop at its next opportunity.
    pub fn request_stop(&self) {
        tracing::debug!(job_id = %self.job_id, "Graceful stop requested");
        self.cancel.cancel();
    }

    /// Phase 2: abort the runtime task and clear its execution state.
    ///
    /// A node blocking its thread keeps running until it yields, but the job
    /// is considered stopped from this point on.
    pub fn force_stop(&self) {
        tracing::warn!(job_id = %self.job_id, "Forcing runtime stop");
        self.cancel.cancel();
        self.abort.abort();
        self.state.complete_job(self.job_id);
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the runtime task has exited.
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Owning handle to a spawned runtime.
#[derive(Debug)]
pub struct RuntimeHandle {
    job_id: JobId,
    join: JoinHandle<JobOutcome>,
    cancel: CancellationToken,
    state: Arc<ExecutionStateStore>,
}

impl RuntimeHandle {
    pub(crate) fn new(
        job_id: JobId,
        join: JoinHandle<JobOutcome>,
        cancel: CancellationToken,
        state: Arc<ExecutionStateStore>,
    ) -> Self {
        Self {
            job_id,
            join,
            cancel,
            state,
        }
    }

    /// The job being executed.
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// A cloneable stopper for this runtime.
    pub fn stopper(&self) -> RuntimeStopper {
        RuntimeStopper {
            job_id: self.job_id,
            cancel: self.cancel.clone(),
            abort: self.join.abort_handle(),
            state: Arc::clone(&self.state),
        }
    }

    /// Wait for the runtime to exit.
    ///
    /// A task that was aborted yields `Aborted`; a task that panicked outside
    /// node execution yields `Failed` with no node attribution.
    pub async fn join(self) -> JobOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => {
                self.state.complete_job(self.job_id);
                JobOutcome::Aborted
            }
            Err(err) => {
                self.state.complete_job(self.job_id);
                tracing::error!(job_id = %self.job_id, error = %err, "Runtime crashed");
                JobOutcome::Failed {
                    node_id: None,
                    error: LeaxerError::RuntimeCrashed {
                        job_id: self.job_id,
                        message: err.to_string(),
                    }
                    .to_string(),
                }
            }
        }
    }

    /// Two-phase stop: request a graceful stop, then force it after `grace`.
    ///
    /// Returns within `grace` plus scheduling latency even if a node never
    /// yields.
    pub async fn abort(self, grace: Duration) -> JobOutcome {
        let stopper = self.stopper();
        stopper.request_stop();

        match tokio::time::timeout(grace, self.join()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                stopper.force_stop();
                JobOutcome::Aborted
            }
        }
    }
}
