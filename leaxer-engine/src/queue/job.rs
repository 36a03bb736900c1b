//! Job records and queue snapshots.

use super::batching::detect_model_path;
use crate::scheduler::Layers;
use chrono::{DateTime, Utc};
use leaxer_core::graph::Graph;
use leaxer_core::settings::{CachingStrategy, ComputeBackend};
use leaxer_core::types::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to run; may be reordered.
    Pending,
    /// Executing. At most one job is running.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Error,
    /// Cancelled before or during execution.
    Cancelled,
}

impl JobStatus {
    /// Whether the job has finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A queued request to execute a graph.
#[derive(Debug, Clone)]
pub struct Job {
    /// Job ID.
    pub id: JobId,
    /// The submitted graph.
    pub graph: Arc<Graph>,
    /// Layers computed at enqueue time.
    pub layers: Layers,
    /// Current status.
    pub status: JobStatus,
    /// Dominant model artifact, detected once at enqueue time.
    pub model_path: Option<String>,
    /// Compute backend for this job.
    pub compute_backend: ComputeBackend,
    /// Caching strategy for this job.
    pub caching_strategy: CachingStrategy,
    /// When the job was enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// When the job started running.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
    /// Error message for failed jobs.
    pub error: Option<String>,
}

impl Job {
    /// Create a pending job, caching its model path.
    pub fn new(
        graph: Arc<Graph>,
        layers: Layers,
        compute_backend: ComputeBackend,
        caching_strategy: CachingStrategy,
    ) -> Self {
        let model_path = detect_model_path(&graph);
        Self {
            id: JobId::new(),
            graph,
            layers,
            status: JobStatus::Pending,
            model_path,
            compute_backend,
            caching_strategy,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Mark the job as running.
    pub(crate) fn start(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Move the job to a terminal status.
    pub(crate) fn finish(&mut self, status: JobStatus, error: Option<String>) {
        self.status = status;
        self.error = error;
        self.finished_at = Some(Utc::now());
    }

    /// Display summary of this job.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id,
            status: self.status,
            model_path: self.model_path.clone(),
            node_count: self.graph.len(),
            compute_backend: self.compute_backend,
            enqueued_at: self.enqueued_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            error: self.error.clone(),
        }
    }
}

/// Read-only view of a job for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Job ID.
    pub id: JobId,
    /// Current status.
    pub status: JobStatus,
    /// Detected model artifact.
    pub model_path: Option<String>,
    /// Number of nodes in the graph.
    pub node_count: usize,
    /// Compute backend.
    pub compute_backend: ComputeBackend,
    /// When the job was enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// When the job started running.
    pub started_at: Option<DateTime<Utc>>,
    /// When the job finished.
    pub finished_at: Option<DateTime<Utc>>,
    /// Error message for failed jobs.
    pub error: Option<String>,
}

/// Read-only view of the whole queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Jobs in queue order.
    pub jobs: Vec<JobSummary>,
    /// Whether a job is running.
    pub is_processing: bool,
    /// The running job, if any.
    pub current_job_id: Option<JobId>,
    /// Number of pending jobs.
    pub pending_count: usize,
}

impl QueueSnapshot {
    /// Summary of one job.
    pub fn job(&self, id: JobId) -> Option<&JobSummary> {
        self.jobs.iter().find(|job| job.id == id)
    }

    /// IDs of pending jobs in the order they will run.
    pub fn pending_ids(&self) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|job| job.status == JobStatus::Pending)
            .map(|job| job.id)
            .collect()
    }
}
