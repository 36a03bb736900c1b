//! Job input and outcome types.

use crate::scheduler::Layers;
use leaxer_core::graph::Graph;
use leaxer_core::settings::{CachingStrategy, ComputeBackend};
use leaxer_core::traits::PortValues;
use leaxer_core::types::{JobId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything a runtime needs to execute one job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// The job.
    pub job_id: JobId,
    /// The validated graph.
    pub graph: Arc<Graph>,
    /// Layers computed by [`sort_and_validate`](crate::scheduler::sort_and_validate).
    pub layers: Layers,
    /// Compute backend injected into node config.
    pub compute_backend: ComputeBackend,
    /// Caching strategy injected into node config.
    pub caching_strategy: CachingStrategy,
}

impl JobSpec {
    /// Create a spec with default backend and caching.
    pub fn new(job_id: JobId, graph: Arc<Graph>, layers: Layers) -> Self {
        Self {
            job_id,
            graph,
            layers,
            compute_backend: ComputeBackend::default(),
            caching_strategy: CachingStrategy::default(),
        }
    }

    /// Set the compute backend.
    pub fn with_compute_backend(mut self, backend: ComputeBackend) -> Self {
        self.compute_backend = backend;
        self
    }

    /// Set the caching strategy.
    pub fn with_caching_strategy(mut self, strategy: CachingStrategy) -> Self {
        self.caching_strategy = strategy;
        self
    }
}

/// How a job's runtime ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Every layer succeeded.
    Completed {
        /// Outputs of the nodes with no outgoing edges.
        outputs: BTreeMap<NodeId, PortValues>,
    },
    /// A node or the runtime itself failed.
    Failed {
        /// The node the failure is attributed to, if any.
        node_id: Option<NodeId>,
        /// Error message.
        error: String,
    },
    /// The job was stopped before finishing.
    Aborted,
}

impl JobOutcome {
    /// Whether the job completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Whether the job failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether the job was aborted.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
