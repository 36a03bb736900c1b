//! Error types for Leaxer.
//!
//! Every error carries the identifiers needed to diagnose it (job ID, node ID,
//! node type, port name). Errors are grouped by stable codes so that clients
//! can branch on `code()` without matching on message text.

use crate::types::{JobId, NodeId};
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Leaxer operations.
#[derive(Error, Debug)]
pub enum LeaxerError {
    // =========================================================================
    // Node Execution Errors (E300-E399)
    // =========================================================================
    /// Node execution failed (business error or converted fault).
    #[error("E301: Node {node_id} ({node_type}) failed in {job_id}: {cause}")]
    NodeExecution {
        /// The job being executed.
        job_id: JobId,
        /// The node that failed.
        node_id: NodeId,
        /// The node's registered type.
        node_type: String,
        /// Reason for the failure.
        cause: String,
    },

    /// Node exceeded the configured execution timeout.
    #[error("E302: Node {node_id} ({node_type}) timed out after {timeout_ms}ms in {job_id}")]
    NodeTimeout {
        /// The job being executed.
        job_id: JobId,
        /// The node that timed out.
        node_id: NodeId,
        /// The node's registered type.
        node_type: String,
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Node implementation panicked.
    #[error("E303: Node {node_id} ({node_type}) panicked in {job_id}: {message}")]
    NodePanic {
        /// The job being executed.
        job_id: JobId,
        /// The node that panicked.
        node_id: NodeId,
        /// The node's registered type.
        node_type: String,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// A required input had no value.
    #[error("E304: Node {node_id} is missing required input '{port}'")]
    MissingInput {
        /// The node being invoked.
        node_id: NodeId,
        /// The input port with no value.
        port: String,
    },

    /// An input value did not satisfy the declared port type.
    #[error("E305: Node {node_id} input '{port}' expected {expected}, got {actual}")]
    InputType {
        /// The node being invoked.
        node_id: NodeId,
        /// The offending input port.
        port: String,
        /// Declared port type.
        expected: String,
        /// Observed JSON kind.
        actual: String,
    },

    /// Error raised by a node implementation from inside `process`.
    #[error("E306: {cause}")]
    NodeFailure {
        /// Human-readable reason.
        cause: String,
    },

    // =========================================================================
    // Graph/Topology Errors (E400-E499)
    // =========================================================================
    /// Malformed graph structure.
    #[error("E401: Invalid graph: {cause}")]
    InvalidGraph {
        /// Description of the structural issue.
        cause: String,
    },

    /// No implementation is registered for a node type.
    #[error("E402: Unknown node type '{node_type}' for node {node_id}")]
    UnknownNodeType {
        /// The node with the unknown type.
        node_id: NodeId,
        /// The unregistered type name.
        node_type: String,
    },

    /// Cycle detected among edges.
    #[error("E403: Cycle detected involving nodes: {nodes:?}")]
    CycleDetected {
        /// Every node that could not be placed into a layer.
        nodes: Vec<NodeId>,
    },

    /// Edge references a port the node does not declare.
    #[error("E404: Invalid handle '{handle}' on node {node_id}")]
    InvalidHandle {
        /// The node the handle was resolved against.
        node_id: NodeId,
        /// The handle name.
        handle: String,
    },

    /// Edge references a node that is not in the graph.
    #[error("E405: Edge {from_node}.{from_handle} -> {to_node}.{to_handle} references unknown node {missing}")]
    UnknownNode {
        /// Edge source node.
        from_node: NodeId,
        /// Edge source handle.
        from_handle: String,
        /// Edge target node.
        to_node: NodeId,
        /// Edge target handle.
        to_handle: String,
        /// Which endpoint is missing.
        missing: NodeId,
    },

    /// Edge connects ports with incompatible declared types.
    #[error(
        "E406: Type mismatch on edge {from_node}.{from_handle} ({from_type}) -> {to_node}.{to_handle} ({to_type})"
    )]
    PortTypeMismatch {
        /// Edge source node.
        from_node: NodeId,
        /// Edge source handle.
        from_handle: String,
        /// Declared type of the source output.
        from_type: String,
        /// Edge target node.
        to_node: NodeId,
        /// Edge target handle.
        to_handle: String,
        /// Declared type of the target input.
        to_type: String,
    },

    // =========================================================================
    // Queue/Job Errors (E500-E599)
    // =========================================================================
    /// Job not found in the queue.
    #[error("E501: Job {job_id} not found")]
    JobNotFound {
        /// The unknown job.
        job_id: JobId,
    },

    /// A graph in an enqueue batch failed validation; nothing was enqueued.
    #[error("E502: Graph #{index} rejected: {cause}")]
    SubmissionRejected {
        /// Position of the graph in the submitted batch.
        index: usize,
        /// The validation error.
        cause: Box<LeaxerError>,
    },

    /// Enqueue called with no graphs.
    #[error("E503: Submission contains no graphs")]
    EmptySubmission,

    /// The queue actor is no longer running.
    #[error("E504: Job queue is shut down")]
    QueueClosed,

    /// The per-job runtime crashed outside of node execution.
    #[error("E505: Runtime for {job_id} crashed: {message}")]
    RuntimeCrashed {
        /// The job whose runtime crashed.
        job_id: JobId,
        /// The panic payload or join error.
        message: String,
    },

    // =========================================================================
    // Configuration Errors (E800-E899)
    // =========================================================================
    /// Invalid configuration value.
    #[error("E801: Invalid configuration '{field}': {cause}")]
    ConfigValue {
        /// The configuration field with invalid value.
        field: String,
        /// Why the value is invalid.
        cause: String,
    },

    /// Serialization/deserialization error.
    #[error("E802: Serialization error: {0}")]
    Serialization(
        /// The serialization error message.
        String,
    ),

    // =========================================================================
    // I/O Errors (E900-E999)
    // =========================================================================
    /// File I/O error.
    #[error("E901: I/O error at {path}: {cause}")]
    Io {
        /// The path where the I/O error occurred.
        path: PathBuf,
        /// Description of the I/O error.
        cause: String,
    },
}

impl LeaxerError {
    /// Get the error code (e.g., "E301").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NodeExecution { .. } => "E301",
            Self::NodeTimeout { .. } => "E302",
            Self::NodePanic { .. } => "E303",
            Self::MissingInput { .. } => "E304",
            Self::InputType { .. } => "E305",
            Self::NodeFailure { .. } => "E306",
            Self::InvalidGraph { .. } => "E401",
            Self::UnknownNodeType { .. } => "E402",
            Self::CycleDetected { .. } => "E403",
            Self::InvalidHandle { .. } => "E404",
            Self::UnknownNode { .. } => "E405",
            Self::PortTypeMismatch { .. } => "E406",
            Self::JobNotFound { .. } => "E501",
            Self::SubmissionRejected { .. } => "E502",
            Self::EmptySubmission => "E503",
            Self::QueueClosed => "E504",
            Self::RuntimeCrashed { .. } => "E505",
            Self::ConfigValue { .. } => "E801",
            Self::Serialization(_) => "E802",
            Self::Io { .. } => "E901",
        }
    }

    /// Create a business error from inside a node implementation.
    pub fn node_failure(cause: impl Into<String>) -> Self {
        Self::NodeFailure {
            cause: cause.into(),
        }
    }

    /// Check if this error is a graph validation error.
    ///
    /// Validation errors are reported at submission time and never reach a runtime.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        match self {
            Self::InvalidGraph { .. }
            | Self::UnknownNodeType { .. }
            | Self::CycleDetected { .. }
            | Self::InvalidHandle { .. }
            | Self::UnknownNode { .. }
            | Self::PortTypeMismatch { .. } => true,
            Self::SubmissionRejected { cause, .. } => cause.is_validation_error(),
            _ => false,
        }
    }

    /// The node this error is attributed to, if any.
    #[must_use]
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            Self::NodeExecution { node_id, .. }
            | Self::NodeTimeout { node_id, .. }
            | Self::NodePanic { node_id, .. }
            | Self::MissingInput { node_id, .. }
            | Self::InputType { node_id, .. }
            | Self::UnknownNodeType { node_id, .. }
            | Self::InvalidHandle { node_id, .. } => Some(node_id),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LeaxerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using `LeaxerError`.
pub type Result<T> = std::result::Result<T, LeaxerError>;
