//! # Leaxer Engine
//!
//! Scheduling and execution for Leaxer compute graphs.
//!
//! - [`scheduler`] - validation and layered topological sort
//! - [`context`] - per-job output store with reference-counted eviction
//! - [`runtime`] - per-job execution actor with two-phase abort
//! - [`queue`] - job queue with model-path batching
//! - [`state`] - recoverable snapshot of the running job
//! - [`events`] - progress and lifecycle event feed
//! - [`config`] - engine configuration
//! - [`observability`] - tracing subscriber setup
//!
//! ## Example
//!
//! ```ignore
//! use leaxer_engine::{EngineConfig, EnqueueOptions, JobQueue};
//!
//! let queue = JobQueue::new(registry, EngineConfig::from_env());
//! let mut events = queue.subscribe();
//! let ids = queue.enqueue(vec![graph], EnqueueOptions::default()).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod events;
pub mod observability;
pub mod queue;
pub mod runtime;
pub mod scheduler;
pub mod state;

pub use config::EngineConfig;
pub use context::ExecutionContext;
pub use events::{EngineEvent, EventBus, NodeProgress, NodeStatus};
pub use queue::{EnqueueOptions, Job, JobQueue, JobStatus, JobSummary, QueueSnapshot};
pub use runtime::{JobOutcome, JobSpec, Runtime, RuntimeHandle, RuntimeStopper};
pub use scheduler::{Layers, sort_and_validate};
pub use state::{ExecutionSnapshot, ExecutionStateStore};
