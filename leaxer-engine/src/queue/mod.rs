//! Job queue: one running job at a time, pending jobs batched by model.
//!
//! - [`Job`] - a submitted graph and its lifecycle
//! - [`optimize_job_order`] - model-path batching of pending jobs
//! - [`JobQueue`] - cloneable handle to the queue actor

mod actor;
mod batching;
mod job;

pub use actor::{EnqueueOptions, JobQueue};
pub use batching::{detect_model_path, optimize_job_order};
pub use job::{Job, JobStatus, JobSummary, QueueSnapshot};
