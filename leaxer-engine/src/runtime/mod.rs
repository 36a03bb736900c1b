//! Per-job execution actor.
//!
//! A [`Runtime`] walks a job's precomputed layers in order. A single-node
//! layer runs inline; larger layers fan out over a `JoinSet` bounded by a
//! semaphore. The first failing layer ends the job, and the failure reported
//! is the one from the lowest node ID in that layer.
//!
//! Stopping is two-phase: [`RuntimeStopper::request_stop`] cancels the job's
//! token, which the runtime observes between and during layers; if it has not
//! exited within the grace window, [`RuntimeStopper::force_stop`] aborts the
//! task outright. [`RuntimeHandle::abort`] does both.

mod executor;
mod handle;
mod invoke;
mod job;
mod progress;

pub use executor::Runtime;
pub use handle::{RuntimeHandle, RuntimeStopper};
pub use job::{JobOutcome, JobSpec};
