//! The queue actor and its handle.
//!
//! All queue state lives in a single task that processes one message at a
//! time. Runtimes report back through an internal channel, so a runtime that
//! panics or is force-stopped can never corrupt the queue.

use super::batching::optimize_job_order;
use super::job::{Job, JobStatus, QueueSnapshot};
use crate::config::EngineConfig;
use crate::events::{EngineEvent, EventBus};
use crate::runtime::{JobOutcome, JobSpec, Runtime, RuntimeStopper};
use crate::scheduler::sort_and_validate;
use crate::state::ExecutionStateStore;
use leaxer_core::error::{LeaxerError, Result};
use leaxer_core::graph::Graph;
use leaxer_core::registry::NodeRegistry;
use leaxer_core::settings::{CachingStrategy, ComputeBackend};
use leaxer_core::types::JobId;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::instrument;

/// Per-submission overrides of the engine defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    /// Compute backend for every job in the submission.
    pub compute_backend: Option<ComputeBackend>,
    /// Caching strategy for every job in the submission.
    pub caching_strategy: Option<CachingStrategy>,
}

impl EnqueueOptions {
    /// Set the compute backend.
    pub fn with_compute_backend(mut self, backend: ComputeBackend) -> Self {
        self.compute_backend = Some(backend);
        self
    }

    /// Set the caching strategy.
    pub fn with_caching_strategy(mut self, strategy: CachingStrategy) -> Self {
        self.caching_strategy = Some(strategy);
        self
    }
}

enum Command {
    Enqueue {
        jobs: Vec<Job>,
        reply: oneshot::Sender<Vec<JobId>>,
    },
    Cancel {
        job_id: JobId,
        reply: oneshot::Sender<Result<()>>,
    },
    GetState {
        reply: oneshot::Sender<QueueSnapshot>,
    },
    ClearPending {
        reply: oneshot::Sender<usize>,
    },
    ClearFinished {
        reply: oneshot::Sender<usize>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Messages from runtimes and timers back to the actor.
enum Internal {
    Finished { job_id: JobId, outcome: JobOutcome },
    GraceExpired { job_id: JobId },
}

/// Cloneable handle to the job queue.
///
/// Dropping every handle stops the actor and force-stops a running job.
#[derive(Clone)]
pub struct JobQueue {
    commands: mpsc::UnboundedSender<Command>,
    registry: NodeRegistry,
    events: EventBus,
    state: Arc<ExecutionStateStore>,
    config: EngineConfig,
}

impl JobQueue {
    /// Start a queue with its own event bus and execution state store.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(registry: NodeRegistry, config: EngineConfig) -> Self {
        let events = EventBus::new(config.event_capacity);
        let state = Arc::new(ExecutionStateStore::new());
        Self::with_services(registry, config, state, events)
    }

    /// Start a queue over existing services.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_services(
        registry: NodeRegistry,
        config: EngineConfig,
        state: Arc<ExecutionStateStore>,
        events: EventBus,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let actor = QueueActor {
            jobs: Vec::new(),
            running: None,
            registry: registry.clone(),
            state: Arc::clone(&state),
            events: events.clone(),
            config: config.clone(),
            internal_tx,
        };
        tokio::spawn(actor.run(command_rx, internal_rx));

        Self {
            commands,
            registry,
            events,
            state,
            config,
        }
    }

    /// Validate and enqueue a submission.
    ///
    /// Either every graph is accepted or none is: the first graph that fails
    /// validation is reported as `SubmissionRejected` with its index. Job IDs
    /// are returned in submission order.
    #[instrument(skip(self, graphs), fields(graphs = graphs.len()))]
    pub async fn enqueue(&self, graphs: Vec<Graph>, options: EnqueueOptions) -> Result<Vec<JobId>> {
        if graphs.is_empty() {
            return Err(LeaxerError::EmptySubmission);
        }

        let compute_backend = options
            .compute_backend
            .unwrap_or(self.config.compute_backend);
        let caching_strategy = options
            .caching_strategy
            .unwrap_or(self.config.caching_strategy);

        let mut jobs = Vec::with_capacity(graphs.len());
        for (index, graph) in graphs.into_iter().enumerate() {
            let layers = sort_and_validate(&graph, &self.registry).map_err(|cause| {
                tracing::warn!(index, error = %cause, "Submission rejected");
                LeaxerError::SubmissionRejected {
                    index,
                    cause: Box::new(cause),
                }
            })?;
            jobs.push(Job::new(
                Arc::new(graph),
                layers,
                compute_backend,
                caching_strategy,
            ));
        }

        self.request(|reply| Command::Enqueue { jobs, reply }).await
    }

    /// Cancel a job.
    ///
    /// Pending jobs are removed outright. A running job is asked to stop and
    /// is force-stopped after the grace window; it becomes `cancelled` once
    /// its runtime exits. Cancelling a finished job does nothing.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn cancel(&self, job_id: JobId) -> Result<()> {
        self.request(|reply| Command::Cancel { job_id, reply }).await?
    }

    /// Snapshot of every job.
    pub async fn get_state(&self) -> Result<QueueSnapshot> {
        self.request(|reply| Command::GetState { reply }).await
    }

    /// Drop every pending job. Returns how many were dropped.
    pub async fn clear_pending(&self) -> Result<usize> {
        self.request(|reply| Command::ClearPending { reply }).await
    }

    /// Drop every completed, failed or cancelled job. Returns how many were dropped.
    pub async fn clear_finished(&self) -> Result<usize> {
        self.request(|reply| Command::ClearFinished { reply }).await
    }

    /// Stop the running job, drop pending jobs and stop the actor.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// The queue's event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// The execution state store shared with runtimes.
    pub fn state_store(&self) -> &Arc<ExecutionStateStore> {
        &self.state
    }

    /// The node registry used for validation and execution.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| LeaxerError::QueueClosed)?;
        response.await.map_err(|_| LeaxerError::QueueClosed)
    }
}

struct RunningJob {
    job_id: JobId,
    stopper: RuntimeStopper,
    cancel_requested: bool,
}

struct QueueActor {
    jobs: Vec<Job>,
    running: Option<RunningJob>,
    registry: NodeRegistry,
    state: Arc<ExecutionStateStore>,
    events: EventBus,
    config: EngineConfig,
    internal_tx: mpsc::UnboundedSender<Internal>,
}

impl QueueActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        tracing::debug!("Job queue started");
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        self.stop_all();
                        break;
                    };
                    if let Command::Shutdown { reply } = command {
                        self.stop_all();
                        let _ = reply.send(());
                        break;
                    }
                    self.handle_command(command);
                }
                Some(message) = internal.recv() => self.handle_internal(message),
            }
        }
        self.registry.shutdown_all();
        tracing::debug!("Job queue stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Enqueue { jobs, reply } => {
                let ids = jobs.iter().map(|job| job.id).collect();
                for job in &jobs {
                    tracing::info!(
                        job_id = %job.id,
                        model_path = ?job.model_path,
                        nodes = job.graph.len(),
                        "Job enqueued"
                    );
                }
                self.jobs.extend(jobs);
                if self.config.batch_by_model {
                    optimize_job_order(&mut self.jobs);
                }
                self.start_next();
                self.publish_queue();
                let _ = reply.send(ids);
            }
            Command::Cancel { job_id, reply } => {
                let _ = reply.send(self.cancel(job_id));
            }
            Command::GetState { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::ClearPending { reply } => {
                let dropped = self.drain(|job| job.status == JobStatus::Pending);
                for job_id in &dropped {
                    self.events
                        .publish(EngineEvent::ExecutionAborted { job_id: *job_id });
                }
                if !dropped.is_empty() {
                    self.publish_queue();
                }
                let _ = reply.send(dropped.len());
            }
            Command::ClearFinished { reply } => {
                let dropped = self.drain(|job| job.status.is_terminal());
                if !dropped.is_empty() {
                    self.publish_queue();
                }
                let _ = reply.send(dropped.len());
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Finished { job_id, outcome } => self.finish(job_id, outcome),
            Internal::GraceExpired { job_id } => {
                let Some(running) = self.running.as_ref() else {
                    return;
                };
                if running.job_id != job_id {
                    return;
                }
                tracing::warn!(job_id = %job_id, "Runtime ignored stop request");
                running.stopper.force_stop();
                self.finish(job_id, JobOutcome::Aborted);
            }
        }
    }

    fn cancel(&mut self, job_id: JobId) -> Result<()> {
        let index = self
            .jobs
            .iter()
            .position(|job| job.id == job_id)
            .ok_or(LeaxerError::JobNotFound { job_id })?;

        match self.jobs[index].status {
            JobStatus::Pending => {
                self.jobs.remove(index);
                tracing::info!(job_id = %job_id, "Pending job cancelled");
                self.events.publish(EngineEvent::ExecutionAborted { job_id });
                self.publish_queue();
            }
            JobStatus::Running => {
                let grace = self.config.abort_grace();
                let Some(running) = self.running.as_mut() else {
                    return Ok(());
                };
                if running.job_id != job_id || running.cancel_requested {
                    return Ok(());
                }
                running.cancel_requested = true;
                running.stopper.request_stop();

                let internal = self.internal_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    let _ = internal.send(Internal::GraceExpired { job_id });
                });
            }
            JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled => {}
        }
        Ok(())
    }

    /// Start the next pending job if nothing is running.
    fn start_next(&mut self) {
        if self.running.is_some() {
            return;
        }
        if self.config.batch_by_model {
            optimize_job_order(&mut self.jobs);
        }
        let Some(job) = self
            .jobs
            .iter_mut()
            .find(|job| job.status == JobStatus::Pending)
        else {
            return;
        };

        job.start();
        let job_id = job.id;
        let spec = JobSpec::new(job_id, Arc::clone(&job.graph), job.layers.clone())
            .with_compute_backend(job.compute_backend)
            .with_caching_strategy(job.caching_strategy);
        tracing::info!(job_id = %job_id, model_path = ?job.model_path, "Starting job");

        let handle = Runtime::new(
            spec,
            self.registry.clone(),
            Arc::clone(&self.state),
            self.events.clone(),
            self.config.clone(),
        )
        .spawn();
        let stopper = handle.stopper();

        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            let outcome = handle.join().await;
            let _ = internal.send(Internal::Finished { job_id, outcome });
        });

        self.running = Some(RunningJob {
            job_id,
            stopper,
            cancel_requested: false,
        });
    }

    /// Record a runtime's end and emit the job's one terminal event.
    ///
    /// Reports for a job that is no longer running are stale and ignored.
    fn finish(&mut self, job_id: JobId, outcome: JobOutcome) {
        let cancel_requested = match self.running.as_ref() {
            Some(running) if running.job_id == job_id => running.cancel_requested,
            _ => {
                tracing::debug!(job_id = %job_id, "Ignoring stale runtime report");
                return;
            }
        };
        self.running = None;
        self.state.complete_job(job_id);

        let (status, error, event) = match outcome {
            _ if cancel_requested => (
                JobStatus::Cancelled,
                None,
                EngineEvent::ExecutionAborted { job_id },
            ),
            JobOutcome::Completed { outputs } => (
                JobStatus::Completed,
                None,
                EngineEvent::ExecutionComplete { job_id, outputs },
            ),
            JobOutcome::Failed { node_id, error } => (
                JobStatus::Error,
                Some(error.clone()),
                EngineEvent::ExecutionError {
                    job_id,
                    node_id,
                    error,
                },
            ),
            JobOutcome::Aborted => (
                JobStatus::Cancelled,
                None,
                EngineEvent::ExecutionAborted { job_id },
            ),
        };

        tracing::info!(job_id = %job_id, status = %status, "Job finished");
        if let Some(job) = self.jobs.iter_mut().find(|job| job.id == job_id) {
            job.finish(status, error);
        }
        self.events.publish(event);

        self.start_next();
        self.publish_queue();
    }

    /// Force-stop the running job and cancel everything pending.
    fn stop_all(&mut self) {
        if let Some(running) = self.running.take() {
            running.stopper.force_stop();
            if let Some(job) = self.jobs.iter_mut().find(|job| job.id == running.job_id) {
                job.finish(JobStatus::Cancelled, None);
            }
            self.events.publish(EngineEvent::ExecutionAborted {
                job_id: running.job_id,
            });
        }
        for job in self.jobs.iter_mut() {
            if job.status == JobStatus::Pending {
                job.finish(JobStatus::Cancelled, None);
                self.events
                    .publish(EngineEvent::ExecutionAborted { job_id: job.id });
            }
        }
        self.publish_queue();
    }

    /// Remove matching jobs, returning their IDs.
    fn drain(&mut self, matches: impl Fn(&Job) -> bool) -> Vec<JobId> {
        let mut dropped = Vec::new();
        self.jobs.retain(|job| {
            if matches(job) {
                dropped.push(job.id);
                false
            } else {
                true
            }
        });
        dropped
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            jobs: self.jobs.iter().map(Job::summary).collect(),
            is_processing: self.running.is_some(),
            current_job_id: self.running.as_ref().map(|running| running.job_id),
            pending_count: self
                .jobs
                .iter()
                .filter(|job| job.status == JobStatus::Pending)
                .count(),
        }
    }

    fn publish_queue(&self) {
        self.events.publish(EngineEvent::QueueUpdated(self.snapshot()));
    }
}
