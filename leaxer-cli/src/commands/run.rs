//! Run command - submit graph files to a local job queue and follow them.

use super::load_graph;
use anyhow::{Context, Result};
use leaxer_core::graph::Graph;
use leaxer_core::registry::NodeRegistry;
use leaxer_core::settings::ComputeBackend;
use leaxer_core::types::JobId;
use leaxer_engine::events::{EngineEvent, NodeStatus};
use leaxer_engine::{EngineConfig, EnqueueOptions, JobQueue, JobStatus};
use leaxer_nodes::builtin_registry;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Options for the run command.
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Engine configuration file.
    pub config: Option<PathBuf>,
    /// Compute backend override.
    pub backend: Option<ComputeBackend>,
    /// Disable model batching.
    pub no_batching: bool,
    /// Emit events as JSON lines.
    pub json: bool,
}

/// Final tally of a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Jobs that completed.
    pub completed: usize,
    /// Jobs that failed.
    pub failed: usize,
    /// Jobs that were cancelled.
    pub aborted: usize,
}

impl RunSummary {
    fn record(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::ExecutionComplete { .. } => self.completed += 1,
            EngineEvent::ExecutionError { .. } => self.failed += 1,
            EngineEvent::ExecutionAborted { .. } => self.aborted += 1,
            _ => {}
        }
    }

    fn record_status(&mut self, status: JobStatus) {
        match status {
            JobStatus::Completed => self.completed += 1,
            JobStatus::Error => self.failed += 1,
            JobStatus::Cancelled => self.aborted += 1,
            JobStatus::Pending | JobStatus::Running => {}
        }
    }

    /// Whether every job completed.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.aborted == 0
    }
}

/// Run the run command.
pub async fn run(files: &[PathBuf], options: RunOptions) -> Result<()> {
    let mut config = EngineConfig::load(options.config.as_deref())?;
    if options.no_batching {
        config.batch_by_model = false;
    }

    let graphs = files
        .iter()
        .map(|path| load_graph(path))
        .collect::<Result<Vec<_>>>()?;

    let json = options.json;
    let summary = execute(
        graphs,
        builtin_registry(),
        config,
        options.backend,
        |event| {
            if json {
                match serde_json::to_string(event) {
                    Ok(line) => println!("{line}"),
                    Err(err) => tracing::warn!(error = %err, "Failed to serialize event"),
                }
            } else if let Some(line) = describe(event) {
                println!("{line}");
            }
        },
    )
    .await?;

    if !json {
        println!(
            "{} completed, {} failed, {} cancelled",
            summary.completed, summary.failed, summary.aborted
        );
    }
    if !summary.is_success() {
        anyhow::bail!("{} of {} jobs did not complete", summary.failed + summary.aborted, files.len());
    }
    Ok(())
}

/// Enqueue `graphs` as one submission and feed every event to `on_event`
/// until each job has reached its terminal event.
pub async fn execute(
    graphs: Vec<Graph>,
    registry: NodeRegistry,
    config: EngineConfig,
    backend: Option<ComputeBackend>,
    mut on_event: impl FnMut(&EngineEvent),
) -> Result<RunSummary> {
    let queue = JobQueue::new(registry, config);
    let mut events = queue.subscribe();

    let mut options = EnqueueOptions::default();
    if let Some(backend) = backend {
        options = options.with_compute_backend(backend);
    }
    let ids = queue
        .enqueue(graphs, options)
        .await
        .context("Submission rejected")?;
    tracing::info!(jobs = ids.len(), "Submitted graphs");

    let summary = follow(&queue, &mut events, &ids, &mut on_event).await?;
    queue.shutdown().await?;
    Ok(summary)
}

/// Feed events to `on_event` until every job in `ids` is terminal.
///
/// Terminal events skipped by a lagging receiver are recovered from the
/// queue snapshot.
async fn follow(
    queue: &JobQueue,
    events: &mut broadcast::Receiver<EngineEvent>,
    ids: &[JobId],
    on_event: &mut impl FnMut(&EngineEvent),
) -> Result<RunSummary> {
    let mut remaining: HashSet<JobId> = ids.iter().copied().collect();
    let mut summary = RunSummary::default();

    while !remaining.is_empty() {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event stream lagged");
                let snapshot = queue.get_state().await?;
                for job in &snapshot.jobs {
                    if job.status.is_terminal() && remaining.remove(&job.id) {
                        tracing::debug!(job_id = %job.id, status = %job.status, "Settled from snapshot");
                        summary.record_status(job.status);
                    }
                }
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                anyhow::bail!("Event stream closed with {} jobs unfinished", remaining.len())
            }
        };

        on_event(&event);
        if event.is_terminal() {
            if let Some(job_id) = event.job_id() {
                if remaining.remove(&job_id) {
                    summary.record(&event);
                }
            }
        }
    }
    Ok(summary)
}

/// Human-readable line for an event, if it is worth printing.
fn describe(event: &EngineEvent) -> Option<String> {
    match event {
        EngineEvent::ExecutionStarted {
            job_id,
            total_nodes,
        } => Some(format!("▶ {job_id} started ({total_nodes} nodes)")),
        EngineEvent::ExecutionProgress {
            node_id,
            percentage,
            node_progress,
            ..
        } => match node_progress.status {
            NodeStatus::Completed => Some(format!("  [{percentage:>3.0}%] {node_id}")),
            NodeStatus::Running => match (node_progress.current_step, node_progress.total_steps) {
                (Some(current), Some(total)) => {
                    Some(format!("         {node_id} step {current}/{total}"))
                }
                _ => None,
            },
            NodeStatus::Started => None,
        },
        EngineEvent::ExecutionComplete { job_id, outputs } => {
            let mut line = format!("✓ {job_id} completed");
            for (node_id, output) in outputs {
                let rendered = serde_json::to_string(output).unwrap_or_default();
                line.push_str(&format!("\n    {node_id}: {rendered}"));
            }
            Some(line)
        }
        EngineEvent::ExecutionError {
            job_id,
            node_id,
            error,
        } => Some(match node_id {
            Some(node_id) => format!("✗ {job_id} failed at {node_id}: {error}"),
            None => format!("✗ {job_id} failed: {error}"),
        }),
        EngineEvent::ExecutionAborted { job_id } => Some(format!("⊘ {job_id} cancelled")),
        EngineEvent::NodeOutput { .. }
        | EngineEvent::QueueUpdated(_)
        | EngineEvent::ExecutionResumed(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use leaxer_core::LeaxerError;
    use leaxer_core::graph::GraphNode;
    use serde_json::json;
    use std::path::Path;

    fn graphs_from(paths: &[&Path]) -> Result<Vec<Graph>> {
        paths.iter().map(|path| load_graph(path)).collect()
    }

    #[tokio::test]
    async fn runs_submission_to_completion() {
        let first = graph_file(CONSTANT_PREVIEW, ".json");
        let second = graph_file(CONSTANT_PREVIEW, ".json");
        let graphs = graphs_from(&[first.path(), second.path()]).unwrap();

        let mut seen = Vec::new();
        let summary = execute(
            graphs,
            builtin_registry(),
            EngineConfig::default(),
            Some(ComputeBackend::Cpu),
            |event| seen.push(event.clone()),
        )
        .await
        .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                completed: 2,
                failed: 0,
                aborted: 0
            }
        );
        let outputs: Vec<_> = seen
            .iter()
            .filter_map(|event| match event {
                EngineEvent::ExecutionComplete { outputs, .. } => Some(outputs.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(outputs.len(), 2);
        for output in outputs {
            let show = output.values().next().unwrap();
            assert_eq!(show["out"], json!("hello"));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_consumer_still_sees_every_job_finish() {
        let file = graph_file(CONSTANT_PREVIEW, ".json");
        let graphs = graphs_from(&[file.path(); 6]).unwrap();

        let summary = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            execute(
                graphs,
                builtin_registry(),
                EngineConfig::default().with_event_capacity(2),
                None,
                |_| std::thread::sleep(std::time::Duration::from_millis(30)),
            ),
        )
        .await
        .expect("run did not finish")
        .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                completed: 6,
                failed: 0,
                aborted: 0
            }
        );
    }

    #[tokio::test]
    async fn failing_job_is_counted() {
        let graph = Graph::new().with_node(
            GraphNode::new("m", "Math")
                .with_data("operation", "divide")
                .with_data("a", 1)
                .with_data("b", 0),
        );
        let summary = execute(
            vec![graph],
            builtin_registry(),
            EngineConfig::default(),
            None,
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
    }

    #[tokio::test]
    async fn invalid_submission_is_an_error() {
        let cycle = graph_file(CYCLE, ".json");
        let graphs = graphs_from(&[cycle.path()]).unwrap();
        let err = execute(graphs, builtin_registry(), EngineConfig::default(), None, |_| {})
            .await
            .unwrap_err();
        let cause = err.downcast_ref::<LeaxerError>().unwrap();
        assert_eq!(cause.code(), "E502");
    }

    #[test]
    fn describes_terminal_events() {
        let job_id = JobId::new();
        let line = describe(&EngineEvent::ExecutionError {
            job_id,
            node_id: Some("gen".into()),
            error: "E301: boom".to_string(),
        })
        .unwrap();
        assert!(line.contains("failed at gen"));
        assert!(describe(&EngineEvent::ExecutionAborted { job_id })
            .unwrap()
            .contains("cancelled"));
    }
}
