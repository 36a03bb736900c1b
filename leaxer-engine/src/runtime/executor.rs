//! Layer-by-layer job execution.

use super::handle::{RuntimeHandle, StateGuard};
use super::invoke::{Action, Invocation};
use super::job::{JobOutcome, JobSpec};
use super::progress::ProgressTracker;
use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::events::{EngineEvent, EventBus};
use crate::scheduler::FlowGraph;
use crate::state::ExecutionStateStore;
use leaxer_core::error::{LeaxerError, Result};
use leaxer_core::graph::GraphNode;
use leaxer_core::registry::NodeRegistry;
use leaxer_core::traits::{NodeConfig, PortValues, ProgressReporter};
use leaxer_core::types::NodeId;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Executes one job.
///
/// Owns the job's [`ExecutionContext`]; node tasks only receive their
/// gathered inputs, never the context itself.
pub struct Runtime {
    spec: JobSpec,
    registry: NodeRegistry,
    state: Arc<ExecutionStateStore>,
    events: EventBus,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl Runtime {
    /// Create a runtime for a validated job.
    pub fn new(
        spec: JobSpec,
        registry: NodeRegistry,
        state: Arc<ExecutionStateStore>,
        events: EventBus,
        config: EngineConfig,
    ) -> Self {
        Self {
            spec,
            registry,
            state,
            events,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token cancelled by a graceful stop request.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run on its own task.
    pub fn spawn(self) -> RuntimeHandle {
        let job_id = self.spec.job_id;
        let cancel = self.cancel.clone();
        let state = Arc::clone(&self.state);
        let join = tokio::spawn(self.run());
        RuntimeHandle::new(job_id, join, cancel, state)
    }

    /// Execute every layer in order.
    ///
    /// The execution state is cleared on every exit path, including when the
    /// future is dropped mid-layer.
    #[instrument(
        skip(self),
        fields(
            job_id = %self.spec.job_id,
            node_count = self.spec.layers.node_count(),
            layer_count = self.spec.layers.len(),
        )
    )]
    pub async fn run(self) -> JobOutcome {
        let job_id = self.spec.job_id;
        let order = self.spec.layers.flatten();

        self.state.start_execution(job_id, order.clone());
        let _guard = StateGuard::new(job_id, Arc::clone(&self.state));
        self.events.publish(EngineEvent::ExecutionStarted {
            job_id,
            total_nodes: order.len(),
        });

        let tracker = Arc::new(ProgressTracker::new(
            job_id,
            &order,
            self.events.clone(),
            Arc::clone(&self.state),
            self.cancel.clone(),
        ));
        let mut ctx = ExecutionContext::new(job_id, &self.spec.graph.edges);
        let flow = FlowGraph::new(&self.spec.graph);

        tracing::info!("Job started");

        for (index, layer) in self.spec.layers.iter().enumerate() {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!(layer = index, "Job stopped");
                    return JobOutcome::Aborted;
                }
                result = self.execute_layer(index, layer, &flow, &mut ctx, &tracker) => result,
            };

            if let Err(err) = result {
                tracing::warn!(layer = index, error = %err, "Job failed");
                return JobOutcome::Failed {
                    node_id: err.node_id().cloned(),
                    error: err.to_string(),
                };
            }
        }

        let outputs = ctx.take_final_outputs();
        tracing::info!(final_outputs = outputs.len(), "Job completed");
        JobOutcome::Completed { outputs }
    }

    /// Execute one layer and merge its outputs into `ctx`.
    async fn execute_layer(
        &self,
        index: usize,
        layer: &[NodeId],
        flow: &FlowGraph<'_>,
        ctx: &mut ExecutionContext,
        tracker: &Arc<ProgressTracker>,
    ) -> Result<()> {
        tracing::debug!(layer = index, nodes = layer.len(), "Executing layer");

        // Gather every member's inputs before any source is consumed.
        let mut invocations = Vec::with_capacity(layer.len());
        for node_id in layer {
            invocations.push(self.prepare(node_id, flow, ctx)?);
        }
        for node_id in layer {
            for edge in flow.incoming_edges(node_id) {
                ctx.consume_input(&edge.source);
            }
        }

        let reporter: Arc<dyn ProgressReporter> = tracker.clone();
        let timeout = self.config.node_timeout();
        let mut results: Vec<(NodeId, Result<PortValues>)> = Vec::with_capacity(layer.len());

        if invocations.len() == 1 {
            for invocation in invocations {
                let node_id = invocation.node_id.clone();
                tracker.node_started(&node_id);
                let result = invocation
                    .run(self.cancel.clone(), reporter.clone(), timeout)
                    .await;
                if result.is_ok() {
                    tracker.node_completed(&node_id);
                }
                results.push((node_id, result));
            }
        } else {
            let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_nodes.max(1)));
            let mut tasks: JoinSet<(NodeId, Result<PortValues>)> = JoinSet::new();

            for invocation in invocations {
                let node_id = invocation.node_id.clone();
                let semaphore = Arc::clone(&semaphore);
                let cancel = self.cancel.clone();
                let reporter = reporter.clone();
                let tracker = Arc::clone(tracker);
                tasks.spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return (node_id, Err(LeaxerError::node_failure("worker pool closed")));
                    };
                    // Announced only once a worker slot is held.
                    tracker.node_started(&node_id);
                    let result = invocation.run(cancel, reporter, timeout).await;
                    (node_id, result)
                });
            }

            let mut crashed = None;
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((node_id, result)) => {
                        if result.is_ok() {
                            tracker.node_completed(&node_id);
                        }
                        results.push((node_id, result));
                    }
                    Err(join_error) => {
                        tracing::error!(error = %join_error, "Node task join error");
                        if crashed.is_none() {
                            crashed = Some(LeaxerError::RuntimeCrashed {
                                job_id: self.spec.job_id,
                                message: join_error.to_string(),
                            });
                        }
                    }
                }
            }

            if let Some(err) = crashed {
                return Err(err);
            }
        }

        // Lowest node ID wins among failures.
        results.sort_by(|a, b| a.0.cmp(&b.0));
        let mut outputs = Vec::with_capacity(results.len());
        for (node_id, result) in results {
            outputs.push((node_id, result?));
        }

        for (node_id, output) in outputs {
            if ctx.is_final(&node_id) && !output.is_empty() {
                tracker.node_output(&node_id, output.clone());
            }
            ctx.put_output(node_id, output);
        }
        Ok(())
    }

    /// Resolve a node's action, inputs and config.
    fn prepare(
        &self,
        node_id: &NodeId,
        flow: &FlowGraph<'_>,
        ctx: &ExecutionContext,
    ) -> Result<Invocation> {
        let node = flow
            .get_node(node_id)
            .ok_or_else(|| LeaxerError::InvalidGraph {
                cause: format!("layer references missing node '{node_id}'"),
            })?;

        let action = if node.is_visual_only() {
            Action::Skip
        } else {
            let implementation = self.registry.get(&node.node_type).ok_or_else(|| {
                LeaxerError::UnknownNodeType {
                    node_id: node_id.clone(),
                    node_type: node.node_type.clone(),
                }
            })?;
            let info = implementation.info();
            if node.bypassed {
                Action::PassThrough(info)
            } else {
                Action::Execute(implementation, info)
            }
        };

        let mut inputs = PortValues::new();
        // Edges are applied in order, so the last edge into a handle wins.
        for edge in flow.incoming_edges(node_id) {
            let value = ctx
                .get_output(&edge.source)
                .and_then(|output| output.get(&edge.source_handle).cloned());
            if let Some(value) = value {
                inputs.insert(edge.target_handle.clone(), value);
            }
        }
        if let Action::Execute(_, info) | Action::PassThrough(info) = &action {
            for port in &info.inputs {
                if inputs.contains_key(&port.name) {
                    continue;
                }
                if let Some(literal) = node.data.get(&port.name) {
                    inputs.insert(port.name.clone(), literal.clone());
                }
            }
        }

        Ok(Invocation {
            job_id: self.spec.job_id,
            node_id: node_id.clone(),
            node_type: node.node_type.clone(),
            action,
            inputs,
            config: self.merge_config(node),
        })
    }

    /// Node data plus injected execution fields; injected fields win.
    fn merge_config(&self, node: &GraphNode) -> NodeConfig {
        let mut config = node.data.clone();
        config.insert(
            "job_id".to_string(),
            Value::String(self.spec.job_id.to_string()),
        );
        config.insert(
            "node_id".to_string(),
            Value::String(node.id.to_string()),
        );
        config.insert(
            "compute_backend".to_string(),
            Value::String(self.spec.compute_backend.to_string()),
        );
        config.insert(
            "caching_strategy".to_string(),
            Value::String(self.spec.caching_strategy.to_string()),
        );
        config
    }
}
