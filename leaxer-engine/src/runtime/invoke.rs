//! Single node invocation: input checks, sandboxing and timeout.

use futures::FutureExt;
use leaxer_core::error::{LeaxerError, Result};
use leaxer_core::traits::{Node, NodeConfig, NodeContext, NodeInfo, PortValues, ProgressReporter};
use leaxer_core::types::{JobId, NodeId};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// How a node is handled when its layer runs.
pub(crate) enum Action {
    /// Group/Frame: succeeds with an empty output.
    Skip,
    /// Bypassed: forwards compatible inputs to outputs.
    PassThrough(NodeInfo),
    /// Regular execution.
    Execute(Arc<dyn Node>, NodeInfo),
}

/// A node ready to run: inputs gathered, config merged.
pub(crate) struct Invocation {
    pub(crate) job_id: JobId,
    pub(crate) node_id: NodeId,
    pub(crate) node_type: String,
    pub(crate) action: Action,
    pub(crate) inputs: PortValues,
    pub(crate) config: NodeConfig,
}

impl Invocation {
    /// Run the node, converting every failure mode into a `LeaxerError`.
    pub(crate) async fn run(
        self,
        cancel: CancellationToken,
        reporter: Arc<dyn ProgressReporter>,
        timeout: Option<Duration>,
    ) -> Result<PortValues> {
        let span = tracing::info_span!(
            "node_execution",
            job_id = %self.job_id,
            node_id = %self.node_id,
            node_type = %self.node_type,
        );

        async move {
            let Invocation {
                job_id,
                node_id,
                node_type,
                action,
                inputs,
                config,
            } = self;

            let (node, info) = match action {
                Action::Skip => return Ok(PortValues::new()),
                Action::PassThrough(info) => {
                    tracing::debug!("Node bypassed");
                    return Ok(pass_through(&info, &inputs));
                }
                Action::Execute(node, info) => (node, info),
            };

            let inputs = info.prepare_inputs(&node_id, inputs)?;
            let ctx = NodeContext::new(job_id, node_id.clone(), cancel, reporter);

            tracing::debug!("Executing node");
            let sandboxed = AssertUnwindSafe(async { node.process(ctx, inputs, config).await })
                .catch_unwind();

            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, sandboxed).await {
                    Ok(result) => result,
                    Err(_) => {
                        let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                        tracing::warn!(timeout_ms, "Node timed out");
                        return Err(LeaxerError::NodeTimeout {
                            job_id,
                            node_id,
                            node_type,
                            timeout_ms,
                        });
                    }
                },
                None => sandboxed.await,
            };

            match result {
                Ok(Ok(outputs)) => {
                    tracing::debug!(outputs = outputs.len(), "Node completed");
                    Ok(outputs)
                }
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "Node returned error");
                    let cause = match err {
                        LeaxerError::NodeFailure { cause } => cause,
                        other => other.to_string(),
                    };
                    Err(LeaxerError::NodeExecution {
                        job_id,
                        node_id,
                        node_type,
                        cause,
                    })
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(panic = %message, "Node panicked");
                    Err(LeaxerError::NodePanic {
                        job_id,
                        node_id,
                        node_type,
                        message,
                    })
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Output of a bypassed node.
///
/// Each output port receives the first input, in declared order, that has a
/// value and a compatible type. Outputs with no such input are left unset.
pub(crate) fn pass_through(info: &NodeInfo, inputs: &PortValues) -> PortValues {
    let mut outputs = PortValues::new();
    for output in &info.outputs {
        let forwarded = info.inputs.iter().find_map(|input| {
            if !input.port_type.is_compatible_with(output.port_type) {
                return None;
            }
            inputs.get(&input.name).filter(|value| !value.is_null())
        });
        if let Some(value) = forwarded {
            outputs.insert(output.name.clone(), value.clone());
        }
    }
    outputs
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
