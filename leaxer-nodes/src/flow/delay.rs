//! Delay node.
//!
//! Sleeps `steps` x `step_ms`, reporting a step after each interval. Stops
//! early with an error when the job is cancelled.

use leaxer_core::prelude::*;
use std::time::Duration;

const DEFAULT_STEPS: u64 = 4;
const DEFAULT_STEP_MS: u64 = 250;

/// Forwards `in` to `out` after a stepped delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelayNode;

impl Node for DelayNode {
    fn info(&self) -> NodeInfo {
        NodeInfo::new("Delay")
            .with_description("Wait in steps, reporting progress, then forward the input")
            .with_inputs(vec![
                Port::input("in", PortType::Any).optional(),
                Port::input("steps", PortType::Integer).with_default(DEFAULT_STEPS),
                Port::input("step_ms", PortType::Integer).with_default(DEFAULT_STEP_MS),
            ])
            .with_outputs(vec![Port::output("out", PortType::Any)])
    }

    fn process<'a>(
        &'a self,
        ctx: NodeContext,
        inputs: PortValues,
        _config: NodeConfig,
    ) -> NodeFuture<'a> {
        Box::pin(async move {
            let steps = inputs
                .get("steps")
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_STEPS);
            let total = u32::try_from(steps).unwrap_or(u32::MAX);
            let step = Duration::from_millis(
                inputs
                    .get("step_ms")
                    .and_then(Value::as_u64)
                    .unwrap_or(DEFAULT_STEP_MS),
            );

            for current in 1..=total {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        tracing::debug!(step = current, "Delay interrupted");
                        return Err(LeaxerError::node_failure("cancelled"));
                    }
                    _ = tokio::time::sleep(step) => {}
                }
                ctx.report_step(current, total);
            }

            let value = inputs.get("in").cloned().unwrap_or(Value::Null);
            Ok(PortValues::from([("out".to_string(), value)]))
        })
    }
}
