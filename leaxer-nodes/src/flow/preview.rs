//! Preview node.

use leaxer_core::prelude::*;

/// Sink that publishes its input as a preview and returns it unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreviewNode;

impl Node for PreviewNode {
    fn info(&self) -> NodeInfo {
        NodeInfo::new("Preview")
            .with_description("Show a value while the job runs")
            .with_inputs(vec![Port::input("in", PortType::Any)])
            .with_outputs(vec![Port::output("out", PortType::Any)])
    }

    fn process<'a>(
        &'a self,
        ctx: NodeContext,
        inputs: PortValues,
        _config: NodeConfig,
    ) -> NodeFuture<'a> {
        Box::pin(async move {
            let value = inputs.get("in").cloned().unwrap_or(Value::Null);
            ctx.report_preview(value.clone());
            Ok(PortValues::from([("out".to_string(), value)]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaxer_core::traits::ProgressReporter;
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct Previews(Mutex<Vec<Value>>);

    impl ProgressReporter for Previews {
        fn step(&self, _node_id: &NodeId, _current: u32, _total: u32) {}

        fn preview(&self, _node_id: &NodeId, value: Value) {
            self.0.lock().unwrap().push(value);
        }
    }

    #[tokio::test]
    async fn previews_and_returns_input() {
        let previews = Arc::new(Previews::default());
        let ctx = NodeContext::new(
            JobId::new(),
            NodeId::new("show"),
            CancellationToken::new(),
            previews.clone(),
        );
        let inputs = PortValues::from([("in".to_string(), json!([1, 2, 3]))]);

        let out = PreviewNode
            .process(ctx, inputs, NodeConfig::new())
            .await
            .unwrap();

        assert_eq!(out["out"], json!([1, 2, 3]));
        assert_eq!(*previews.0.lock().unwrap(), vec![json!([1, 2, 3])]);
    }
}
