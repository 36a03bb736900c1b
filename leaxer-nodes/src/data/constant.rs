//! Constant node.

use leaxer_core::prelude::*;

/// Emits `data.value` on its `value` output.
///
/// # Example
/// ```json
/// { "id": "seed", "type": "Constant", "data": { "value": 42 } }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstantNode;

impl Node for ConstantNode {
    fn info(&self) -> NodeInfo {
        NodeInfo::new("Constant")
            .with_description("Emit the literal stored in the node's data")
            .with_outputs(vec![Port::output("value", PortType::Any)])
    }

    fn process<'a>(
        &'a self,
        ctx: NodeContext,
        _inputs: PortValues,
        config: NodeConfig,
    ) -> NodeFuture<'a> {
        Box::pin(async move {
            let value = config
                .get("value")
                .filter(|value| !value.is_null())
                .cloned()
                .ok_or_else(|| {
                    LeaxerError::node_failure(format!("{} has no 'value' in its data", ctx.node_id()))
                })?;
            Ok(PortValues::from([("value".to_string(), value)]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(value: Value) -> NodeConfig {
        let mut config = NodeConfig::new();
        config.insert("value".to_string(), value);
        config
    }

    #[tokio::test]
    async fn emits_value() {
        let ctx = NodeContext::detached(JobId::new(), "seed");
        let out = ConstantNode
            .process(ctx, PortValues::new(), config(json!({"w": 512})))
            .await
            .unwrap();
        assert_eq!(out["value"], json!({"w": 512}));
    }

    #[tokio::test]
    async fn missing_value_is_an_error() {
        let ctx = NodeContext::detached(JobId::new(), "seed");
        let err = ConstantNode
            .process(ctx, PortValues::new(), config(Value::Null))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E306");
        assert!(err.to_string().contains("seed"));
    }
}
