//! Concat node (string combination).

use leaxer_core::prelude::*;

/// Joins inputs `a` and `b` with `data.separator` (empty by default).
///
/// # Ports
/// - Input: "a", "b" - Strings to join
/// - Output: "text" - The joined string
#[derive(Debug, Default, Clone, Copy)]
pub struct ConcatNode;

impl ConcatNode {
    fn join(a: &str, b: &str, separator: &str) -> String {
        let mut joined = String::with_capacity(a.len() + separator.len() + b.len());
        joined.push_str(a);
        joined.push_str(separator);
        joined.push_str(b);
        joined
    }
}

impl Node for ConcatNode {
    fn info(&self) -> NodeInfo {
        NodeInfo::new("Concat")
            .with_description("Join two strings with a separator")
            .with_inputs(vec![
                Port::input("a", PortType::String),
                Port::input("b", PortType::String),
            ])
            .with_outputs(vec![Port::output("text", PortType::String)])
    }

    fn process<'a>(
        &'a self,
        _ctx: NodeContext,
        inputs: PortValues,
        config: NodeConfig,
    ) -> NodeFuture<'a> {
        Box::pin(async move {
            let a = inputs.get("a").and_then(Value::as_str).unwrap_or_default();
            let b = inputs.get("b").and_then(Value::as_str).unwrap_or_default();
            let separator = config
                .get("separator")
                .and_then(Value::as_str)
                .unwrap_or_default();

            let text = Self::join(a, b, separator);
            tracing::debug!(len = text.len(), "Concat: built string");
            Ok(PortValues::from([("text".to_string(), Value::String(text))]))
        })
    }
}
