//! Math node (float arithmetic).

use leaxer_core::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Arithmetic operation selected by `data.operation`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MathOperation {
    /// `a + b`
    #[default]
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`; a zero divisor is an error.
    Divide,
}

impl MathOperation {
    /// Apply the operation.
    pub fn apply(self, a: f64, b: f64) -> Result<f64> {
        match self {
            Self::Add => Ok(a + b),
            Self::Subtract => Ok(a - b),
            Self::Multiply => Ok(a * b),
            Self::Divide if b == 0.0 => Err(LeaxerError::node_failure("division by zero")),
            Self::Divide => Ok(a / b),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }
}

impl fmt::Display for MathOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MathOperation {
    type Err = LeaxerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "add" | "+" => Ok(Self::Add),
            "subtract" | "sub" | "-" => Ok(Self::Subtract),
            "multiply" | "mul" | "*" => Ok(Self::Multiply),
            "divide" | "div" | "/" => Ok(Self::Divide),
            other => Err(LeaxerError::node_failure(format!(
                "unknown math operation '{other}'"
            ))),
        }
    }
}

/// Applies `data.operation` to inputs `a` and `b`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MathNode;

impl Node for MathNode {
    fn info(&self) -> NodeInfo {
        NodeInfo::new("Math")
            .with_description("Add, subtract, multiply or divide two numbers")
            .with_inputs(vec![
                Port::input("a", PortType::Float),
                Port::input("b", PortType::Float),
            ])
            .with_outputs(vec![Port::output("result", PortType::Float)])
    }

    fn process<'a>(
        &'a self,
        _ctx: NodeContext,
        inputs: PortValues,
        config: NodeConfig,
    ) -> NodeFuture<'a> {
        Box::pin(async move {
            let operation = match config.get("operation").and_then(Value::as_str) {
                Some(name) => name.parse()?,
                None => MathOperation::default(),
            };
            let a = inputs.get("a").and_then(Value::as_f64).unwrap_or_default();
            let b = inputs.get("b").and_then(Value::as_f64).unwrap_or_default();

            let result = operation.apply(a, b)?;
            Ok(PortValues::from([("result".to_string(), json!(result))]))
        })
    }
}
