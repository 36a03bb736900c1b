//! Node trait and port contracts.

use super::context::NodeContext;
use crate::error::{LeaxerError, Result};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Values flowing through ports, keyed by port name.
pub type PortValues = HashMap<String, Value>;

/// Node configuration: static node data merged with execution fields.
pub type NodeConfig = Map<String, Value>;

/// Declared type of a port.
///
/// Payload types (`Image`, `Latent`, `Model`, `Conditioning`, `Tensor`) are
/// opaque to the engine; it only checks that a value is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortType {
    /// Any value; compatible with every other type.
    Any,
    /// UTF-8 string.
    String,
    /// Integral number.
    Integer,
    /// Any number.
    Float,
    /// Boolean.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
    /// Image payload or handle.
    Image,
    /// Latent-space payload.
    Latent,
    /// Loaded model handle.
    Model,
    /// Text conditioning payload.
    Conditioning,
    /// Raw tensor payload.
    Tensor,
}

impl PortType {
    /// Whether an output of type `self` may feed an input of type `other`.
    ///
    /// Types must match exactly unless either side is `Any`; nothing is coerced.
    pub fn is_compatible_with(self, other: PortType) -> bool {
        self == other || self == PortType::Any || other == PortType::Any
    }

    /// Whether a runtime value satisfies this type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            PortType::Any => true,
            PortType::String => value.is_string(),
            PortType::Integer => value.is_i64() || value.is_u64(),
            PortType::Float => value.is_number(),
            PortType::Boolean => value.is_boolean(),
            PortType::Array => value.is_array(),
            PortType::Object => value.is_object(),
            PortType::Image
            | PortType::Latent
            | PortType::Model
            | PortType::Conditioning
            | PortType::Tensor => !value.is_null(),
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// JSON kind of a value, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    /// Input port.
    Input,
    /// Output port.
    Output,
}

/// A named input or output of a node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port name, matched against edge handles.
    pub name: String,
    /// Port direction.
    pub direction: PortDirection,
    /// Declared value type.
    #[serde(rename = "type")]
    pub port_type: PortType,
    /// Whether an input must be supplied. Always false for outputs.
    pub required: bool,
    /// Value used when an optional input is not connected or configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Description of the port.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Port {
    /// Create a required input port.
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Input,
            port_type,
            required: true,
            default: None,
            description: String::new(),
        }
    }

    /// Create an output port.
    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Output,
            port_type,
            required: false,
            default: None,
            description: String::new(),
        }
    }

    /// Set the port as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Make the input optional with a default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    /// Set the port description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }
}

/// Metadata about a node type: its name and port contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Type name used in graphs (e.g., "LoadModel").
    #[serde(rename = "type")]
    pub node_type: String,
    /// Description of what the node does.
    #[serde(default)]
    pub description: String,
    /// Input ports.
    pub inputs: Vec<Port>,
    /// Output ports.
    pub outputs: Vec<Port>,
}

impl NodeInfo {
    /// Create node info with no ports.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Set input ports.
    pub fn with_inputs(mut self, inputs: Vec<Port>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set output ports.
    pub fn with_outputs(mut self, outputs: Vec<Port>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Get an input port by name.
    pub fn get_input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Get an output port by name.
    pub fn get_output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Check resolved inputs against the declared input ports.
    ///
    /// Fills defaults for absent optional inputs, then rejects missing
    /// required inputs and values whose JSON kind does not match the port type.
    pub fn prepare_inputs(
        &self,
        node_id: &NodeId,
        mut inputs: PortValues,
    ) -> Result<PortValues> {
        for port in &self.inputs {
            match inputs.get(&port.name) {
                Some(value) if !value.is_null() => {
                    if !port.port_type.accepts(value) {
                        return Err(LeaxerError::InputType {
                            node_id: node_id.clone(),
                            port: port.name.clone(),
                            expected: port.port_type.to_string(),
                            actual: value_kind(value).to_string(),
                        });
                    }
                }
                _ => {
                    if let Some(default) = &port.default {
                        inputs.insert(port.name.clone(), default.clone());
                    } else if port.required {
                        return Err(LeaxerError::MissingInput {
                            node_id: node_id.clone(),
                            port: port.name.clone(),
                        });
                    }
                }
            }
        }
        Ok(inputs)
    }
}

/// A boxed future for async node processing.
pub type NodeFuture<'a> = Pin<Box<dyn Future<Output = Result<PortValues>> + Send + 'a>>;

/// The contract every node type implements.
///
/// The engine resolves and validates inputs against [`NodeInfo::inputs`]
/// before calling [`process`](Node::process), so implementations can rely on
/// required inputs being present and well-typed. A node returns exactly one
/// terminal result; intermediate progress goes through
/// [`NodeContext::report_step`].
///
/// Any retry policy (downloads, network calls) belongs inside `process`.
///
/// # Example
///
/// ```ignore
/// use leaxer_core::prelude::*;
///
/// struct Upper;
///
/// impl Node for Upper {
///     fn info(&self) -> NodeInfo {
///         NodeInfo::new("Upper")
///             .with_inputs(vec![Port::input("text", PortType::String)])
///             .with_outputs(vec![Port::output("text", PortType::String)])
///     }
///
///     fn process<'a>(
///         &'a self,
///         _ctx: NodeContext,
///         inputs: PortValues,
///         _config: NodeConfig,
///     ) -> NodeFuture<'a> {
///         Box::pin(async move {
///             let text = inputs["text"].as_str().unwrap_or_default().to_uppercase();
///             Ok(PortValues::from([("text".to_string(), text.into())]))
///         })
///     }
/// }
/// ```
pub trait Node: Send + Sync {
    /// Get the node's type name and port contract.
    fn info(&self) -> NodeInfo;

    /// Process one invocation.
    fn process<'a>(
        &'a self,
        ctx: NodeContext,
        inputs: PortValues,
        config: NodeConfig,
    ) -> NodeFuture<'a>;

    /// Called when the engine is shutting down.
    fn shutdown(&self) {}
}
