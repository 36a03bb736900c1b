//! Common test utilities for integration tests.

#![allow(dead_code)]

use leaxer_core::graph::{Edge, Graph, GraphNode};
use leaxer_core::registry::NodeRegistry;
use leaxer_core::traits::{
    Node, NodeConfig, NodeContext, NodeFuture, NodeInfo, Port, PortType, PortValues,
};
use leaxer_core::types::JobId;
use leaxer_core::LeaxerError;
use leaxer_engine::events::EngineEvent;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// What a recorded node did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Start,
    End,
}

/// Shared, totally ordered log of node starts and ends.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<(String, Mark)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, node_id: &str, mark: Mark) {
        self.entries.lock().push((node_id.to_string(), mark));
    }

    pub fn entries(&self) -> Vec<(String, Mark)> {
        self.entries.lock().clone()
    }

    /// Position of a mark in the log.
    pub fn position(&self, node_id: &str, mark: Mark) -> Option<usize> {
        self.entries
            .lock()
            .iter()
            .position(|(id, m)| id == node_id && *m == mark)
    }

    pub fn started(&self, node_id: &str) -> bool {
        self.position(node_id, Mark::Start).is_some()
    }

    /// Node IDs in start order.
    pub fn start_order(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, m)| *m == Mark::Start)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// How a [`TestNode`] behaves.
#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Forward `in` (or `value`) to `out`.
    Pass,
    /// Return a business error.
    Fail,
    /// Panic inside `process`.
    Panic,
    /// Sleep for `data.ms` in steps, stopping early when cancelled.
    Slow,
    /// Sleep for a long time, ignoring cancellation.
    Stuck,
    /// Block the worker thread for `data.ms`, ignoring cancellation.
    Blocking,
    /// Return the merged config.
    Inspect,
}

/// Configurable node that records its start and end.
pub struct TestNode {
    node_type: &'static str,
    behaviour: Behaviour,
    recorder: Recorder,
}

impl TestNode {
    pub fn new(node_type: &'static str, behaviour: Behaviour, recorder: Recorder) -> Self {
        Self {
            node_type,
            behaviour,
            recorder,
        }
    }
}

fn millis(config: &NodeConfig, default: u64) -> u64 {
    config.get("ms").and_then(Value::as_u64).unwrap_or(default)
}

impl Node for TestNode {
    fn info(&self) -> NodeInfo {
        let info = NodeInfo::new(self.node_type).with_outputs(vec![Port::output("out", PortType::Any)]);
        match self.node_type {
            "LoadModel" => NodeInfo::new("LoadModel")
                .with_inputs(vec![Port::input("model_path", PortType::String).with_default("")])
                .with_outputs(vec![Port::output("model", PortType::Model)]),
            "SaveImage" => NodeInfo::new("SaveImage")
                .with_inputs(vec![Port::input("image", PortType::Image)])
                .with_outputs(vec![Port::output("saved", PortType::String)]),
            "Generate" => NodeInfo::new("Generate")
                .with_inputs(vec![
                    Port::input("model", PortType::Model),
                    Port::input("steps", PortType::Integer).with_default(4),
                ])
                .with_outputs(vec![Port::output("image", PortType::Image)]),
            _ => info.with_inputs(vec![
                Port::input("in", PortType::Any).optional(),
                Port::input("b", PortType::Any).optional(),
                Port::input("value", PortType::Any).optional(),
            ]),
        }
    }

    fn process<'a>(
        &'a self,
        ctx: NodeContext,
        inputs: PortValues,
        config: NodeConfig,
    ) -> NodeFuture<'a> {
        Box::pin(async move {
            let node_id = ctx.node_id().to_string();
            self.recorder.mark(&node_id, Mark::Start);

            let result = match self.behaviour {
                Behaviour::Pass => Ok(pass(self.node_type, &node_id, &inputs)),
                Behaviour::Fail => Err(LeaxerError::node_failure(format!("{node_id} refused"))),
                Behaviour::Panic => panic!("{node_id} exploded"),
                Behaviour::Slow => {
                    let total = 4u32;
                    let step = Duration::from_millis(millis(&config, 200) / u64::from(total));
                    for current in 1..=total {
                        tokio::select! {
                            _ = ctx.cancelled() => {
                                self.recorder.mark(&node_id, Mark::End);
                                return Err(LeaxerError::node_failure("cancelled"));
                            }
                            _ = tokio::time::sleep(step) => {}
                        }
                        ctx.report_step(current, total);
                    }
                    Ok(pass(self.node_type, &node_id, &inputs))
                }
                Behaviour::Stuck => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(PortValues::new())
                }
                Behaviour::Blocking => {
                    std::thread::sleep(Duration::from_millis(millis(&config, 1_000)));
                    Ok(PortValues::new())
                }
                Behaviour::Inspect => Ok(PortValues::from([(
                    "out".to_string(),
                    Value::Object(config.clone()),
                )])),
            };

            self.recorder.mark(&node_id, Mark::End);
            result
        })
    }
}

fn pass(node_type: &str, node_id: &str, inputs: &PortValues) -> PortValues {
    match node_type {
        "LoadModel" => PortValues::from([(
            "model".to_string(),
            inputs.get("model_path").cloned().unwrap_or(Value::Null),
        )]),
        "Generate" => PortValues::from([("image".to_string(), json!(format!("image-from-{node_id}")))]),
        "SaveImage" => PortValues::from([("saved".to_string(), inputs["image"].clone())]),
        _ => {
            let value = inputs
                .get("in")
                .or_else(|| inputs.get("value"))
                .cloned()
                .unwrap_or_else(|| json!(node_id));
            PortValues::from([("out".to_string(), value)])
        }
    }
}

/// Registry with every test node type.
pub fn test_registry(recorder: &Recorder) -> NodeRegistry {
    let registry = NodeRegistry::new();
    for (node_type, behaviour) in [
        ("Pass", Behaviour::Pass),
        ("Fail", Behaviour::Fail),
        ("Panic", Behaviour::Panic),
        ("Slow", Behaviour::Slow),
        ("Stuck", Behaviour::Stuck),
        ("Blocking", Behaviour::Blocking),
        ("Inspect", Behaviour::Inspect),
        ("LoadModel", Behaviour::Pass),
        ("Generate", Behaviour::Pass),
        ("SaveImage", Behaviour::Pass),
    ] {
        registry.register(TestNode::new(node_type, behaviour, recorder.clone()));
    }
    registry
}

/// Same as [`test_registry`] but `Generate` fails.
pub fn failing_generate_registry(recorder: &Recorder) -> NodeRegistry {
    let registry = test_registry(recorder);
    registry.register(TestNode::new("Generate", Behaviour::Fail, recorder.clone()));
    registry
}

pub fn node(id: &str, node_type: &str) -> GraphNode {
    GraphNode::new(id, node_type)
}

pub fn edge(from: &str, to: &str) -> Edge {
    Edge::new(from, "out", to, "in")
}

/// load -> generate -> save
pub fn linear_generation(model: &str) -> Graph {
    Graph::new()
        .with_node(node("load", "LoadModel").with_data("model_path", model))
        .with_node(node("gen", "Generate"))
        .with_node(node("save", "SaveImage"))
        .with_edge(Edge::new("load", "model", "gen", "model"))
        .with_edge(Edge::new("gen", "image", "save", "image"))
}

/// Two independent branches converging on `sink`.
pub fn converging(branch_type: &str) -> Graph {
    Graph::new()
        .with_node(node("left", branch_type).with_data("ms", 80))
        .with_node(node("right", branch_type).with_data("ms", 20))
        .with_node(node("sink", "Pass"))
        .with_edge(Edge::new("left", "out", "sink", "in"))
        .with_edge(Edge::new("right", "out", "sink", "b"))
}

/// A single node of `node_type` with `ms` set.
pub fn single(node_type: &str, ms: u64) -> Graph {
    Graph::new().with_node(node("only", node_type).with_data("ms", ms))
}

/// A graph that loads `model` and passes it on; runs instantly.
pub fn model_job(model: Option<&str>) -> Graph {
    let mut graph = Graph::new().with_node(node("out", "Pass"));
    if let Some(model) = model {
        graph.add_node(node("load", "LoadModel").with_data("model_path", model));
        graph.add_edge(Edge::new("load", "model", "out", "in"));
    }
    graph
}

/// Receive events until the terminal event for `job_id`, returning all of them.
pub async fn events_until_terminal(
    rx: &mut broadcast::Receiver<EngineEvent>,
    job_id: JobId,
) -> Vec<EngineEvent> {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for terminal event");
        match event {
            Ok(event) => {
                let done = event.is_terminal() && event.job_id() == Some(job_id);
                seen.push(event);
                if done {
                    return seen;
                }
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
        }
    }
}

/// Terminal events for `job_id` among `events`.
pub fn terminal_events(events: &[EngineEvent], job_id: JobId) -> Vec<EngineEvent> {
    events
        .iter()
        .filter(|e| e.is_terminal() && e.job_id() == Some(job_id))
        .cloned()
        .collect()
}
