//! Built-in nodes driven through the job queue.

use leaxer_core::graph::{Edge, Graph, GraphNode};
use leaxer_core::types::{JobId, NodeId};
use leaxer_engine::{EngineConfig, EngineEvent, EnqueueOptions, JobQueue};
use leaxer_nodes::builtin_registry;
use serde_json::json;
use std::time::Duration;
use tokio::sync::broadcast;

async fn run_to_end(
    rx: &mut broadcast::Receiver<EngineEvent>,
    job_id: JobId,
) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("job did not finish")
            .expect("event bus closed");
        let done = event.is_terminal() && event.job_id() == Some(job_id);
        events.push(event);
        if done {
            return events;
        }
    }
}

fn arithmetic(operation: &str) -> Graph {
    Graph::new()
        .with_node(GraphNode::new("six", "Constant").with_data("value", 6))
        .with_node(
            GraphNode::new("math", "Math")
                .with_data("operation", operation)
                .with_data("b", 4),
        )
        .with_node(GraphNode::new("show", "Preview"))
        .with_edge(Edge::new("six", "value", "math", "a"))
        .with_edge(Edge::new("math", "result", "show", "in"))
}

#[tokio::test]
async fn constant_math_preview() {
    let queue = JobQueue::new(builtin_registry(), EngineConfig::default());
    let mut rx = queue.subscribe();

    let job_id = queue
        .enqueue(vec![arithmetic("multiply")], EnqueueOptions::default())
        .await
        .unwrap()[0];
    let events = run_to_end(&mut rx, job_id).await;

    assert!(events.iter().any(|event| matches!(
        event,
        EngineEvent::NodeOutput { node_id, output, .. }
            if node_id.as_str() == "show" && output.get("preview") == Some(&json!(24.0))
    )));
    match events.last().unwrap() {
        EngineEvent::ExecutionComplete { outputs, .. } => {
            assert_eq!(outputs[&NodeId::new("show")]["out"], json!(24.0));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn division_by_zero_fails_the_math_node() {
    let queue = JobQueue::new(builtin_registry(), EngineConfig::default());
    let mut rx = queue.subscribe();

    let mut graph = arithmetic("divide");
    graph.add_node(
        GraphNode::new("math", "Math")
            .with_data("operation", "divide")
            .with_data("b", 0),
    );
    let job_id = queue
        .enqueue(vec![graph], EnqueueOptions::default())
        .await
        .unwrap()[0];
    let events = run_to_end(&mut rx, job_id).await;

    match events.last().unwrap() {
        EngineEvent::ExecutionError { node_id, error, .. } => {
            assert_eq!(node_id.as_ref().map(NodeId::as_str), Some("math"));
            assert!(error.contains("division by zero"), "{error}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn mismatched_port_types_are_rejected() {
    let queue = JobQueue::new(builtin_registry(), EngineConfig::default());
    let graph = Graph::new()
        .with_node(GraphNode::new("n", "Math").with_data("a", 1).with_data("b", 2))
        .with_node(GraphNode::new("join", "Concat").with_data("b", "x"))
        .with_edge(Edge::new("n", "result", "join", "a"));

    let err = queue
        .enqueue(vec![graph], EnqueueOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("E406"), "{err}");
}
