//! Validate command - check a graph file and print its layers.

use super::load_graph;
use anyhow::Result;
use leaxer_core::registry::NodeRegistry;
use leaxer_engine::scheduler::{Layers, sort_and_validate};
use leaxer_nodes::builtin_registry;
use std::fmt::Write;
use std::path::Path;

/// Run the validate command.
pub fn run(file: &Path) -> Result<()> {
    tracing::info!(file = %file.display(), "Validating graph");
    let registry = builtin_registry();

    match check(file, &registry) {
        Ok(layers) => {
            print!("{}", render_layers(&layers));
            println!("✓ Validation PASSED");
            Ok(())
        }
        Err(err) => {
            println!("✗ Validation FAILED");
            println!("  {err:#}");
            anyhow::bail!("Graph validation failed");
        }
    }
}

/// Load and validate a graph against `registry`.
pub fn check(file: &Path, registry: &NodeRegistry) -> Result<Layers> {
    let graph = load_graph(file)?;
    for (node_id, handle) in graph.duplicate_target_handles() {
        println!("⚠ WARNING: {node_id}.{handle} has more than one incoming edge; the last one wins");
    }
    Ok(sort_and_validate(&graph, registry)?)
}

fn render_layers(layers: &Layers) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} nodes in {} layers:",
        layers.node_count(),
        layers.len()
    );
    for (index, layer) in layers.iter().enumerate() {
        let names: Vec<&str> = layer.iter().map(|id| id.as_str()).collect();
        let _ = writeln!(out, "  {index}: {}", names.join(", "));
    }
    out
}
