//! CLI command implementations.

pub mod nodes;
pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use leaxer_core::graph::Graph;
use std::path::Path;

/// Read a graph file; `.yaml`/`.yml` are parsed as YAML, anything else as JSON.
pub fn load_graph(path: &Path) -> Result<Graph> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph file {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let graph = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML graph in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON graph in {}", path.display()))?
    };
    Ok(graph)
}
