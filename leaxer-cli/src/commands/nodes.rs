//! Nodes command - list registered node types.

use anyhow::Result;
use leaxer_core::registry::NodeRegistry;
use leaxer_core::traits::{NodeInfo, Port};
use leaxer_nodes::builtin_registry;
use std::fmt::Write;

/// Run the nodes command.
pub fn run(json: bool) -> Result<()> {
    let registry = builtin_registry();
    if json {
        println!("{}", serde_json::to_string_pretty(&describe(&registry))?);
    } else {
        print!("{}", render(&registry));
    }
    Ok(())
}

fn describe(registry: &NodeRegistry) -> Vec<NodeInfo> {
    registry
        .node_types()
        .iter()
        .filter_map(|node_type| registry.info(node_type))
        .collect()
}

fn port_line(port: &Port) -> String {
    let mut line = format!("{}: {}", port.name, port.port_type);
    if let Some(default) = &port.default {
        let _ = write!(line, " = {default}");
    } else if !port.required {
        line.push('?');
    }
    line
}

fn render(registry: &NodeRegistry) -> String {
    let mut out = String::new();
    for info in describe(registry) {
        let _ = writeln!(out, "{}", info.node_type);
        if !info.description.is_empty() {
            let _ = writeln!(out, "  {}", info.description);
        }
        for port in &info.inputs {
            let _ = writeln!(out, "  in  {}", port_line(port));
        }
        for port in &info.outputs {
            let _ = writeln!(out, "  out {}", port_line(port));
        }
    }
    out
}
