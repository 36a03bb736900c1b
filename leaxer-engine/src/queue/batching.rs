//! Model-path detection and batching of pending jobs.

use super::job::{Job, JobStatus};
use leaxer_core::graph::Graph;
use std::collections::HashMap;

/// Node types that load a model; their path field wins over any other reference.
const MODEL_LOADER_TYPES: &[&str] = &[
    "LoadModel",
    "CheckpointLoader",
    "LoadCheckpoint",
    "LoadLLM",
    "LoadDiffusionModel",
    "LoadLora",
];

/// Data fields that may hold a model path, in lookup order.
const MODEL_PATH_FIELDS: &[&str] = &["model_path", "model", "checkpoint", "ckpt_name", "path"];

const MODEL_EXTENSIONS: &[&str] = &[
    ".safetensors",
    ".gguf",
    ".ckpt",
    ".pt",
    ".pth",
    ".bin",
    ".onnx",
];

fn looks_like_model_file(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    MODEL_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Find the model artifact a graph depends on.
///
/// Scans nodes in ID order. A model-loader node with a non-empty path field
/// wins; otherwise the first string data value naming a model file is used.
pub fn detect_model_path(graph: &Graph) -> Option<String> {
    let from_loader = graph
        .nodes
        .values()
        .filter(|node| MODEL_LOADER_TYPES.contains(&node.node_type.as_str()))
        .find_map(|node| {
            MODEL_PATH_FIELDS
                .iter()
                .filter_map(|field| node.get_str(field))
                .find(|value| !value.trim().is_empty())
        });
    if let Some(path) = from_loader {
        return Some(path.to_string());
    }

    graph
        .nodes
        .values()
        .find_map(|node| {
            node.data
                .values()
                .filter_map(|value| value.as_str())
                .find(|value| looks_like_model_file(value))
        })
        .map(str::to_string)
}

/// Group pending jobs by model path, in place.
///
/// Running and terminal jobs keep their positions; pending jobs are rewritten
/// into the slots pending jobs already occupied. Groups appear in order of
/// first appearance, each keeping its jobs' relative order. Jobs without a
/// model path form one group of their own.
pub fn optimize_job_order(jobs: &mut [Job]) {
    let slots: Vec<usize> = jobs
        .iter()
        .enumerate()
        .filter(|(_, job)| job.status == JobStatus::Pending)
        .map(|(index, _)| index)
        .collect();
    if slots.len() < 2 {
        return;
    }

    let mut group_of: HashMap<Option<&str>, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for &slot in &slots {
        let key = jobs[slot].model_path.as_deref();
        let group = *group_of.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(slot);
    }
    if groups.len() == slots.len() {
        return;
    }

    let ordered: Vec<Job> = groups
        .into_iter()
        .flatten()
        .map(|slot| jobs[slot].clone())
        .collect();
    for (slot, job) in slots.into_iter().zip(ordered) {
        jobs[slot] = job;
    }
}
