//! Engine configuration.
//!
//! Resolution order: built-in defaults, then an optional JSON file, then
//! `LEAXER_*` environment variables.

use leaxer_core::error::{LeaxerError, Result};
use leaxer_core::settings::{CachingStrategy, ComputeBackend};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default grace window between a stop request and a forced stop.
pub const DEFAULT_ABORT_GRACE_MS: u64 = 5_000;

/// Configuration for the runtime and job queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum nodes of one layer executing at the same time.
    ///
    /// Set to 1 for sequential execution (debugging).
    pub max_concurrent_nodes: usize,
    /// Grace window for a graceful stop before the runtime is force-stopped.
    pub abort_grace_ms: u64,
    /// Reorder pending jobs so jobs sharing a model run back to back.
    pub batch_by_model: bool,
    /// Per-node execution timeout. `None` lets nodes run indefinitely.
    pub node_timeout_ms: Option<u64>,
    /// Default compute backend for jobs that do not set one.
    pub compute_backend: ComputeBackend,
    /// Default caching strategy for jobs that do not set one.
    pub caching_strategy: CachingStrategy,
    /// Events buffered per subscriber before a slow subscriber lags.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_nodes: 4,
            abort_grace_ms: DEFAULT_ABORT_GRACE_MS,
            batch_by_model: true,
            node_timeout_ms: None,
            compute_backend: ComputeBackend::Auto,
            caching_strategy: CachingStrategy::Auto,
            event_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `LEAXER_MAX_CONCURRENT_NODES`: Maximum concurrent nodes per layer
    /// - `LEAXER_ABORT_GRACE_MS`: Abort grace window in milliseconds
    /// - `LEAXER_BATCH_BY_MODEL`: Enable model batching (true/false)
    /// - `LEAXER_NODE_TIMEOUT_MS`: Node timeout in milliseconds (0 disables)
    /// - `LEAXER_COMPUTE_BACKEND`: auto, cpu, cuda, metal, vulkan
    /// - `LEAXER_CACHING_STRATEGY`: auto, disabled, aggressive
    /// - `LEAXER_EVENT_CAPACITY`: Event buffer per subscriber
    ///
    /// Unset or unparseable variables keep their default.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Load configuration from a JSON file. Missing fields keep their default.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LeaxerError::Io {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| LeaxerError::ConfigValue {
            field: path.display().to_string(),
            cause: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an optional file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply overrides from a variable lookup.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            let raw = lookup(key)?;
            match raw.trim().parse::<T>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(key = %key, value = %raw, "Ignoring unparseable setting");
                    None
                }
            }
        }

        if let Some(max) = parsed::<usize>(&lookup, "LEAXER_MAX_CONCURRENT_NODES") {
            self = self.with_max_concurrent_nodes(max);
        }
        if let Some(ms) = parsed::<u64>(&lookup, "LEAXER_ABORT_GRACE_MS") {
            self.abort_grace_ms = ms;
        }
        if let Some(enabled) = parsed::<bool>(&lookup, "LEAXER_BATCH_BY_MODEL") {
            self.batch_by_model = enabled;
        }
        if let Some(ms) = parsed::<u64>(&lookup, "LEAXER_NODE_TIMEOUT_MS") {
            self.node_timeout_ms = (ms > 0).then_some(ms);
        }
        if let Some(backend) = parsed::<ComputeBackend>(&lookup, "LEAXER_COMPUTE_BACKEND") {
            self.compute_backend = backend;
        }
        if let Some(strategy) = parsed::<CachingStrategy>(&lookup, "LEAXER_CACHING_STRATEGY") {
            self.caching_strategy = strategy;
        }
        if let Some(capacity) = parsed::<usize>(&lookup, "LEAXER_EVENT_CAPACITY") {
            self.event_capacity = capacity.max(1);
        }
        self
    }

    /// Reject values no engine can run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_nodes == 0 {
            return Err(LeaxerError::ConfigValue {
                field: "max_concurrent_nodes".to_string(),
                cause: "must be at least 1".to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(LeaxerError::ConfigValue {
                field: "event_capacity".to_string(),
                cause: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Grace window as a `Duration`.
    pub fn abort_grace(&self) -> Duration {
        Duration::from_millis(self.abort_grace_ms)
    }

    /// Node timeout as a `Duration`.
    pub fn node_timeout(&self) -> Option<Duration> {
        self.node_timeout_ms.map(Duration::from_millis)
    }

    /// Set maximum concurrent nodes per layer.
    pub fn with_max_concurrent_nodes(mut self, max: usize) -> Self {
        self.max_concurrent_nodes = max.max(1);
        self
    }

    /// Set the abort grace window.
    pub fn with_abort_grace(mut self, grace: Duration) -> Self {
        self.abort_grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enable or disable model batching.
    pub fn with_batch_by_model(mut self, enabled: bool) -> Self {
        self.batch_by_model = enabled;
        self
    }

    /// Set the node timeout.
    pub fn with_node_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.node_timeout_ms = Some(timeout_ms);
        self
    }

    /// Set the default compute backend.
    pub fn with_compute_backend(mut self, backend: ComputeBackend) -> Self {
        self.compute_backend = backend;
        self
    }

    /// Set the default caching strategy.
    pub fn with_caching_strategy(mut self, strategy: CachingStrategy) -> Self {
        self.caching_strategy = strategy;
        self
    }

    /// Set the event buffer size.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
