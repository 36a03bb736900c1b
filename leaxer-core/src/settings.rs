//! Execution settings carried by jobs and injected into node config.

use crate::error::LeaxerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compute backend a job should run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeBackend {
    /// Let nodes choose.
    #[default]
    Auto,
    /// CPU only.
    Cpu,
    /// NVIDIA CUDA.
    Cuda,
    /// Apple Metal.
    Metal,
    /// Vulkan.
    Vulkan,
}

impl ComputeBackend {
    /// Lowercase name, as injected into node config.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
            Self::Metal => "metal",
            Self::Vulkan => "vulkan",
        }
    }
}

impl fmt::Display for ComputeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComputeBackend {
    type Err = LeaxerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "metal" => Ok(Self::Metal),
            "vulkan" => Ok(Self::Vulkan),
            other => Err(LeaxerError::ConfigValue {
                field: "compute_backend".to_string(),
                cause: format!("unknown backend '{other}'"),
            }),
        }
    }
}

/// Whether nodes may cache intermediate results across jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachingStrategy {
    /// Node decides.
    #[default]
    Auto,
    /// Never cache.
    Disabled,
    /// Cache whenever possible.
    Aggressive,
}

impl CachingStrategy {
    /// Lowercase name, as injected into node config.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Disabled => "disabled",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for CachingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CachingStrategy {
    type Err = LeaxerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "disabled" | "off" => Ok(Self::Disabled),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(LeaxerError::ConfigValue {
                field: "caching_strategy".to_string(),
                cause: format!("unknown caching strategy '{other}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backend() {
        assert_eq!("CUDA".parse::<ComputeBackend>().unwrap(), ComputeBackend::Cuda);
        assert!("tpu".parse::<ComputeBackend>().is_err());
        assert_eq!(ComputeBackend::default().to_string(), "auto");
    }

    #[test]
    fn serde_lowercase() {
        let json = serde_json::to_string(&CachingStrategy::Aggressive).unwrap();
        assert_eq!(json, "\"aggressive\"");
        let parsed: ComputeBackend = serde_json::from_str("\"metal\"").unwrap();
        assert_eq!(parsed, ComputeBackend::Metal);
    }
}
