//! Logging setup for Leaxer processes.
//!
//! Output format is controlled via `LEAXER_LOG_FORMAT`:
//! - `json` - one JSON object per event
//! - `pretty` - multi-line, human-readable
//! - `compact` - single line (default)
//!
//! Logs go to stderr so that command output on stdout stays machine-readable.
//!
//! # Example
//!
//! ```ignore
//! use leaxer_engine::observability::{TracingConfig, init_tracing};
//!
//! let _guard = init_tracing(TracingConfig::from_env())?;
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::{TracingGuard, init_tracing};
