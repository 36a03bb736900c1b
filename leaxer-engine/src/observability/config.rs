//! Configuration types for logging.

use std::str::FromStr;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line output.
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Configuration for the tracing subscriber.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    log_format: LogFormat,
    /// Filter directives (e.g., "info", "warn,leaxer_engine=debug").
    log_filter: String,
    include_location: bool,
    include_target: bool,
    include_thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: "info".to_string(),
            include_location: false,
            include_target: true,
            include_thread_ids: false,
        }
    }
}

impl TracingConfig {
    /// Create a new builder.
    pub fn builder() -> TracingConfigBuilder {
        TracingConfigBuilder::default()
    }

    /// Create configuration from environment variables.
    ///
    /// - `LEAXER_LOG_FORMAT`: "json", "pretty" or "compact"
    /// - `LEAXER_LOG_LEVEL`, falling back to `RUST_LOG`: filter directives
    /// - `LEAXER_LOG_LOCATION`: "true"/"1" to include file and line
    /// - `LEAXER_LOG_THREAD_IDS`: "true"/"1" to include thread IDs
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| {
            lookup(key)
                .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };
        let defaults = Self::default();

        Self {
            log_format: lookup("LEAXER_LOG_FORMAT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.log_format),
            log_filter: lookup("LEAXER_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_filter),
            include_location: flag("LEAXER_LOG_LOCATION"),
            include_target: defaults.include_target,
            include_thread_ids: flag("LEAXER_LOG_THREAD_IDS"),
        }
    }

    /// Raise the filter to debug or trace for `-v` / `-vv`.
    ///
    /// A zero count leaves the configured filter untouched.
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        match verbose {
            0 => {}
            1 => self.log_filter = "debug".to_string(),
            _ => self.log_filter = "trace".to_string(),
        }
        self
    }

    /// Get the log format.
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Get the filter directives.
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Whether file and line are included.
    pub fn include_location(&self) -> bool {
        self.include_location
    }

    /// Whether the event target is included.
    pub fn include_target(&self) -> bool {
        self.include_target
    }

    /// Whether thread IDs are included.
    pub fn include_thread_ids(&self) -> bool {
        self.include_thread_ids
    }
}

/// Builder for [`TracingConfig`].
#[derive(Debug, Clone, Default)]
pub struct TracingConfigBuilder {
    log_format: Option<LogFormat>,
    log_filter: Option<String>,
    include_location: Option<bool>,
    include_target: Option<bool>,
    include_thread_ids: Option<bool>,
}

impl TracingConfigBuilder {
    /// Set the log format.
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    /// Shorthand for `log_format(LogFormat::Json)`.
    pub fn json_format(self, enable: bool) -> Self {
        if enable {
            self.log_format(LogFormat::Json)
        } else {
            self
        }
    }

    /// Set the filter directives.
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Include file and line.
    pub fn include_location(mut self, include: bool) -> Self {
        self.include_location = Some(include);
        self
    }

    /// Include the event target.
    pub fn include_target(mut self, include: bool) -> Self {
        self.include_target = Some(include);
        self
    }

    /// Include thread IDs.
    pub fn include_thread_ids(mut self, include: bool) -> Self {
        self.include_thread_ids = Some(include);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TracingConfig {
        let defaults = TracingConfig::default();
        TracingConfig {
            log_format: self.log_format.unwrap_or(defaults.log_format),
            log_filter: self.log_filter.unwrap_or(defaults.log_filter),
            include_location: self.include_location.unwrap_or(defaults.include_location),
            include_target: self.include_target.unwrap_or(defaults.include_target),
            include_thread_ids: self
                .include_thread_ids
                .unwrap_or(defaults.include_thread_ids),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = TracingConfig::builder()
            .json_format(true)
            .log_filter("warn,leaxer_engine=debug")
            .include_thread_ids(true)
            .build();
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.log_filter(), "warn,leaxer_engine=debug");
        assert!(config.include_thread_ids());
        assert!(config.include_target());
    }

    #[test]
    fn lookup_prefers_leaxer_level() {
        let config = TracingConfig::from_lookup(|key| match key {
            "LEAXER_LOG_FORMAT" => Some("PRETTY".to_string()),
            "LEAXER_LOG_LEVEL" => Some("debug".to_string()),
            "RUST_LOG" => Some("trace".to_string()),
            "LEAXER_LOG_LOCATION" => Some("1".to_string()),
            _ => None,
        });
        assert_eq!(config.log_format(), LogFormat::Pretty);
        assert_eq!(config.log_filter(), "debug");
        assert!(config.include_location());
    }

    #[test]
    fn unknown_format_falls_back() {
        let config = TracingConfig::from_lookup(|key| {
            (key == "LEAXER_LOG_FORMAT").then(|| "xml".to_string())
        });
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn verbosity() {
        assert_eq!(TracingConfig::default().with_verbosity(0).log_filter(), "info");
        assert_eq!(TracingConfig::default().with_verbosity(1).log_filter(), "debug");
        assert_eq!(TracingConfig::default().with_verbosity(3).log_filter(), "trace");
    }
}
