//! Runtime configuration - TOML file plus `TFFI_*` environment overrides

use std::fs;
use std::path::Path;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logging::{self, LogConfig, LogFormat, LogOutput};

#[cfg(test)]
mod tests;

static CURRENT: OnceCell<RuntimeConfig> = OnceCell::new();

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub log: LogSection,

    #[serde(default)]
    pub types: TypeTableSection,

    #[serde(default)]
    pub equality: EqualitySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSection {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormatName,

    /// Directory for rolling log files; stderr when absent
    #[serde(default)]
    pub directory: Option<String>,

    #[serde(default = "default_false")]
    pub span_events: bool,

    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatName {
    Pretty,
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTableSection {
    /// Slots reserved in the type table when it is first built
    #[serde(default = "default_capacity")]
    pub initial_capacity: usize,

    #[serde(default = "default_true")]
    pub log_registrations: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualitySection {
    /// Record graph-node pairing failures and keep walking instead of stopping
    /// Queue leaf mismatches so the earliest one in traversal order is reported
    #[serde(default = "default_false")]
    pub defer_fails: bool,

    /// Maximum lines per side in assert-mode mismatch dumps
    #[serde(default = "default_render_limit")]
    pub assert_render_limit: usize,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormatName::Compact,
            directory: None,
            span_events: false,
            filter: None,
        }
    }
}

impl Default for TypeTableSection {
    fn default() -> Self {
        Self {
            initial_capacity: default_capacity(),
            log_registrations: true,
        }
    }
}

impl Default for EqualitySection {
    fn default() -> Self {
        Self {
            defer_fails: false,
            assert_render_limit: default_render_limit(),
        }
    }
}

fn default_true() -> bool { true }
fn default_false() -> bool { false }
fn default_level() -> String { "info".to_string() }
fn default_capacity() -> usize { 256 }
fn default_render_limit() -> usize { 200 }

impl RuntimeConfig {
    /// Parse configuration from TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::value_error(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::runtime_error(format!("Failed to read config: {}", e)))?;

        Self::from_toml_str(&content)
    }

    /// Apply `TFFI_*` environment variables on top of this configuration
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("TFFI_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Ok(directory) = std::env::var("TFFI_LOG_FILE") {
            self.log.directory = Some(directory);
        }
        if std::env::var("TFFI_LOG_JSON").is_ok() {
            self.log.format = LogFormatName::Json;
        }
        if let Ok(value) = std::env::var("TFFI_SEQUAL_DEFER_FAILS") {
            self.equality.defer_fails = matches!(value.as_str(), "1" | "true" | "yes");
        }
        self
    }

    /// Translate the `[log]` section into a logger configuration
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::new()
            .with_level(logging::parse_level(&self.log.level).unwrap_or(tracing::Level::INFO))
            .with_format(match self.log.format {
                LogFormatName::Pretty => LogFormat::Pretty,
                LogFormatName::Compact => LogFormat::Compact,
                LogFormatName::Json => LogFormat::Json,
            })
            .with_span_events(self.log.span_events);

        if let Some(directory) = &self.log.directory {
            config = config.with_output(LogOutput::File {
                directory: directory.clone(),
                prefix: "tensor_ffi.log".to_string(),
            });
        }
        if let Some(filter) = &self.log.filter {
            config = config.with_filter(filter.clone());
        }
        config
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::runtime_error(format!("Failed to serialize config: {}", e)))
    }
}

/// Install the process-wide configuration. The first install wins; returns
/// false when a configuration was already in place.
pub fn install(config: RuntimeConfig) -> bool {
    let fresh = CURRENT.set(config).is_ok();
    if fresh {
        if let Some(installed) = CURRENT.get() {
            logging::init_with_config(installed.log_config());
        }
    }
    fresh
}

/// The installed configuration, or defaults with environment overrides
pub fn current() -> &'static RuntimeConfig {
    CURRENT.get_or_init(|| RuntimeConfig::default().with_env_overrides())
}
