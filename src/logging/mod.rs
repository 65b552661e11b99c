//! Logging infrastructure - structured tracing throughout the runtime
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log levels per target
//! - Zero-cost when disabled
//! - Console or rolling-file output
//! - Compact, pretty or JSON formatting

use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

// Re-export tracing macros for use throughout the runtime
pub use tracing::{debug, error, info, trace, warn};

/// Targets the runtime logs under, enabled together at the configured level
const TARGETS: [&str; 8] = [
    "tensor_ffi",
    "registry",
    "object",
    "function",
    "ffi",
    "structural",
    "interop",
    "runtime",
];

/// Global logging state. Holds the appender guard so buffered lines are flushed.
static LOGGER: OnceCell<Option<WorkerGuard>> = OnceCell::new();

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Single-line format
    Compact,
    /// JSON lines
    Json,
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Daily rotated file
    File { directory: String, prefix: String },
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Emit span enter/close events
    pub span_events: bool,
    /// Custom filter directives (e.g. "tensor_ffi=debug,structural=trace")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // TFFI_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level) = std::env::var("TFFI_LOG_LEVEL") {
            config.level = parse_level(&level).unwrap_or(Level::INFO);
        }

        // TFFI_LOG_FILE: directory for rolling log files
        if let Ok(directory) = std::env::var("TFFI_LOG_FILE") {
            config.output = LogOutput::File {
                directory,
                prefix: "tensor_ffi.log".to_string(),
            };
        }

        if std::env::var("TFFI_LOG_JSON").is_ok() {
            config.format = LogFormat::Json;
        }

        config.span_events = std::env::var("TFFI_LOG_SPANS").is_ok();
        config
    }

    fn env_filter(&self) -> EnvFilter {
        if let Some(directives) = &self.filter {
            return EnvFilter::new(directives);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = self.level.as_str().to_lowercase();
            let directives: Vec<String> = TARGETS
                .iter()
                .map(|target| format!("{}={}", target, level))
                .collect();
            EnvFilter::new(directives.join(","))
        })
    }
}

/// Parse a level name as accepted by `TFFI_LOG_LEVEL`
pub fn parse_level(name: &str) -> Option<Level> {
    match name.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize logging with configuration taken from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with a custom configuration
///
/// Only the first call installs a subscriber. If the host already installed a
/// global subscriber, ours is silently dropped.
pub fn init_with_config(config: LogConfig) {
    LOGGER.get_or_init(|| {
        let filter = config.env_filter();
        let span_events = if config.span_events {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let (writer, guard) = match &config.output {
            LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
            LogOutput::File { directory, prefix } => {
                tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, prefix))
            }
        };

        let layer = match config.format {
            LogFormat::Pretty => fmt::layer()
                .with_writer(writer)
                .pretty()
                .with_span_events(span_events)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .with_writer(writer)
                .compact()
                .with_span_events(span_events)
                .with_target(true)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .with_writer(writer)
                .json()
                .with_span_events(span_events)
                .boxed(),
        };

        let installed = tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_ok();

        installed.then_some(guard)
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER.get().is_some()
}

// ============================================================================
// Runtime-specific logging functions
// ============================================================================

/// Log a type table insertion
#[inline]
pub fn log_type_registered(type_key: &str, type_index: i32, parent_index: i32) {
    debug!(
        target: "registry",
        type_key,
        type_index,
        parent_index,
        "type registered"
    );
}

/// Log reflection metadata attached to a type
#[inline]
pub fn log_reflection_registered(type_key: &str, fields: usize, methods: usize) {
    debug!(
        target: "registry",
        type_key,
        fields,
        methods,
        "reflection registered"
    );
}

/// Log object allocation
#[inline]
pub fn log_object_allocated(type_key: &str, size: usize) {
    trace!(
        target: "object",
        type_key,
        size_bytes = size,
        "object allocated"
    );
}

/// Log object destruction (refcount reached zero)
#[inline]
pub fn log_object_destroyed(type_index: i32, address: *const u8) {
    trace!(
        target: "object",
        type_index,
        address = ?address,
        "object destroyed"
    );
}

/// Log a global function table change
#[inline]
pub fn log_function_registered(name: &str, overridden: bool) {
    debug!(
        target: "function",
        name,
        overridden,
        "global function registered"
    );
}

/// Log an FFI call
#[inline]
pub fn log_ffi_call(function: &str, args_count: usize) {
    trace!(
        target: "ffi",
        function,
        args_count,
        "FFI call"
    );
}

/// Log an FFI error surfaced through a status code
#[inline]
pub fn log_ffi_error(function: &str, error: &str) {
    debug!(
        target: "ffi",
        function,
        error,
        "FFI error raised"
    );
}

/// Log a structural-equality mismatch
#[inline]
pub fn log_sequal_mismatch(lhs_path: &str, rhs_path: &str) {
    debug!(
        target: "structural",
        lhs_path,
        rhs_path,
        "structural mismatch"
    );
}

/// Log a graph-node pairing failure recorded without ending the comparison
#[inline]
pub fn log_sequal_deferred(lhs_path: &str, rhs_path: &str, recorded: usize) {
    debug!(
        target: "structural",
        lhs_path,
        rhs_path,
        recorded,
        "pairing failure deferred"
    );
}

/// Log a module symbol resolution
#[inline]
pub fn log_symbol_lookup(module: &str, symbol: &str, found: bool) {
    trace!(
        target: "interop",
        module,
        symbol,
        found,
        "symbol lookup"
    );
}

/// Log a programming-contract violation right before halting
#[inline]
pub fn log_fatal(message: &str) {
    error!(target: "runtime", message, "internal error");
}

/// Log runtime initialization
pub fn log_runtime_init() {
    info!(target: "runtime", "tensor-ffi runtime initialized");
}

/// Log runtime shutdown
pub fn log_runtime_shutdown() {
    info!(target: "runtime", "tensor-ffi runtime shutting down");
}

/// Performance tracking utilities
pub mod perf {
    use std::time::Instant;
    use tracing::debug;

    /// Track operation duration (returns guard that logs on drop)
    #[must_use]
    pub fn track(operation: &'static str) -> PerformanceGuard {
        PerformanceGuard {
            operation,
            start: Instant::now(),
        }
    }

    pub struct PerformanceGuard {
        operation: &'static str,
        start: Instant,
    }

    impl Drop for PerformanceGuard {
        fn drop(&mut self) {
            debug!(
                operation = self.operation,
                duration_us = self.start.elapsed().as_micros() as u64,
                "operation completed"
            );
        }
    }
}
