//! Logging infrastructure - structured tracing across the boundary
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log levels, filtered to this crate by default
//! - Zero-cost when disabled
//! - Optional JSON output and span events
//! - Console or file output
//!
//! Events carry an `event = "..."` field so that log processors can key on
//! them without parsing messages.

use crate::config::LoggingConfig;
use crate::error::{BridgeError, ConfigError};
use once_cell::sync::OnceCell;
use std::io;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Log file path; console when unset
    pub log_path: Option<PathBuf>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

pub(crate) fn parse_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Config from the `[logging]` section, then environment overrides
    pub fn from_section(section: &LoggingConfig) -> Result<Self, ConfigError> {
        let level = parse_level(&section.level).ok_or_else(|| {
            ConfigError::Invalid(format!("logging: unknown level '{}'", section.level))
        })?;
        let mut config = Self {
            level,
            log_path: section.file.clone(),
            json_format: section.json,
            show_spans: section.spans,
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        // CROSSBIND_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("CROSSBIND_LOG_LEVEL") {
            self.level = parse_level(&level_str).unwrap_or(Level::INFO);
        }

        // CROSSBIND_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("CROSSBIND_LOG_FILE") {
            self.log_path = Some(PathBuf::from(path));
        }

        // CROSSBIND_LOG_JSON: enable JSON format
        if std::env::var("CROSSBIND_LOG_JSON").is_ok() {
            self.json_format = true;
        }

        // CROSSBIND_LOG_SPANS: show span events
        if std::env::var("CROSSBIND_LOG_SPANS").is_ok() {
            self.show_spans = true;
        }
    }

    /// Create quiet config (errors only)
    pub fn quiet() -> Self {
        Self {
            level: Level::ERROR,
            ..Self::default()
        }
    }

    /// Create debug config (verbose logging)
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            log_path: None,
            json_format: false,
            show_spans: true,
        }
    }
}

/// Initialize logging with default configuration
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration.
///
/// Only the first call installs a subscriber. If another subscriber is
/// already installed globally, it is left in place.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "crossbind_runtime={}",
                config.level.as_str().to_lowercase()
            ))
        });

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let layer = match &config.log_path {
            Some(path) => {
                let (dir, file) = split_log_path(path);
                let appender = tracing_appender::rolling::never(dir, file);
                let base = fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_span_events(span_events)
                    .with_target(true)
                    .with_thread_ids(true);
                if config.json_format {
                    base.json().boxed()
                } else {
                    base.boxed()
                }
            }
            None => {
                let base = fmt::layer()
                    .with_writer(io::stderr)
                    .with_span_events(span_events)
                    .with_target(true)
                    .with_thread_ids(cfg!(debug_assertions))
                    .with_line_number(cfg!(debug_assertions));
                if config.json_format {
                    base.json().boxed()
                } else {
                    base.boxed()
                }
            }
        };

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init();
    });
}

fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("crossbind.log"));
    (dir, file)
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Runtime-specific logging functions
// ============================================================================

/// Log proxy construction
pub fn log_proxy_created(cache: &str, proxy_type: &str, object: u64, generation: u64) {
    use tracing::debug;
    debug!(
        event = "proxy_created",
        cache = cache,
        proxy_type = proxy_type,
        object = object,
        generation = generation,
        "Proxy created"
    );
}

/// Log proxy cache entry removal
pub fn log_proxy_removed(cache: &str, object: u64, generation: u64) {
    use tracing::debug;
    debug!(
        event = "proxy_removed",
        cache = cache,
        object = object,
        generation = generation,
        "Proxy released, cache entry removed"
    );
}

/// Log a failure crossing the boundary
pub fn log_boundary_exception(direction: &str, site: &str, error: &BridgeError) {
    use tracing::warn;
    warn!(
        event = "boundary_exception",
        direction = direction,
        site = site,
        boundary = error.is_boundary(),
        error = %error,
        "Failure crossed the boundary"
    );
}

/// Log runtime initialization
pub fn log_runtime_init(host_cache_capacity: usize) {
    use tracing::info;
    info!(
        event = "runtime_init",
        cache_capacity = host_cache_capacity,
        "Crossbind runtime initializing"
    );
}

/// Log runtime shutdown
pub fn log_runtime_shutdown(foreign_entries: usize, native_entries: usize) {
    use tracing::info;
    info!(
        event = "runtime_shutdown",
        foreign_entries = foreign_entries,
        native_entries = native_entries,
        "Crossbind runtime shutting down"
    );
}
