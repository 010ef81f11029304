//! Logging setup for AORM.
//!
//! AORM emits `tracing` events everywhere it touches storage or resolves
//! relations. Nothing is printed unless a subscriber is installed, either by the
//! application or through [`init`], which reads its settings from the
//! environment.
//!
//! # Environment Variables
//!
//! - `AORM_DEBUG=true|1|yes` - Enable debug logging
//! - `AORM_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific log level
//! - `AORM_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use aorm_query::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//! ```
//!
//! Inside the workspace, use the standard tracing macros:
//!
//! ```rust,ignore
//! use tracing::{debug, trace};
//!
//! debug!(model = M::NAME, rows = rows.len(), "hydrating records");
//! trace!(sql = %sql, "rendered condition");
//! ```

use std::env;
use std::fmt;
use std::sync::Once;

static INIT: Once = Once::new();

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Everything, including rendered SQL fragments.
    Trace,
    /// Storage calls, hydration and relation resolution.
    Debug,
    /// Informational.
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// The directive string understood by `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Whether `AORM_DEBUG` is switched on.
    pub debug: bool,
    /// Explicit level from `AORM_LOG_LEVEL`, if any.
    pub level: Option<LogLevel>,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Read settings from `AORM_DEBUG`, `AORM_LOG_LEVEL` and `AORM_LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self {
            debug: is_debug_enabled(),
            level: env::var("AORM_LOG_LEVEL")
                .ok()
                .and_then(|v| LogLevel::parse(&v)),
            format: env::var("AORM_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        }
    }

    /// The effective level: the explicit one, else debug when `AORM_DEBUG` is on, else warn.
    pub fn effective_level(&self) -> LogLevel {
        match self.level {
            Some(level) => level,
            None if self.debug => LogLevel::Debug,
            None => LogLevel::Warn,
        }
    }

    /// Whether logging was requested at all.
    pub fn is_requested(&self) -> bool {
        self.debug || self.level.is_some()
    }

    /// `EnvFilter` directives covering every AORM crate.
    pub fn directives(&self) -> String {
        let level = self.effective_level();
        ["aorm", "aorm_query", "aorm_record", "aorm_sqlite"]
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Check if debug logging is enabled via the `AORM_DEBUG` environment variable.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("AORM_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Initialize the AORM logging system.
///
/// Subsequent calls are no-ops. Does nothing unless `AORM_DEBUG` or
/// `AORM_LOG_LEVEL` is set, or when the `tracing-subscriber` feature is off.
pub fn init() {
    INIT.call_once(|| {
        let settings = LogSettings::from_env();
        if !settings.is_requested() {
            return;
        }
        install(&settings);
    });
}

#[cfg(feature = "tracing-subscriber")]
fn install(settings: &LogSettings) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_new(settings.directives()).unwrap_or_else(|_| EnvFilter::new("warn"));

    match settings.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact())
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    tracing::info!(
        level = %settings.effective_level(),
        format = ?settings.format,
        "AORM logging initialized"
    );
}

#[cfg(not(feature = "tracing-subscriber"))]
fn install(_settings: &LogSettings) {}

/// Debug-level event emitted only when `AORM_DEBUG` is on.
#[macro_export]
macro_rules! aorm_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            $crate::__tracing::debug!($($arg)*);
        }
    };
}

/// Trace-level event emitted only when `AORM_DEBUG` is on.
#[macro_export]
macro_rules! aorm_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            $crate::__tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level_defaults_to_warn() {
        let settings = LogSettings {
            debug: false,
            level: None,
            format: LogFormat::Json,
        };
        assert_eq!(settings.effective_level(), LogLevel::Warn);
        assert!(!settings.is_requested());
    }

    #[test]
    fn test_debug_flag_raises_level() {
        let settings = LogSettings {
            debug: true,
            level: None,
            format: LogFormat::Compact,
        };
        assert_eq!(settings.effective_level(), LogLevel::Debug);
        assert!(settings.is_requested());
    }

    #[test]
    fn test_explicit_level_wins() {
        let settings = LogSettings {
            debug: true,
            level: Some(LogLevel::Trace),
            format: LogFormat::Pretty,
        };
        assert_eq!(settings.effective_level(), LogLevel::Trace);
        assert!(settings.directives().contains("aorm_record=trace"));
        assert!(settings.directives().contains("aorm_sqlite=trace"));
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        aorm_debug!(answer = 42, "debug gate");
        aorm_trace!("trace gate");
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Json);
    }
}
