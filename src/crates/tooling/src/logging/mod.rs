//! Logging utilities
//!
//! Subscriber installation for binaries plus small helpers for structured
//! logging with tracing.

use crate::{Result, ToolingError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Output format of the fmt subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// One line per event
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Settings for [`init_logging`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `settings.level`. Calling this twice
/// returns an error from the second call; the first subscriber stays active.
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| ToolingError::InvalidConfig {
            key: "log level".to_string(),
            reason: e.to_string(),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match settings.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    installed.map_err(|e| ToolingError::General(format!("Failed to install subscriber: {}", e)))
}

/// Log levels for custom logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// RAII guard for logging scope entry and exit with elapsed time
///
/// ```rust
/// use tooling::logging::LogGuard;
///
/// fn route_batch() {
///     let _guard = LogGuard::new("route_batch");
///     // exit is logged when the guard drops
/// }
/// ```
pub struct LogGuard {
    name: String,
    level: LogLevel,
    start: Instant,
}

impl LogGuard {
    /// Create a new log guard at debug level
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_level(name, LogLevel::Debug)
    }

    /// Create a log guard with custom level
    pub fn with_level(name: impl Into<String>, level: LogLevel) -> Self {
        let name = name.into();

        match level {
            LogLevel::Debug => debug!("Entering: {}", name),
            LogLevel::Info => info!("Entering: {}", name),
            LogLevel::Warn => warn!("Entering: {}", name),
            LogLevel::Error => error!("Entering: {}", name),
        }

        Self {
            name,
            level,
            start: Instant::now(),
        }
    }

    /// Get elapsed time since guard creation
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        let elapsed = format_duration(self.start.elapsed());
        match self.level {
            LogLevel::Debug => debug!("Exiting: {} (elapsed: {})", self.name, elapsed),
            LogLevel::Info => info!("Exiting: {} (elapsed: {})", self.name, elapsed),
            LogLevel::Warn => warn!("Exiting: {} (elapsed: {})", self.name, elapsed),
            LogLevel::Error => error!("Exiting: {} (elapsed: {})", self.name, elapsed),
        }
    }
}

/// Format duration in human-readable form
///
/// ```rust
/// use tooling::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
/// assert_eq!(format_duration(Duration::from_micros(500)), "500μs");
/// ```
pub fn format_duration(duration: std::time::Duration) -> String {
    let micros = duration.as_micros();

    if micros < 1000 {
        format!("{}μs", micros)
    } else if micros < 1_000_000 {
        format!("{}ms", micros / 1000)
    } else if micros < 60_000_000 {
        format!("{:.2}s", micros as f64 / 1_000_000.0)
    } else {
        let seconds = micros / 1_000_000;
        format!("{}m{}s", seconds / 60, seconds % 60)
    }
}
