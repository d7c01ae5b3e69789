//! Logging infrastructure for etcord
//!
//! Provides unified logging setup using the tracing ecosystem.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::{EtcordError, Result};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level filter (e.g., "info", "etcord=debug,tokio=warn")
    pub filter: String,
    /// Include file/line in logs
    pub file_line: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: std::env::var("ETCORD_LOG").unwrap_or_else(|_| "info".into()),
            file_line: false,
        }
    }
}

impl LogConfig {
    /// Create config for the server daemon
    pub fn server() -> Self {
        Self {
            filter: std::env::var("ETCORD_LOG").unwrap_or_else(|_| "info".into()),
            file_line: true,
        }
    }

    /// Create config for development (verbose stderr)
    pub fn development() -> Self {
        Self {
            filter: "debug".into(),
            file_line: true,
        }
    }
}

/// Initialize logging with default configuration
///
/// Uses the ETCORD_LOG env var for the filter, defaults to "info"
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LogConfig::default())
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| EtcordError::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_file(config.file_line)
        .with_line_number(config.file_line);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| EtcordError::internal(format!("Failed to init logging: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(!config.filter.is_empty());
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let config = LogConfig {
            filter: "not a [valid filter".into(),
            file_line: false,
        };
        assert!(init_logging_with_config(config).is_err());
    }
}
