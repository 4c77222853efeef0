use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::ServerError;

/// Configuration for the logging system
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Whether to enable JSON formatting
    pub json: bool,
    /// Whether to include file and line information
    pub file_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
            file_info: false,
        }
    }
}

/// Set up the global subscriber. Fails if the level is not a valid filter or
/// a subscriber is already installed.
pub fn setup_logging(config: &LoggingConfig) -> Result<(), ServerError> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(&config.level),
    }
    .map_err(|e| ServerError::Logging(format!("Invalid log level '{}': {}", config.level, e)))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let result = if config.json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    result.map_err(|e| ServerError::Logging(e.to_string()))
}

/// Log a welcome message with version info
pub fn log_welcome(app_name: &str, version: &str) {
    tracing::info!("Starting {} v{}", app_name, version);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_reported() {
        // Only meaningful when RUST_LOG does not override the configured level.
        if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "smart_intercom=verbose".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(setup_logging(&config), Err(ServerError::Logging(_))));
    }
}
