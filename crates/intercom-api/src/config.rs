//! Server configuration
//!
//! Sources, later ones win:
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. `INTERCOM__*` environment variables, e.g. `INTERCOM__JWT__SECRET`
//! 4. `PORT`, which replaces the port of `bind_address`

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use smart_intercom_signaling::SignalingConfig;
use crate::jwt::JwtConfig;
use crate::logging::LoggingConfig;

/// Main configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub signaling: SignalingSettings,
    pub jwt: JwtConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalingSettings {
    pub poll_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from `path` (if given) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_port(path, std::env::var("PORT").ok())
    }

    pub fn load_with_port(path: Option<&Path>, port: Option<String>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("INTERCOM")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;
        if let Some(port) = port.filter(|p| !p.is_empty()) {
            config.override_port(&port)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn signaling_config(&self) -> SignalingConfig {
        SignalingConfig::default().with_poll_timeout(Duration::from_secs(self.signaling.poll_timeout_secs))
    }

    fn override_port(&mut self, port: &str) -> Result<(), ConfigError> {
        let port: u16 = port
            .parse()
            .map_err(|_| ConfigError::Message(format!("Invalid PORT: {}", port)))?;
        let mut address = self.socket_addr()?;
        address.set_port(port);
        self.bind_address = address.to_string();
        Ok(())
    }

    fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address
            .parse()
            .map_err(|_| ConfigError::Message(format!("Invalid bind_address: {}", self.bind_address)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.signaling.poll_timeout_secs == 0 {
            return Err(ConfigError::Message("signaling.poll_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            signaling: SignalingSettings::default(),
            jwt: JwtConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SignalingSettings {
    fn default() -> Self {
        Self {
            poll_timeout_secs: 60,
        }
    }
}
