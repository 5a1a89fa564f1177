//! Duochat server configuration
//!
//! Settings come from three layers, later ones winning: built-in defaults, an
//! optional TOML file, then command line flags.

use std::net::SocketAddr;
use std::path::Path;

use duochat_core::DuochatConfig;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{Result, ServerError};

/// Complete configuration for the server binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the WebSocket listener binds to
    pub bind_addr: String,

    /// Enable verbose logging output
    pub verbose: bool,

    /// Delivery engine configuration
    pub engine: DuochatConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            verbose: false,
            engine: DuochatConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ServerError::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply command line overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(bind) = &cli.bind {
            self.bind_addr = bind.clone();
        }
        if cli.verbose {
            self.verbose = true;
        }
        if let Some(window_ms) = cli.typing_window_ms {
            self.engine.typing.inactivity_window_ms = window_ms;
        }
        if cli.require_known_users {
            self.engine.directory.require_known_users = true;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        self.engine.validate()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.bind_addr.parse()?)
    }

    /// Generate an example configuration file
    pub fn example_config() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }
}
