//! Server configuration.
//!
//! Loaded from a TOML file with sane defaults for every field, so an
//! empty file (or no file at all) yields a working single-process
//! setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::RestApiConfig;
use crate::auth::{RoleId, PUBLIC_ROLE};
use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub calendar: CalendarConfig,
}

/// HTTP server section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub http_port: u16,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            http_port: 8080,
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Calendar engine section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Role anonymous callers act with.
    pub public_role: RoleId,
    /// Optional JSON seed file loaded into the memory store on startup.
    pub fixture: Option<PathBuf>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            public_role: PUBLIC_ROLE,
            fixture: None,
        }
    }
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::from_toml(&raw)
    }

    /// Load from the first config file found in the usual places, or
    /// fall back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut candidates = vec![PathBuf::from("config.toml"), PathBuf::from("calview.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("calview").join("config.toml"));
        }
        if let Some(home_dir) = dirs::home_dir() {
            candidates.push(home_dir.join(".calview.toml"));
        }
        for candidate in candidates {
            if candidate.exists() {
                debug!(path = %candidate.display(), "loading config file");
                return Self::from_file(&candidate);
            }
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_addr.is_empty() {
            return Err(ConfigError::Invalid("bind_addr must be set".to_string()));
        }
        if self.server.http_port == 0 {
            return Err(ConfigError::Invalid(
                "http_port must be non-zero".to_string(),
            ));
        }
        if self.calendar.public_role < 1 {
            return Err(ConfigError::Invalid(
                "public_role must be a positive role id".to_string(),
            ));
        }
        Ok(())
    }

    /// HTTP surface settings derived from the server section.
    pub fn rest_config(&self) -> RestApiConfig {
        RestApiConfig {
            enable_cors: self.server.enable_cors,
            cors_origins: self.server.cors_origins.clone(),
            ..RestApiConfig::default()
        }
    }
}
