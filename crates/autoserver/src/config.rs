//! Server configuration: optional TOML file, then environment overrides.

use autonodes::services::LinkSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable naming the TOML config file
pub const CONFIG_ENV: &str = "AUTOMATION_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,

    /// Base URL that shareable link paths are joined onto
    pub public_base_url: Option<String>,

    pub default_link_expiry_days: u32,

    /// Messages are POSTed here; without it they are only logged
    pub message_webhook_url: Option<String>,

    pub ai_endpoint: Option<String>,
    pub ai_model: Option<String>,

    pub event_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            public_base_url: None,
            default_link_expiry_days: 14,
            message_webhook_url: None,
            ai_endpoint: None,
            ai_model: None,
            event_buffer_size: 1000,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// File named by `AUTOMATION_CONFIG` (if set), then environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply `BIND_ADDRESS`, `PUBLIC_BASE_URL`, `MESSAGE_WEBHOOK_URL`,
    /// `AI_ENDPOINT` and `AI_MODEL` from `lookup`. Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind) = get("BIND_ADDRESS") {
            self.bind_address = bind;
        }
        if let Some(url) = get("PUBLIC_BASE_URL") {
            self.public_base_url = Some(url);
        }
        if let Some(url) = get("MESSAGE_WEBHOOK_URL") {
            self.message_webhook_url = Some(url);
        }
        if let Some(url) = get("AI_ENDPOINT") {
            self.ai_endpoint = Some(url);
        }
        if let Some(model) = get("AI_MODEL") {
            self.ai_model = Some(model);
        }
        self
    }

    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            base_url: self.public_base_url.clone(),
            default_expiry_days: self.default_link_expiry_days.max(1),
        }
    }
}
