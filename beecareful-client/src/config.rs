//! Client configuration
//!
//! Handles:
//! - API endpoint and timeout
//! - Whether the session token is kept in the OS keyring
//! - Notification cache location and retention
//! - Web push key
//!
//! Stored as TOML in the OS config dir. `BEECAREFUL_API_URL` and
//! `BEECAREFUL_NOTIFICATIONS_PATH` (also read from `.env`) override the file.

use crate::session::{KeyringSessionStore, MemorySessionStore, SessionStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_API_URL: &str = "BEECAREFUL_API_URL";
pub const ENV_NOTIFICATIONS_PATH: &str = "BEECAREFUL_NOTIFICATIONS_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find config directory")]
    NoConfigDir,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub push: PushConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub store_token: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub path: Option<PathBuf>,
    pub retention_days: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PushConfig {
    pub vapid_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 15,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { store_token: true }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            path: None,
            retention_days: 30,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            notifications: NotificationsConfig::default(),
            push: PushConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load config from the OS-specific location, then apply env overrides.
    pub async fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let path = Self::config_file_path()?;
        let mut config = Self::load_from(&path).await?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Missing file: defaults.
    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path).await?;
        Ok(toml::from_str(&content)?)
    }

    pub async fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_file_path()?;
        self.save_to(&path).await
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        info!("config saved to {}", path.display());
        Ok(())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api.base_url = url;
        }
        if let Some(path) = lookup(ENV_NOTIFICATIONS_PATH).filter(|v| !v.is_empty()) {
            self.notifications.path = Some(PathBuf::from(path));
        }
    }

    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push("beecareful");
        path.push("config.toml");
        Ok(path)
    }

    /// Notification cache file: configured path, else the OS data dir.
    pub fn notifications_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.notifications.path {
            return Ok(path.clone());
        }
        let mut path = dirs::data_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push("beecareful");
        path.push("notifications.json");
        Ok(path)
    }

    /// Token storage picked by `session.store_token`.
    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        if self.session.store_token {
            Arc::new(KeyringSessionStore::new())
        } else {
            debug!("session token kept in memory only");
            Arc::new(MemorySessionStore::new())
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.notifications.retention_days) * 24 * 3600)
    }
}
