use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::push::ReconnectPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("no config dir")]
    NoConfigDir,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_base: String,
    pub dashboard_reconnect_secs: u64,
    pub widget_reconnect_secs: u64,
    /// Caps the in-memory notification queue; `None` keeps every record.
    pub notification_limit: Option<usize>,
    pub desktop_notifications: bool,
    pub widget_customer_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".into(),
            dashboard_reconnect_secs: 3,
            widget_reconnect_secs: 5,
            notification_limit: None,
            desktop_notifications: true,
            widget_customer_name: "Customer".into(),
        }
    }
}

impl AppConfig {
    fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("supportdesk.toml"))
    }

    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Reads `path`, falling back to defaults when it is missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        let Ok(text) = fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str::<AppConfig>(&text) {
            Ok(cfg) => cfg.normalized(),
            Err(e) => {
                log::warn!("[config] ignoring unreadable {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml)?;
        Ok(())
    }

    fn normalized(mut self) -> Self {
        self.api_base = crate::utils::normalize_url(&self.api_base);
        self
    }

    pub fn dashboard_reconnect(&self) -> ReconnectPolicy {
        ReconnectPolicy::fixed(Duration::from_secs(self.dashboard_reconnect_secs))
    }

    pub fn widget_reconnect(&self) -> ReconnectPolicy {
        ReconnectPolicy::fixed(Duration::from_secs(self.widget_reconnect_secs))
    }
}
