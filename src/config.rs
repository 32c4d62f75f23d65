use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub removal: RemovalConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalConfig {
    #[serde(default = "default_true")]
    pub backup_config_entry: bool,
    #[serde(default)]
    pub delete_content_dir: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            backup_config_entry: true,
            delete_content_dir: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_true")]
    pub history: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { history: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ShutdownConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("libsweep")
            .join("config.toml")
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("libsweep")
    }

    /// Applies a `key = value` pair from the command line.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "backup_config_entry" => self.removal.backup_config_entry = value.parse()?,
            "delete_content_dir" => self.removal.delete_content_dir = value.parse()?,
            "history" => self.log.history = value.parse()?,
            "shutdown_timeout" => self.shutdown.timeout_secs = value.parse()?,
            _ => anyhow::bail!(
                "unknown key: {} (available: backup_config_entry, delete_content_dir, history, shutdown_timeout)",
                key
            ),
        }
        Ok(())
    }
}
