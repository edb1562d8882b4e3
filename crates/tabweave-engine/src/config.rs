use crate::executor::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the queue/history server.
    pub server_url: String,
    /// Local port the browser glue connects to.
    pub bridge_port: u16,
    /// How often the run queue is polled.
    pub poll_interval_ms: u64,
    /// Deadline for a tab to reach the complete status.
    pub tab_load_timeout_ms: u64,
    /// Interval between tab status polls.
    pub tab_poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "https://localhost:7298/".to_string(),
            bridge_port: 9301,
            poll_interval_ms: 4000,
            tab_load_timeout_ms: 10_000,
            tab_poll_interval_ms: 100,
        }
    }
}

impl Config {
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            tab_load_timeout: Duration::from_millis(self.tab_load_timeout_ms),
            tab_poll_interval: Duration::from_millis(self.tab_poll_interval_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./tabweave.yaml
    /// 2. ~/.tabweave/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<Config, ConfigError> {
        let local_config = PathBuf::from("./tabweave.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".tabweave").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(Config::default())
    }

    pub async fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn partial_files_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server_url: \"https://queue.internal:9000\"").unwrap();
        writeln!(file, "poll_interval_ms: 1500").unwrap();

        let config = ConfigLoader::load_from(file.path()).await.unwrap();
        assert_eq!(config.server_url, "https://queue.internal:9000");
        assert_eq!(config.poll_interval_ms, 1500);
        assert_eq!(config.bridge_port, Config::default().bridge_port);
    }

    #[tokio::test]
    async fn engine_limits_come_from_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tab_load_timeout_ms: 250").unwrap();
        writeln!(file, "tab_poll_interval_ms: 10").unwrap();

        let config = ConfigLoader::load_from(file.path()).await.unwrap();
        let engine = config.engine();
        assert_eq!(engine.tab_load_timeout, Duration::from_millis(250));
        assert_eq!(engine.tab_poll_interval, Duration::from_millis(10));
    }
}
