pub mod scanner_config;

use std::path::Path;

use anyhow::Result;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::scanner_config::ScannerConfig;
use crate::utils::ensure_directory_exists;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scanner: ScannerConfig,
}

impl AppConfig {
    /// Loads the config from `path`, falling back to defaults if it is missing.
    pub async fn load_config(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file not found at {:?}, using default.", path);
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&config_json)?;

        info!("Config loaded from {:?}", path);
        Ok(config)
    }

    /// Saves the config to `path`, creating its directory if needed.
    pub async fn save_config(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            ensure_directory_exists(parent).await?;
        }

        let config_json = match serde_json::to_string_pretty(&self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize config to JSON: {}", e);
                return Err(e.into());
            }
        };

        fs::write(path, config_json).await?;

        info!("Config saved to {:?}.", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "classic-discovery-bridge-{}-{}",
            name,
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let path = scratch_dir("missing").join("nope.json");
        let config = AppConfig::load_config(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn save_then_load_preserves_values() {
        let dir = scratch_dir("save");
        let path = dir.join("nested").join("scanner_config.json");
        let mut config = AppConfig::default();
        config.scanner.scan_duration_secs = 30;
        config.scanner.log_level = "debug".to_string();

        config.save_config(&path).await.unwrap();
        let loaded = AppConfig::load_config(&path).await.unwrap();

        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let dir = scratch_dir("partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scanner_config.json");
        std::fs::write(&path, r#"{ "scanner": { "scan_duration_secs": 5 } }"#).unwrap();

        let loaded = AppConfig::load_config(&path).await.unwrap();

        assert_eq!(loaded.scanner.scan_duration_secs, 5);
        assert_eq!(loaded.scanner.log_level, "info");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = scratch_dir("malformed");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scanner_config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(AppConfig::load_config(&path).await.is_err());
        let _ = std::fs::remove_dir_all(dir);
    }
}
