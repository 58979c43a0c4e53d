use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub web: WebConfig,
    pub storage: StorageConfig,
    pub fetch: FetchConfig,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding sources, EPG files and the schedule interval
    pub state_file: PathBuf,
    /// Directory receiving one merged document per EPG file
    pub epg_files_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Metadata written on the root element of every merged document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub name: String,
    pub url: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("epg-merger/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            name: "EPG Merger".to_string(),
            url: "http://localhost".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            storage: StorageConfig {
                state_file: PathBuf::from("./data/config.json"),
                epg_files_path: PathBuf::from("./data/epg_files"),
            },
            fetch: FetchConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        let config = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            toml::from_str(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_file, contents)?;
            default_config
        };

        config.ensure_directories()?;
        Ok(config)
    }

    fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.storage.epg_files_path)?;
        if let Some(parent) = self.storage.state_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();

        assert_eq!(parsed.fetch.timeout_secs, 30);
        assert_eq!(parsed.generator.name, "EPG Merger");
        assert_eq!(parsed.storage.epg_files_path, PathBuf::from("./data/epg_files"));
    }
}
