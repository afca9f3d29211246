use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use laddahar_core::{SyncOptions, DEFAULT_HUB_URL};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_STATUS_RESET_MS: u64 = 3000;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding users.json, sessions.json and settings.json
    pub data_dir: ConfigValue<PathBuf>,
    /// Base URL of the blob API
    pub hub_url: ConfigValue<String>,
    /// Seconds between routine pulls in `watch`
    pub poll_interval_secs: ConfigValue<u64>,
    /// How long a success or error status is shown before going idle
    pub status_reset_ms: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    hub_url: Option<String>,
    poll_interval_secs: Option<u64>,
    status_reset_ms: Option<u64>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut hub_url = ConfigValue::new(DEFAULT_HUB_URL.to_string(), ConfigSource::Default);
        let mut poll_interval_secs =
            ConfigValue::new(DEFAULT_POLL_INTERVAL_SECS, ConfigSource::Default);
        let mut status_reset_ms = ConfigValue::new(DEFAULT_STATUS_RESET_MS, ConfigSource::Default);
        let mut config_file = None;

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Relative paths are relative to the config file
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(url) = file_config.hub_url {
                hub_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(secs) = file_config.poll_interval_secs {
                poll_interval_secs = ConfigValue::new(secs, ConfigSource::File);
            }
            if let Some(ms) = file_config.status_reset_ms {
                status_reset_ms = ConfigValue::new(ms, ConfigSource::File);
            }
        }

        if let Ok(dir) = std::env::var("LADDA_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("LADDA_HUB_URL") {
            hub_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Ok(secs) = std::env::var("LADDA_POLL_INTERVAL_SECS") {
            let secs = secs
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("LADDA_POLL_INTERVAL_SECS", secs.clone()))?;
            poll_interval_secs = ConfigValue::new(secs, ConfigSource::Environment);
        }

        Ok(Self {
            data_dir,
            hub_url,
            poll_interval_secs,
            status_reset_ms,
            config_file,
        })
    }

    /// Sync timings derived from the configuration. A zero interval is
    /// raised to one second.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            status_reset_delay: Duration::from_millis(self.status_reset_ms.value),
            poll_interval: Duration::from_secs(self.poll_interval_secs.value.max(1)),
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/ladda/
    /// - macOS: ~/Library/Application Support/ladda/
    /// - Windows: %APPDATA%/ladda/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ladda")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/ladda/
    /// - macOS: ~/Library/Application Support/ladda/
    /// - Windows: %APPDATA%/ladda/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ladda")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config.data_dir.value.ends_with("ladda"));
        assert_eq!(config.hub_url.value, DEFAULT_HUB_URL);
        assert_eq!(config.hub_url.source, ConfigSource::Default);
        assert_eq!(config.status_reset_ms.value, 3000);
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: /custom/ladda").unwrap();
        writeln!(file, "hub_url: http://localhost:9000/api/jsonBlob").unwrap();
        writeln!(file, "status_reset_ms: 500").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(config.data_dir.value, PathBuf::from("/custom/ladda"));
        assert_eq!(config.data_dir.source, ConfigSource::File);
        assert_eq!(config.hub_url.value, "http://localhost:9000/api/jsonBlob");
        assert_eq!(config.hub_url.source, ConfigSource::File);
        assert_eq!(config.status_reset_ms.value, 500);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_data_dir_resolves_against_config_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "data_dir: data\n").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.data_dir.value, temp_dir.path().join("data"));
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "hub_url: http://fromfile\n").unwrap();

        std::env::set_var("LADDA_HUB_URL", "http://fromenv");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.hub_url.value, "http://fromenv");
        assert_eq!(config.hub_url.source, ConfigSource::Environment);

        std::env::remove_var("LADDA_HUB_URL");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let err = Config::load(Some(config_path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_sync_options() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "poll_interval_secs: 0\nstatus_reset_ms: 250\n").unwrap();

        let options = Config::load(Some(config_path)).unwrap().sync_options();
        assert_eq!(options.poll_interval, Duration::from_secs(1));
        assert_eq!(options.status_reset_delay, Duration::from_millis(250));
    }
}
