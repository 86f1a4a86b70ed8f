use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::storage::{DATA_FILE_NAME, KV_FILE_NAME};

/// Name used for the data directory and backup files.
pub const DEFAULT_APP_NAME: &str = "family-meal-planner";

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

/// Which storage backends the document store should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendPreference {
    /// File backend, falling back to the persistent key-value map.
    #[default]
    Auto,
    /// File backend only.
    File,
    /// Persistent key-value map only.
    KeyValue,
    /// In-process key-value map; nothing touches disk.
    Memory,
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "file" => Ok(Self::File),
            "key-value" | "kv" => Ok(Self::KeyValue),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "unknown backend '{}' (expected auto, file, key-value or memory)",
                other
            )),
        }
    }
}

impl std::fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendPreference::Auto => write!(f, "auto"),
            BackendPreference::File => write!(f, "file"),
            BackendPreference::KeyValue => write!(f, "key-value"),
            BackendPreference::Memory => write!(f, "memory"),
        }
    }
}

/// Kernel configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the document file and key-value map
    pub data_dir: ConfigValue<PathBuf>,
    /// Application name, used for backup file names
    pub app_name: ConfigValue<String>,
    /// Storage backend selection
    pub backend: ConfigValue<BackendPreference>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    app_name: Option<String>,
    backend: Option<BackendPreference>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut app_name = ConfigValue::new(DEFAULT_APP_NAME.to_string(), ConfigSource::Default);
        let mut backend = ConfigValue::new(BackendPreference::default(), ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(name) = file_config.app_name {
                app_name = ConfigValue::new(name, ConfigSource::File);
            }
            if let Some(pref) = file_config.backend {
                backend = ConfigValue::new(pref, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Ok(dir) = std::env::var("MEAL_PLANNER_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(name) = std::env::var("MEAL_PLANNER_APP_NAME") {
            app_name = ConfigValue::new(name, ConfigSource::Environment);
        }
        if let Ok(raw) = std::env::var("MEAL_PLANNER_BACKEND") {
            let pref = raw
                .parse()
                .map_err(|e| ConfigError::InvalidValue("MEAL_PLANNER_BACKEND", e))?;
            backend = ConfigValue::new(pref, ConfigSource::Environment);
        }

        Ok(Self {
            data_dir,
            app_name,
            backend,
            config_file,
        })
    }

    /// Configuration rooted at `data_dir` with every other value defaulted.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir: ConfigValue::new(data_dir, ConfigSource::Default),
            app_name: ConfigValue::new(DEFAULT_APP_NAME.to_string(), ConfigSource::Default),
            backend: ConfigValue::new(BackendPreference::default(), ConfigSource::Default),
            config_file: None,
        }
    }

    /// Path of the document file used by the file backend.
    pub fn document_path(&self) -> PathBuf {
        self.data_dir.value.join(DATA_FILE_NAME)
    }

    /// Path of the persistent key-value map.
    pub fn key_value_path(&self) -> PathBuf {
        self.data_dir.value.join(KV_FILE_NAME)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/family-meal-planner/
    /// - macOS: ~/Library/Application Support/family-meal-planner/
    /// - Windows: %APPDATA%/family-meal-planner/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_APP_NAME)
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/family-meal-planner/
    /// - macOS: ~/Library/Application Support/family-meal-planner/
    /// - Windows: %APPDATA%/family-meal-planner/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_APP_NAME)
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {1}", .0.display())]
    ReadError(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{}': {1}", .0.display())]
    ParseError(PathBuf, #[source] serde_yaml::Error),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

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
        assert!(config
            .data_dir
            .value
            .to_string_lossy()
            .contains(DEFAULT_APP_NAME));
        assert_eq!(config.data_dir.source, ConfigSource::Default);
        assert_eq!(config.app_name.value, DEFAULT_APP_NAME);
        assert_eq!(config.backend.value, BackendPreference::Auto);
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: /custom/planner").unwrap();
        writeln!(file, "app_name: our-kitchen").unwrap();
        writeln!(file, "backend: key-value").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(config.data_dir.value, PathBuf::from("/custom/planner"));
        assert_eq!(config.data_dir.source, ConfigSource::File);
        assert_eq!(config.app_name.value, "our-kitchen");
        assert_eq!(config.backend.value, BackendPreference::KeyValue);
        assert_eq!(config.backend.source, ConfigSource::File);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_data_dir_resolves_against_config_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "data_dir: planner-data\n").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.data_dir.value, temp_dir.path().join("planner-data"));
        assert_eq!(
            config.document_path(),
            temp_dir.path().join("planner-data").join(DATA_FILE_NAME)
        );
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "app_name: fromfile\n").unwrap();

        std::env::set_var("MEAL_PLANNER_APP_NAME", "fromenv");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.app_name.value, "fromenv");
        assert_eq!(config.app_name.source, ConfigSource::Environment);

        std::env::remove_var("MEAL_PLANNER_APP_NAME");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_unknown_backend_in_file_is_parse_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "backend: floppy\n").unwrap();

        assert!(matches!(
            Config::load(Some(config_path)),
            Err(ConfigError::ParseError(_, _))
        ));
    }

    #[test]
    fn test_backend_preference_from_str() {
        assert_eq!("auto".parse(), Ok(BackendPreference::Auto));
        assert_eq!("KV".parse(), Ok(BackendPreference::KeyValue));
        assert_eq!(" memory ".parse(), Ok(BackendPreference::Memory));
        assert!("tape".parse::<BackendPreference>().is_err());
    }
}
