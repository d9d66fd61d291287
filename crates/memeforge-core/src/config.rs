//! Application configuration.
//!
//! Layered as defaults, then an optional TOML file, then environment
//! variables. Every section is `#[serde(default)]`, so a config file only
//! needs the keys it overrides.

use crate::history::HistoryConfig;
use crate::shapes::SerializableColor;
use crate::surface::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "memeforge.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
    /// CSS hex color.
    pub background_color: String,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            background_color: "#f5f5f5".to_string(),
        }
    }
}

impl CanvasConfig {
    /// Background color, falling back to the default on a malformed value.
    pub fn background(&self) -> SerializableColor {
        SerializableColor::from_hex(&self.background_color)
            .unwrap_or(SerializableColor::new(0xf5, 0xf5, 0xf5, 255))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Resolution multiplier applied when rasterizing.
    pub multiplier: f64,
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            file_name: "meme.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Origin that serves `/share?id=<cid>`.
    pub origin: String,
    /// IPFS HTTP gateway.
    pub gateway: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3030".to_string(),
            gateway: crate::share::DEFAULT_GATEWAY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinataConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
}

impl Default for PinataConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.pinata.cloud".to_string(),
            api_key: None,
            secret_key: None,
        }
    }
}

impl PinataConfig {
    pub fn has_credentials(&self) -> bool {
        matches!((&self.api_key, &self.secret_key), (Some(k), Some(s)) if !k.is_empty() && !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Path to the `{address, abi}` constants file.
    pub constants_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub name: String,
    pub description: String,
    pub creator: String,
    pub app: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            name: "Based Meme".to_string(),
            description: "Created with Based Meme Maker".to_string(),
            creator: "Based Meme Maker".to_string(),
            app: "Based Meme Maker".to_string(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub canvas: CanvasConfig,
    pub export: ExportConfig,
    pub share: ShareConfig,
    pub pinata: PinataConfig,
    pub contract: ContractConfig,
    pub metadata: MetadataConfig,
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Parse a TOML document on top of the defaults.
    pub fn from_toml_str(source: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a TOML config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source, path)
    }

    /// Load the full layered configuration.
    ///
    /// An explicit path must exist. Without one, `memeforge.toml` in the
    /// working directory and then in the user config directory are tried.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_paths().into_iter().find(|p| p.is_file()) {
                Some(found) => {
                    log::info!("Using config file {}", found.display());
                    Self::from_file(&found)?
                }
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()));

        if let Some(key) = first(&["PINATA_API_KEY", "VITE_PINATA_API_KEY"]) {
            self.pinata.api_key = Some(key);
        }
        if let Some(secret) = first(&["PINATA_SECRET_KEY", "VITE_PINATA_SECRET_KEY"]) {
            self.pinata.secret_key = Some(secret);
        }
        if let Some(origin) = first(&["MEMEFORGE_ORIGIN"]) {
            self.share.origin = origin;
        }
        if let Some(gateway) = first(&["MEMEFORGE_GATEWAY"]) {
            self.share.gateway = gateway;
        }
        if let Some(path) = first(&["MEMEFORGE_CONTRACT"]) {
            self.contract.constants_path = Some(PathBuf::from(path));
        }
        if let Some(value) = first(&["MEMEFORGE_HISTORY_LIMIT"]) {
            let limit = value
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "MEMEFORGE_HISTORY_LIMIT".to_string(),
                    value: value.clone(),
                })?;
            self.history.max_entries = (limit > 0).then_some(limit);
        }
        Ok(())
    }
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    #[cfg(not(target_arch = "wasm32"))]
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("memeforge").join(CONFIG_FILE_NAME));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!((config.canvas.width - 800.0).abs() < f64::EPSILON);
        assert_eq!(config.canvas.background().to_hex(), "#f5f5f5");
        assert_eq!(config.export.file_name, "meme.png");
        assert_eq!(config.share.gateway, "https://gateway.pinata.cloud");
        assert_eq!(config.history.max_entries, None);
        assert!(!config.pinata.has_credentials());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [share]
            origin = "https://memes.example"

            [history]
            max_entries = 50
            "#,
            Path::new("test.toml"),
        )
        .unwrap();
        assert_eq!(config.share.origin, "https://memes.example");
        assert_eq!(config.share.gateway, "https://gateway.pinata.cloud");
        assert_eq!(config.history.max_entries, Some(50));
        assert_eq!(config.metadata.name, "Based Meme");
    }

    #[test]
    fn test_invalid_toml() {
        let err = AppConfig::from_toml_str("[share\norigin=", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("VITE_PINATA_API_KEY", "key"),
            ("PINATA_SECRET_KEY", "secret"),
            ("MEMEFORGE_GATEWAY", "https://ipfs.example"),
            ("MEMEFORGE_HISTORY_LIMIT", "0"),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config.history.max_entries = Some(10);
        config
            .apply_env(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert!(config.pinata.has_credentials());
        assert_eq!(config.share.gateway, "https://ipfs.example");
        assert_eq!(config.history.max_entries, None);
    }

    #[test]
    fn test_env_invalid_number() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(|k| (k == "MEMEFORGE_HISTORY_LIMIT").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[export]\nmultiplier = 2.0\n").unwrap();
        let config = AppConfig::from_file(&path).unwrap();
        assert!((config.export.multiplier - 2.0).abs() < f64::EPSILON);

        let missing = AppConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
