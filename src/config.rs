use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoResultExt, Result};

/// default zstd level for new blobs
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 10;

/// optional repository configuration stored in .paperrepo/config.toml
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// object store settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// zstd compression level for new blobs
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

fn default_compression_level() -> i32 {
    DEFAULT_COMPRESSION_LEVEL
}

/// ignore patterns appended to the default set
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
}

impl Config {
    /// load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// load config if the file exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)?;
        Ok(())
    }

    /// append an extra ignore pattern (no-op if already present)
    pub fn add_ignore(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        if !self.ignore.extra.contains(&pattern) {
            self.ignore.extra.push(pattern);
        }
    }
}
