//! Render configuration (viewtree.toml)
//!
//! Tunables for summaries, chunking and synthetic-node transport. Every field
//! has a default so a partial (or empty) file is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// How synthetic child nodes are handed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TagMode {
    /// Children carry an explicit render request next to the value
    #[default]
    Request,
    /// Children are forged host values whose type encodes the tag
    TypeEncoded,
}

/// Rendering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Elements per chunk when paginating sequences (default: 16)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Length budget for one-line summaries (default: 120)
    #[serde(default = "default_summary_max_length")]
    pub summary_max_length: usize,
    /// Children a host-side tree expansion pulls per node (default: 200)
    #[serde(default = "default_max_children")]
    pub max_children: usize,
    /// Synthetic node transport (default: request)
    #[serde(default)]
    pub tag_mode: TagMode,
}

fn default_chunk_size() -> usize {
    16
}
fn default_summary_max_length() -> usize {
    120
}
fn default_max_children() -> usize {
    200
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            summary_max_length: default_summary_max_length(),
            max_children: default_max_children(),
            tag_mode: TagMode::default(),
        }
    }
}

/// Failure loading or saving a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("chunk_size must be at least 1")]
    ZeroChunkSize,
}

impl RenderConfig {
    /// Parse a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig = toml::from_str(text)?;
        if config.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(config)
    }

    /// Load from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("loaded render config from {}", path.display());
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write to a file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.summary_max_length, 120);
        assert_eq!(config.tag_mode, TagMode::Request);
    }

    #[test]
    fn test_partial_document() {
        let config = RenderConfig::from_toml_str("chunk_size = 8\ntag_mode = \"type-encoded\"\n").unwrap();
        assert_eq!(config.chunk_size, 8);
        assert_eq!(config.summary_max_length, 120);
        assert_eq!(config.tag_mode, TagMode::TypeEncoded);

        assert_eq!(RenderConfig::from_toml_str("").unwrap(), RenderConfig::default());
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        assert!(matches!(
            RenderConfig::from_toml_str("chunk_size = 0"),
            Err(ConfigError::ZeroChunkSize)
        ));
        assert!(matches!(
            RenderConfig::from_toml_str("chunk_size = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("viewtree.toml");

        let config = RenderConfig {
            chunk_size: 4,
            summary_max_length: 40,
            max_children: 10,
            tag_mode: TagMode::TypeEncoded,
        };
        config.save(&path).unwrap();
        assert_eq!(RenderConfig::load(&path).unwrap(), config);

        let missing = dir.path().join("missing.toml");
        assert_eq!(RenderConfig::load(&missing).unwrap(), RenderConfig::default());
    }
}
