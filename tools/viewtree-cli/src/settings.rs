//! Configuration lookup
//!
//! An explicit `--config` path must exist. Without one, `viewtree.toml` in the
//! platform config directory is used when present, else the defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use viewtree_core::RenderConfig;

const CONFIG_FILE: &str = "viewtree.toml";

/// `<config dir>/viewtree.toml`, if the platform has a config directory
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "viewtree", "viewtree")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

pub fn load(explicit: Option<&Path>) -> Result<RenderConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file {} does not exist", path.display());
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) => path,
            None => {
                tracing::debug!("no config directory, using defaults");
                return Ok(RenderConfig::default());
            }
        },
    };

    RenderConfig::load(&path).with_context(|| format!("Failed to load config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "chunk_size = 4\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.chunk_size, 4);
        assert_eq!(config.summary_max_length, 120);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
