//! Configuration handling for changed-pkgs
//!
//! An optional `.changed-pkgs.toml` in the repository supplies defaults for
//! options not given on the command line. Relative paths in the file are
//! resolved against the directory containing it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LogLevel;
use super::output::OutputFormat;

/// File name looked up in the repository directory
pub const CONFIG_FILE_NAME: &str = ".changed-pkgs.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Settings read from the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The git repository to inspect
    pub repo_dir: Option<PathBuf>,

    /// Directory containing the go.mod used to find local packages
    pub mod_dir: Option<PathBuf>,

    pub log_level: Option<LogLevel>,

    pub format: Option<OutputFormat>,

    /// File name of the dependency manifest
    pub manifest_name: String,

    /// git executable
    pub git_binary: PathBuf,

    /// go executable
    pub go_binary: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_dir: None,
            mod_dir: None,
            log_level: None,
            format: None,
            manifest_name: "go.mod".to_string(),
            git_binary: PathBuf::from("git"),
            go_binary: PathBuf::from("go"),
        }
    }
}

impl Config {
    /// Loads configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Loads `.changed-pkgs.toml` from `dir` if present, defaults otherwise
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for dir in [&mut self.repo_dir, &mut self.mod_dir].into_iter().flatten() {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }
}
