//! Service configuration loaded from an optional TOML file

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::RESOURCE_DIR;
use crate::error::{Result, ViewerError};
use crate::index::IndexPolicy;
use crate::model::{DisplayText, Granularity};

/// Config file looked up in the working directory when none is given.
pub const CONFIG_FILE: &str = "codeviewer.toml";

/// Project list location when neither the config nor the CLI names one.
pub const PROJECTS_FILE: &str = "resource/projects.txt";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Newline-delimited list of project paths.
    pub projects_file: PathBuf,
    /// Root of the disk artifact cache.
    pub resource_dir: PathBuf,
    pub index_policy: IndexPolicy,
    pub granularity: Granularity,
    pub display_text: DisplayText,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 8081,
            projects_file: PathBuf::from(PROJECTS_FILE),
            resource_dir: PathBuf::from(RESOURCE_DIR),
            index_policy: IndexPolicy::default(),
            granularity: Granularity::default(),
            display_text: DisplayText::default(),
        }
    }
}

impl Config {
    /// Load `path`, or `codeviewer.toml` in the working directory if it
    /// exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ViewerError::ConfigLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ViewerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Make relative paths absolute against `base` (normally the working directory).
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        if self.projects_file.is_relative() {
            self.projects_file = base.join(&self.projects_file);
        }
        if self.resource_dir.is_relative() {
            self.resource_dir = base.join(&self.resource_dir);
        }
        self
    }
}
