//! User settings
//!
//! Stored in `~/.config/argopack/config.yaml`. Every field is optional in
//! the file; command-line flags take precedence over it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Persistent defaults for the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Namespace to install into
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Registry recorded on installed packages
    #[serde(default = "default_registry")]
    pub registry: String,

    /// Install templates as ClusterWorkflowTemplates
    #[serde(default)]
    pub cluster: bool,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_registry() -> String {
    "local".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            registry: default_registry(),
            cluster: false,
        }
    }
}

impl Settings {
    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Default settings path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| CoreError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("argopack").join("config.yaml"))
    }
}
