//! Configuration management for tnet.
//!
//! Engine settings are stored in TOML in a platform-appropriate location.
//! They are independent of any workspace: per-workspace state lives in the
//! workspace's own settings directory, not here.

use crate::error::{Result, TnetError};
use crate::paths::DEFAULT_SETTINGS_DIR;
use crate::tree::TreeOptions;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure for tnet.
///
/// ## Example Configuration File (tnet.toml)
///
/// ```toml
/// [general]
/// log_level = "info"
///
/// [workspace]
/// settings_dir = ".tnet"
///
/// [sync]
/// on_metadata_error = "rollback"
///
/// [tree]
/// show_hidden = false
/// exclude = [".tnet", "*.tmp"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Per-workspace storage layout
    pub workspace: WorkspaceConfig,

    /// Synchronizer behavior
    pub sync: SyncConfig,

    /// File tree listing
    pub tree: TreeConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
        }
    }
}

/// Workspace layout options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Name of the hidden settings directory inside each workspace root
    pub settings_dir: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        WorkspaceConfig {
            settings_dir: DEFAULT_SETTINGS_DIR.to_string(),
        }
    }
}

/// What the synchronizer does when the file operation succeeded but the
/// session or keyword index could not be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFailurePolicy {
    /// Undo the file operation, restore the metadata and return the error
    #[default]
    Rollback,
    /// Log a warning and report success
    BestEffort,
}

impl fmt::Display for MetadataFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataFailurePolicy::Rollback => write!(f, "rollback"),
            MetadataFailurePolicy::BestEffort => write!(f, "best_effort"),
        }
    }
}

/// Synchronizer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub on_metadata_error: MetadataFailurePolicy,
}

/// File tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Show entries whose name starts with `.`
    pub show_hidden: bool,

    /// Glob patterns matched against entry names
    pub exclude: Vec<String>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            show_hidden: true,
            exclude: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| TnetError::Config {
            reason: format!("Failed to parse config: {}", e),
        })?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| TnetError::Config {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "tnet").ok_or_else(|| TnetError::Config {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(dirs.config_dir().join("tnet.toml"))
    }

    /// Reject settings that would break workspace storage.
    pub fn validate(&self) -> Result<()> {
        let dir = self.workspace.settings_dir.as_str();
        let is_single_component = !dir.is_empty()
            && dir != "."
            && dir != ".."
            && !dir.contains(['/', '\\']);
        if !is_single_component {
            return Err(TnetError::Config {
                reason: format!("settings_dir must be a single directory name, got {:?}", dir),
            });
        }
        self.tree_options().map(|_| ())
    }

    /// Tree listing options described by the `[tree]` section.
    pub fn tree_options(&self) -> Result<TreeOptions> {
        TreeOptions::default()
            .with_hidden(self.tree.show_hidden)
            .with_exclude_patterns(&self.tree.exclude)
    }
}
