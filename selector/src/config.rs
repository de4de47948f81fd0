//! Configuration for the profile selector.
//!
//! PSEL_ROOT resolution order:
//! 1. Explicit path passed to Config::with_root()
//! 2. PSEL_ROOT environment variable
//! 3. Platform data directory (XDG data dir on Linux, via `directories`)
//! 4. Fallback: ~/.local/share/psel

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::labels::StaticLabelValues;
use crate::time_range::TimeSelection;
use crate::{Error, Result};

/// Selector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory holding config.toml.
    #[serde(skip)]
    pub root: PathBuf,

    /// Time selection used when none has been chosen.
    #[serde(default = "default_time_selection")]
    pub default_time_selection: String,

    /// Profile type every query is pinned to (empty = not enforced).
    #[serde(default)]
    pub enforced_profile_name: String,

    /// chrono format for custom range labels.
    #[serde(default = "default_time_format")]
    pub time_format: String,

    /// Known label values, keyed by label name.
    #[serde(default)]
    pub labels: BTreeMap<String, Vec<String>>,
}

fn default_time_selection() -> String {
    TimeSelection::LastHour.key().to_string()
}

fn default_time_format() -> String {
    "%Y-%m-%d %H:%M".to_string()
}

impl Config {
    /// Create a new config with the given root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_time_selection: default_time_selection(),
            enforced_profile_name: String::new(),
            time_format: default_time_format(),
            labels: BTreeMap::new(),
        }
    }

    /// Create a default config at the resolved PSEL_ROOT.
    pub fn default_location() -> Result<Self> {
        let root = resolve_root()?;
        Ok(Self::with_root(root))
    }

    /// Load config from PSEL_ROOT/config.toml, or create default.
    pub fn load() -> Result<Self> {
        let root = resolve_root()?;
        Self::load_from(&root)
    }

    /// Load config from a specific root.
    pub fn load_from(root: &Path) -> Result<Self> {
        let config_path = root.join("config.toml");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let mut config: Config = toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
            config.root = root.to_path_buf();
            // Surface a bad default early rather than at first use
            config.time_selection()?;
            config.check_time_format()?;
            Ok(config)
        } else {
            Ok(Self::with_root(root))
        }
    }

    /// Save config to PSEL_ROOT/config.toml.
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(self.config_path(), contents)?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// The configured default time selection.
    pub fn time_selection(&self) -> Result<TimeSelection> {
        self.default_time_selection.parse().map_err(|_| {
            Error::Config(format!(
                "Unknown default_time_selection '{}'",
                self.default_time_selection
            ))
        })
    }

    fn check_time_format(&self) -> Result<()> {
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::Config(format!(
                "Invalid time_format '{}'",
                self.time_format
            )));
        }
        Ok(())
    }

    /// Label values source backed by the `[labels]` table.
    pub fn label_values(&self) -> StaticLabelValues {
        StaticLabelValues::new(self.labels.clone())
    }
}

/// Resolve PSEL_ROOT using the standard resolution order.
fn resolve_root() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("PSEL_ROOT") {
        return Ok(PathBuf::from(path));
    }

    if let Some(proj_dirs) = ProjectDirs::from("", "", "psel") {
        return Ok(proj_dirs.data_dir().to_path_buf());
    }

    let home = std::env::var("HOME")
        .map_err(|_| Error::Config("Could not determine home directory".to_string()))?;
    Ok(PathBuf::from(home).join(".local/share/psel"))
}
