//! Application configuration management utilities.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

/// Application-wide configuration stored in config.toml.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Extracted game data tree (the directory containing `Icarus/Content`).
    pub source_dir: Option<Utf8PathBuf>,
    /// Install target, usually `<game>/Icarus/Content/Paks/mods`.
    pub output_dir: Option<Utf8PathBuf>,
    /// Managed mods, lowest priority first.
    pub mods: Vec<ModEntry>,
}

/// One managed mod file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModEntry {
    pub path: Utf8PathBuf,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ModEntry {
    pub fn enabled(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            enabled: true,
        }
    }
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the default configuration file path (config.toml).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join("config.toml"))
}

/// Loads the application configuration from config.toml.
/// Returns default configuration if file doesn't exist or cannot be parsed.
pub fn load_config() -> AppConfig {
    default_config_path()
        .map(|path| load_config_from(&path))
        .unwrap_or_default()
}

pub fn load_config_from(path: &Utf8Path) -> AppConfig {
    if !path.exists() {
        return AppConfig::default();
    }
    match fs::read_to_string(path).map(|content| toml::from_str(&content)) {
        Ok(Ok(cfg)) => cfg,
        Ok(Err(e)) => {
            tracing::warn!("Ignoring malformed {}: {}", path, e);
            AppConfig::default()
        }
        Err(e) => {
            tracing::warn!("Could not read {}: {}", path, e);
            AppConfig::default()
        }
    }
}
