use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable that points at an alternate settings file.
pub const SETTINGS_ENV: &str = "PERMC_CONFIG";

/// User settings (`settings.toml`).
///
/// Relative paths are resolved against the directory holding the settings
/// file, so a settings file can ship next to its catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Catalog JSON exported from the metadata service.
    pub catalog: Option<PathBuf>,

    /// Template definitions (TOML or JSON).
    pub templates: Option<PathBuf>,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(SETTINGS_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("permcascade")
            .join("settings.toml")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing file yields defaults; a
    /// malformed one is logged and also yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::from_toml(&contents) {
            Ok(settings) => settings.resolve_relative_to(path.parent().unwrap_or(Path::new("."))),
            Err(e) => {
                log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// Save settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
        let body = toml::to_string_pretty(self).map_err(|e| ConfigError::parse(path, e))?;
        fs::write(path, body).map_err(|e| ConfigError::io(path, e))
    }

    fn resolve_relative_to(mut self, base: &Path) -> Self {
        for slot in [&mut self.catalog, &mut self.templates] {
            if let Some(p) = slot.as_ref().filter(|p| p.is_relative()) {
                *slot = Some(base.join(p));
            }
        }
        self
    }
}
