use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{Result, SqlGateError};
use crate::registry::DriverRegistry;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub drivers: Option<DriversConfig>,
}

/// Driver search configuration.
#[derive(Debug, Deserialize)]
pub struct DriversConfig {
    /// Directories to scan for dynamic driver libraries, in order.
    pub path: Option<Vec<String>>,
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| SqlGateError::Config(e.to_string()))
}

/// Default location of the configuration file, under the platform's
/// configuration directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sqlgate").join("config.toml"))
}

/// Applies the configuration to a registry: existing directories are
/// appended to the search path, missing ones are logged and skipped.
pub fn apply_config(config: &Config, registry: &DriverRegistry) {
    let paths = config
        .drivers
        .as_ref()
        .and_then(|drivers| drivers.path.as_ref());
    let Some(paths) = paths else {
        return;
    };

    for path in paths {
        let dir = PathBuf::from(path);
        if dir.is_dir() {
            registry.add_search_directory(dir);
        } else {
            tracing::warn!("configured driver path {:?} is not a directory; skipping", path);
        }
    }
}
