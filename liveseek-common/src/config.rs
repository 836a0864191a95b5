//! Configuration file discovery and loading
//!
//! Config path resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `LIVESEEK_CONFIG` environment variable
//! 3. User config file (`<config_dir>/liveseek/config.toml`)
//! 4. System config file (`/etc/liveseek/config.toml`, Linux only)
//!
//! No config file is not an error: callers fall back to built-in defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LIVESEEK_CONFIG";

/// Resolve which config file to read, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join("liveseek").join("config.toml")) {
        if path.exists() {
            return Some(path);
        }
    }

    // Priority 4: System-wide config
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/liveseek/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    debug!("No liveseek config file found");
    None
}

/// Read and deserialize a TOML file
pub fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let value = toml::from_str(&content)?;
    info!("Loaded TOML configuration from {:?}", path);
    Ok(value)
}
