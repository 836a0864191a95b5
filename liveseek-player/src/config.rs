//! Configuration for the liveseek playback controller
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (binary only)
//! 2. TOML configuration file (see `liveseek_common::config::resolve_config_path`)
//! 3. Built-in defaults (code constants)
//!
//! The stream URL provider is not a file
//! setting: it is passed to `SessionBuilder` as a `StreamUrlProvider`.

use crate::error::{Error, Result};
use liveseek_common::time::millis_to_duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Playback controller configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Maximum reconnect attempts for a live stream before the error surfaces
    pub reconn_times: u32,

    /// Delay before each reconnect attempt (milliseconds)
    pub reconn_interval_ms: u64,

    /// Quiet period before a seek triggers re-acquisition (milliseconds)
    ///
    /// Zero still collapses seeks issued back-to-back in the same tick.
    pub seek_debounce_ms: u64,

    /// Start playback as soon as the engine can play
    pub autoplay: bool,

    /// Default source URL (optional)
    pub stream_url: Option<String>,

    /// Outward event channel capacity
    pub event_capacity: usize,

    /// Platform behavior used to select the resume strategy
    pub platform: PlatformConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Platform capabilities, computed once per session
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Platform does not resume playback on its own after a live stall
    pub suppresses_auto_resume: bool,

    /// Readiness poll cadence for the polling resume strategy (milliseconds)
    pub resume_poll_interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            reconn_times: 3,
            reconn_interval_ms: 1000,
            seek_debounce_ms: 0,
            autoplay: false,
            stream_url: None,
            event_capacity: 100,
            platform: PlatformConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PlatformConfig {
    /// Resume poll cadence as Duration
    pub fn resume_poll_interval(&self) -> Duration {
        millis_to_duration(self.resume_poll_interval_ms)
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            suppresses_auto_resume: false,
            resume_poll_interval_ms: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl PlayerConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlayerConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let config: PlayerConfig = liveseek_common::config::read_toml(path)?;
        config.validate()?;
        info!(
            "Player config: reconn_times={}, reconn_interval={}ms, seek_debounce={}ms",
            config.reconn_times, config.reconn_interval_ms, config.seek_debounce_ms
        );
        Ok(config)
    }

    /// Load from the resolved config path, or fall back to defaults
    pub fn load_or_default(cli_path: Option<&Path>) -> Result<Self> {
        match liveseek_common::config::resolve_config_path(cli_path) {
            Some(path) => Self::load(&path),
            None => {
                info!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }
        if self.platform.suppresses_auto_resume && self.platform.resume_poll_interval_ms == 0 {
            return Err(Error::Config(
                "resume_poll_interval_ms must be non-zero when suppresses_auto_resume is set"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Reconnect delay as Duration
    pub fn reconn_interval(&self) -> Duration {
        millis_to_duration(self.reconn_interval_ms)
    }

    /// Seek debounce window as Duration
    pub fn seek_debounce(&self) -> Duration {
        millis_to_duration(self.seek_debounce_ms)
    }
}
