//! Error types for liveseek-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Engine errors reported through the event stream are not `Error` values: they
//! are classified by `liveseek_common::ErrorKind` and handled by the reconnect
//! supervisor.

use thiserror::Error;

/// Main error type for liveseek-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from the shared liveseek-common crate
    #[error(transparent)]
    Common(#[from] liveseek_common::Error),

    /// Base URL could not be parsed
    #[error("Invalid stream URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The stream URL provider failed to produce a base URL
    #[error("Stream URL provider failed: {0}")]
    StreamUrl(String),

    /// The engine factory could not construct an engine
    ///
    /// Non-fatal: the session stays usable and a later load may succeed.
    #[error("Engine instantiation failed: {0}")]
    EngineInstantiation(String),

    /// An engine control call failed
    #[error("Engine error: {0}")]
    Engine(String),

    /// No source URL has been set
    #[error("No playback source set")]
    NoSource,
}

/// Convenience Result type using liveseek-player Error
pub type Result<T> = std::result::Result<T, Error>;
