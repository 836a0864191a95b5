//! # liveseek Common Library
//!
//! Shared code for the liveseek crates including:
//! - Outward event types (PlayerEvent enum)
//! - Engine error classification (ErrorKind)
//! - Configuration file discovery
//! - Time and offset conversion helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{ErrorKind, PlayerEvent};
