//! # liveseek Player Library (liveseek-player)
//!
//! Playback controller for progressive live streams (FLV over HTTP).
//!
//! **Purpose:** Present a seekable, rate-adjustable timeline over a stream the
//! decode engine can only play forward. Seeks and rate changes re-acquire the
//! stream from the server with `offset`/`speed` query parameters, and a
//! virtual timeline keeps the user-facing clock continuous across reloads.
//!
//! **Module Structure:**
//! - `session`: the host-facing `PlaybackSession` and its event loop
//! - `engine`: engine seam, single-engine lifecycle, simulated engine
//! - `timeline`: base offset + engine clock, cached duration
//! - `source`: stream URL building
//! - `seek`, `rate`, `reconnect`, `watchdog`: deferred-work coordinators
//! - `provider`: fresh stream URL sources
//! - `state`: generation counter, flags and the outward event bus

pub mod config;
pub mod engine;
pub mod error;
pub mod provider;
pub mod rate;
pub mod reconnect;
pub mod seek;
pub mod session;
pub mod source;
pub mod state;
pub mod timeline;
pub mod watchdog;

pub use config::PlayerConfig;
pub use error::{Error, Result};
pub use session::{PlaybackSession, SessionBuilder};
pub use state::SharedState;
