//! Event types for the liveseek outward event stream
//!
//! These are the events a host UI layer consumes. Internal engine events are
//! defined in `liveseek_player::engine` and converted to `PlayerEvent` by the
//! playback session before broadcasting.

use crate::time::now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an engine error
///
/// `Network` and `Media` are potentially recoverable for live streams while
/// the reconnect budget lasts. `Other` is never auto-recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Media,
    Other,
}

impl ErrorKind {
    /// True for the kinds the reconnect supervisor may retry
    pub fn is_recoverable(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Media)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Media => write!(f, "media"),
            ErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Outward player events
///
/// Time values are seconds on the virtual timeline. Non-finite durations
/// (live streams) serialize as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Terminal error: not recoverable, or the reconnect budget is spent
    Error {
        kind: ErrorKind,
        detail: String,
        current_time: f64,
        duration: f64,
        last_seek_target: f64,
        timestamp: DateTime<Utc>,
    },

    /// A playback rate change was requested
    RateChange {
        rate: f64,
        timestamp: DateTime<Utc>,
    },

    /// Current time changed
    ///
    /// `manually_triggered` is set when the change came from a seek request
    /// rather than from the engine clock.
    TimeUpdate {
        current_time: f64,
        manually_triggered: bool,
        timestamp: DateTime<Utc>,
    },

    /// Buffering (waiting) status changed
    Buffering {
        active: bool,
        timestamp: DateTime<Utc>,
    },

    /// Duration reported by stream metadata
    ///
    /// Hosts hide rate controls while `live` is set.
    DurationChanged {
        duration: f64,
        live: bool,
        timestamp: DateTime<Utc>,
    },

    /// A reconnect attempt has been scheduled
    Reconnecting {
        attempt: u32,
        max_attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// A new engine instance was created for the session
    Loaded {
        generation: u64,
        timestamp: DateTime<Utc>,
    },
}

impl PlayerEvent {
    /// Event name as seen by hosts (mirrors the serde tag)
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::Error { .. } => "Error",
            PlayerEvent::RateChange { .. } => "RateChange",
            PlayerEvent::TimeUpdate { .. } => "TimeUpdate",
            PlayerEvent::Buffering { .. } => "Buffering",
            PlayerEvent::DurationChanged { .. } => "DurationChanged",
            PlayerEvent::Reconnecting { .. } => "Reconnecting",
            PlayerEvent::Loaded { .. } => "Loaded",
        }
    }

    pub fn error(
        kind: ErrorKind,
        detail: impl Into<String>,
        current_time: f64,
        duration: f64,
        last_seek_target: f64,
    ) -> Self {
        PlayerEvent::Error {
            kind,
            detail: detail.into(),
            current_time,
            duration,
            last_seek_target,
            timestamp: now(),
        }
    }

    pub fn rate_change(rate: f64) -> Self {
        PlayerEvent::RateChange {
            rate,
            timestamp: now(),
        }
    }

    pub fn time_update(current_time: f64, manually_triggered: bool) -> Self {
        PlayerEvent::TimeUpdate {
            current_time,
            manually_triggered,
            timestamp: now(),
        }
    }

    pub fn buffering(active: bool) -> Self {
        PlayerEvent::Buffering {
            active,
            timestamp: now(),
        }
    }

    pub fn duration_changed(duration: f64, live: bool) -> Self {
        PlayerEvent::DurationChanged {
            duration,
            live,
            timestamp: now(),
        }
    }

    pub fn reconnecting(attempt: u32, max_attempts: u32) -> Self {
        PlayerEvent::Reconnecting {
            attempt,
            max_attempts,
            timestamp: now(),
        }
    }

    pub fn loaded(generation: u64) -> Self {
        PlayerEvent::Loaded {
            generation,
            timestamp: now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;

    #[test]
    fn test_recoverable_kinds() {
        assert!(ErrorKind::Network.is_recoverable());
        assert!(ErrorKind::Media.is_recoverable());
        assert!(!ErrorKind::Other.is_recoverable());
    }

    #[test]
    fn test_error_event_serializes_with_tag() {
        let event = PlayerEvent::Error {
            kind: ErrorKind::Network,
            detail: "connection reset".to_string(),
            current_time: 12.5,
            duration: f64::INFINITY,
            last_seek_target: 10.0,
            timestamp: now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["kind"], "network");
        assert_eq!(json["current_time"], 12.5);
        // Live durations have no JSON representation
        assert!(json["duration"].is_null());
    }

    #[test]
    fn test_event_name_matches_tag() {
        let event = PlayerEvent::TimeUpdate {
            current_time: 3.0,
            manually_triggered: true,
            timestamp: now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
    }

    #[test]
    fn test_constructors() {
        let event = PlayerEvent::reconnecting(2, 3);
        assert!(matches!(
            event,
            PlayerEvent::Reconnecting {
                attempt: 2,
                max_attempts: 3,
                ..
            }
        ));
        assert_eq!(PlayerEvent::loaded(4).name(), "Loaded");
        assert_eq!(PlayerEvent::buffering(true).name(), "Buffering");
    }
}
