//! Engine seam
//!
//! **Module Structure:**
//! - `mod.rs`: the `Engine`/`EngineFactory` traits and the engine event set
//! - `lifecycle.rs`: ownership of the single live engine instance
//! - `sim.rs`: a scriptable in-process engine for the binary and tests
//!
//! The decode/demux engine is a black box. The controller holds it behind
//! `Engine` by composition and learns about it only through `EngineEvent`s.

mod lifecycle;
pub mod sim;

pub use lifecycle::EngineLifecycle;

use crate::error::Result;
use crate::source::StreamDescriptor;
use liveseek_common::ErrorKind;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Output sink the engine renders into (opaque to the controller)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSink {
    id: String,
}

impl OutputSink {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// A closed time range in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Clamp `seconds` into `[start, end]`
    pub fn clamp(&self, seconds: f64) -> f64 {
        let seconds = if seconds > self.start { seconds } else { self.start };
        if seconds < self.end {
            seconds
        } else {
            self.end
        }
    }
}

/// How much media the engine has ready (mirrors HTML media ready states)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    /// Enough data to start playing without an immediate stall
    pub fn can_play(self) -> bool {
        self > ReadyState::HaveCurrentData
    }
}

/// Stream information reported once the container header is parsed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub mime_type: Option<String>,
    pub has_audio: bool,
    pub has_video: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f64>,
}

/// Events emitted by an engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Stream metadata parsed; `duration` is NaN/infinite for live streams
    MetadataArrived { duration: f64 },
    /// Informational only
    MediaInfoArrived { info: MediaInfo },
    /// First media data decoded after a load
    DataArrived,
    /// Engine failure
    Error { kind: ErrorKind, detail: String },
    /// Enough data buffered to play
    CanPlay,
    /// Playback started or resumed
    Playing,
    /// Playback paused
    Paused,
    /// Playback stalled waiting for data
    Waiting,
    /// Stream reached its end
    Ended,
}

/// An engine event tagged with the session generation of its engine
#[derive(Debug, Clone)]
pub struct EngineEnvelope {
    pub generation: u64,
    pub event: EngineEvent,
}

/// Event sender handed to an engine at construction
///
/// Every event is stamped with the generation the engine was created under,
/// so events from a discarded engine can be recognized and dropped.
#[derive(Debug, Clone)]
pub struct EngineEventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<EngineEnvelope>,
}

impl EngineEventSender {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<EngineEnvelope>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Send an event; returns false once the session has gone away
    pub fn send(&self, event: EngineEvent) -> bool {
        self.tx
            .send(EngineEnvelope {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Control surface of a decode engine
///
/// Teardown calls (`unload`, `detach`, `destroy`) may fail; the lifecycle logs
/// those failures and carries on.
pub trait Engine: Send {
    fn attach(&mut self, sink: &OutputSink) -> Result<()>;
    fn detach(&mut self) -> Result<()>;
    fn load(&mut self) -> Result<()>;
    fn unload(&mut self) -> Result<()>;
    fn destroy(&mut self) -> Result<()>;

    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn paused(&self) -> bool;
    fn ended(&self) -> bool;
    fn ready_state(&self) -> ReadyState;

    /// Engine clock in seconds, starting at zero for each acquisition
    fn current_time(&self) -> f64;
    /// Seek within already-buffered data (engine clock)
    fn set_current_time(&mut self, seconds: f64);
    /// Raw engine duration; NaN or infinite for live streams
    fn duration(&self) -> f64;
    /// Seekable range on the engine clock, if the engine knows one
    fn seekable(&self) -> Option<TimeRange>;

    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);
}

/// Constructs engines bound to a stream descriptor
pub trait EngineFactory: Send + Sync {
    fn create(
        &self,
        descriptor: &StreamDescriptor,
        events: EngineEventSender,
    ) -> Result<Box<dyn Engine>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_clamp() {
        let range = TimeRange::new(10.0, 100.0);
        assert_eq!(range.clamp(150.0), 100.0);
        assert_eq!(range.clamp(5.0), 10.0);
        assert_eq!(range.clamp(42.0), 42.0);
    }

    #[test]
    fn test_ready_state_can_play() {
        assert!(!ReadyState::HaveCurrentData.can_play());
        assert!(ReadyState::HaveFutureData.can_play());
        assert!(ReadyState::HaveEnoughData.can_play());
    }

    #[tokio::test]
    async fn test_sender_stamps_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = EngineEventSender::new(7, tx);

        assert!(sender.send(EngineEvent::DataArrived));
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.generation, 7);
        assert_eq!(envelope.event, EngineEvent::DataArrived);

        drop(rx);
        assert!(!sender.send(EngineEvent::CanPlay));
    }
}
