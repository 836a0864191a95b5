//! Shared session state
//!
//! Lock-free pieces of session state shared between the public surface, the
//! engine event loop and the timer tasks.
//!
//! **Responsibilities:**
//! - Own the session generation counter
//! - Track buffering and "resume when ready" flags
//! - Broadcast outward player events

use liveseek_common::PlayerEvent;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Monotonic counter identifying the current engine instance
///
/// Advanced on every destroy/reload. Deferred work captures the value when it
/// is issued and becomes a no-op once the counter has moved on.
#[derive(Debug, Default)]
pub struct SessionGeneration(AtomicU64);

impl SessionGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Advance and return the new generation
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, issued: u64) -> bool {
        self.current() == issued
    }
}

pub struct SharedState {
    pub generation: SessionGeneration,

    /// Waiting for a (re-)acquired stream to become playable
    buffering: AtomicBool,

    /// Start playback as soon as the engine can play
    need_play: AtomicBool,

    /// Outward event broadcaster
    pub event_tx: broadcast::Sender<PlayerEvent>,
}

impl SharedState {
    pub fn new(event_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));
        Self {
            generation: SessionGeneration::new(),
            buffering: AtomicBool::new(false),
            need_play: AtomicBool::new(false),
            event_tx,
        }
    }

    /// Broadcast an event to all subscribers
    pub fn broadcast_event(&self, event: PlayerEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    pub fn buffering(&self) -> bool {
        self.buffering.load(Ordering::SeqCst)
    }

    /// Update the buffering flag, emitting `Buffering` when it changes
    pub fn set_buffering(&self, active: bool) {
        if self.buffering.swap(active, Ordering::SeqCst) != active {
            self.broadcast_event(PlayerEvent::buffering(active));
        }
    }

    pub fn need_play(&self) -> bool {
        self.need_play.load(Ordering::SeqCst)
    }

    pub fn set_need_play(&self, value: bool) {
        self.need_play.store(value, Ordering::SeqCst);
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(100)
    }
}
