//! Test helpers for liveseek-player integration tests
//!
//! - `TestSession`: a session over the simulated engine plus its event stream
//! - `GatedUrlProvider`: a URL provider that blocks until its gate is opened
//! - `settle`: let spawned tasks run without moving past any real timer

#![allow(dead_code)]

use async_trait::async_trait;
use liveseek_common::PlayerEvent;
use liveseek_player::engine::sim::SimEngineFactory;
use liveseek_player::provider::StreamUrlProvider;
use liveseek_player::{Error, PlaybackSession, PlayerConfig, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

pub const STREAM_URL: &str = "http://live.example.com/room/1.flv";

pub fn test_config() -> PlayerConfig {
    PlayerConfig {
        stream_url: Some(STREAM_URL.to_string()),
        reconn_times: 3,
        reconn_interval_ms: 1000,
        ..Default::default()
    }
}

pub struct TestSession {
    pub session: PlaybackSession,
    pub factory: SimEngineFactory,
    pub events: broadcast::Receiver<PlayerEvent>,
}

impl TestSession {
    pub fn new(factory: SimEngineFactory) -> Self {
        Self::with_config(factory, test_config())
    }

    pub fn with_config(factory: SimEngineFactory, config: PlayerConfig) -> Self {
        let session = PlaybackSession::builder(config)
            .engine_factory(factory.clone())
            .build()
            .expect("session should build");
        Self::wrap(session, factory)
    }

    pub fn with_provider(
        factory: SimEngineFactory,
        provider: impl StreamUrlProvider + 'static,
    ) -> Self {
        let session = PlaybackSession::builder(test_config())
            .engine_factory(factory.clone())
            .url_provider(provider)
            .build()
            .expect("session should build");
        Self::wrap(session, factory)
    }

    fn wrap(session: PlaybackSession, factory: SimEngineFactory) -> Self {
        let events = session.subscribe();
        Self {
            session,
            factory,
            events,
        }
    }

    /// All events broadcast since the last call
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn count_events(&mut self, name: &str) -> usize {
        self.drain_events()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }
}

/// Let ready tasks run (event loop, zero-debounce seeks, URL fetches)
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Releases every pending and future `GatedUrlProvider::stream_url` call
pub struct Gate(watch::Sender<bool>);

impl Gate {
    pub fn open(&self) {
        let _ = self.0.send(true);
    }
}

pub struct GatedUrlProvider {
    url: String,
    open: watch::Receiver<bool>,
    calls: Arc<AtomicU32>,
}

impl GatedUrlProvider {
    pub fn calls(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl StreamUrlProvider for GatedUrlProvider {
    async fn stream_url(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut open = self.open.clone();
        open.wait_for(|open| *open)
            .await
            .map_err(|_| Error::StreamUrl("gate dropped".to_string()))?;
        Ok(self.url.clone())
    }
}

pub fn gated_provider(url: &str) -> (GatedUrlProvider, Gate) {
    let (tx, rx) = watch::channel(false);
    let provider = GatedUrlProvider {
        url: url.to_string(),
        open: rx,
        calls: Arc::new(AtomicU32::new(0)),
    };
    (provider, Gate(tx))
}
