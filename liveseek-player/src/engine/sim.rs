//! Simulated engine
//!
//! An in-process engine with a scriptable clock and event stream. The binary
//! uses it (with `with_auto_events`) to demonstrate a session end to end; the
//! tests use it to observe what the controller asked the engine to do.
//!
//! `SimEngineFactory` is both the factory handed to the session and the
//! handle used to drive and inspect the engines it created. Clones share state.

use super::{
    Engine, EngineEvent, EngineEventSender, EngineFactory, MediaInfo, OutputSink, ReadyState,
    TimeRange,
};
use crate::error::{Error, Result};
use crate::source::StreamDescriptor;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone)]
struct SimEngineState {
    sink: Option<String>,
    loaded: bool,
    destroyed: bool,
    paused: bool,
    ended: bool,
    ready_state: ReadyState,
    current_time: f64,
    duration: f64,
    seekable: Option<TimeRange>,
    playback_rate: f64,
    play_calls: u32,
    pause_calls: u32,
}

#[derive(Debug)]
struct SimShared {
    auto_events: bool,
    default_duration: f64,
    default_seekable: Option<TimeRange>,
    default_ready_state: ReadyState,
    fail_next_create: bool,
    fail_teardown: bool,
    created: Vec<StreamDescriptor>,
    senders: Vec<EngineEventSender>,
    engines: Vec<SimEngineState>,
    live: usize,
    max_live: usize,
    destroyed: usize,
}

/// Factory and control handle for simulated engines
#[derive(Clone)]
pub struct SimEngineFactory {
    shared: Arc<Mutex<SimShared>>,
}

impl Default for SimEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEngineFactory {
    /// Live stream engine (infinite duration) that emits nothing on its own
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(SimShared {
                auto_events: false,
                default_duration: f64::INFINITY,
                default_seekable: Some(TimeRange::new(0.0, 0.0)),
                default_ready_state: ReadyState::HaveNothing,
                fail_next_create: false,
                fail_teardown: false,
                created: Vec::new(),
                senders: Vec::new(),
                engines: Vec::new(),
                live: 0,
                max_live: 0,
                destroyed: 0,
            })),
        }
    }

    /// Engines announce metadata, data and readiness as soon as they load
    ///
    /// Metadata is only announced for acquisitions at offset zero, like a
    /// re-acquired live stream that does not repeat its header.
    pub fn with_auto_events(self) -> Self {
        self.shared.lock().auto_events = true;
        self
    }

    pub fn with_duration(self, duration: f64) -> Self {
        self.shared.lock().default_duration = duration;
        self
    }

    pub fn with_seekable(self, range: Option<TimeRange>) -> Self {
        self.shared.lock().default_seekable = range;
        self
    }

    pub fn with_ready_state(self, ready_state: ReadyState) -> Self {
        self.shared.lock().default_ready_state = ready_state;
        self
    }

    pub fn fail_next_create(&self) {
        self.shared.lock().fail_next_create = true;
    }

    pub fn fail_teardown(&self, fail: bool) {
        self.shared.lock().fail_teardown = fail;
    }

    // === Inspection ===

    /// Descriptors of every engine created, in creation order
    pub fn created(&self) -> Vec<StreamDescriptor> {
        self.shared.lock().created.clone()
    }

    pub fn created_count(&self) -> usize {
        self.shared.lock().created.len()
    }

    pub fn last_descriptor(&self) -> Option<StreamDescriptor> {
        self.shared.lock().created.last().cloned()
    }

    pub fn live_engines(&self) -> usize {
        self.shared.lock().live
    }

    /// Highest number of simultaneously live engines ever observed
    pub fn max_live_engines(&self) -> usize {
        self.shared.lock().max_live
    }

    pub fn destroyed_count(&self) -> usize {
        self.shared.lock().destroyed
    }

    pub fn play_calls(&self) -> u32 {
        self.with_latest(|e| e.play_calls).unwrap_or(0)
    }

    pub fn pause_calls(&self) -> u32 {
        self.with_latest(|e| e.pause_calls).unwrap_or(0)
    }

    pub fn engine_time(&self) -> f64 {
        self.with_latest(|e| e.current_time).unwrap_or(0.0)
    }

    pub fn engine_rate(&self) -> f64 {
        self.with_latest(|e| e.playback_rate).unwrap_or(1.0)
    }

    pub fn is_paused(&self) -> bool {
        self.with_latest(|e| e.paused).unwrap_or(true)
    }

    pub fn sink(&self) -> Option<String> {
        self.with_latest(|e| e.sink.clone()).flatten()
    }

    // === Driving the latest engine ===

    /// Emit an event from the most recently created engine
    pub fn emit(&self, event: EngineEvent) -> bool {
        let sender = self.shared.lock().senders.last().cloned();
        match sender {
            Some(sender) => sender.send(event),
            None => false,
        }
    }

    /// Emit an event from the engine created `index`-th (zero based)
    pub fn emit_from(&self, index: usize, event: EngineEvent) -> bool {
        let sender = self.shared.lock().senders.get(index).cloned();
        match sender {
            Some(sender) => sender.send(event),
            None => false,
        }
    }

    pub fn set_engine_time(&self, seconds: f64) {
        self.with_latest_mut(|e| e.current_time = seconds);
    }

    pub fn set_duration(&self, duration: f64) {
        self.with_latest_mut(|e| e.duration = duration);
    }

    pub fn set_seekable(&self, range: Option<TimeRange>) {
        self.with_latest_mut(|e| e.seekable = range);
    }

    pub fn set_ready_state(&self, ready_state: ReadyState) {
        self.with_latest_mut(|e| e.ready_state = ready_state);
    }

    pub fn set_paused(&self, paused: bool) {
        self.with_latest_mut(|e| e.paused = paused);
    }

    pub fn set_ended(&self, ended: bool) {
        self.with_latest_mut(|e| e.ended = ended);
    }

    /// Advance the clock of the latest engine if it is playing
    pub fn tick(&self, elapsed_seconds: f64) {
        self.with_latest_mut(|e| {
            if !e.paused && !e.destroyed && !e.ended {
                e.current_time += elapsed_seconds * e.playback_rate;
                if let Some(range) = e.seekable.as_mut() {
                    if range.end < e.current_time {
                        range.end = e.current_time;
                    }
                }
            }
        });
    }

    fn with_latest<R>(&self, f: impl FnOnce(&SimEngineState) -> R) -> Option<R> {
        self.shared.lock().engines.last().map(f)
    }

    fn with_latest_mut(&self, f: impl FnOnce(&mut SimEngineState)) {
        if let Some(engine) = self.shared.lock().engines.last_mut() {
            f(engine);
        }
    }
}

impl EngineFactory for SimEngineFactory {
    fn create(
        &self,
        descriptor: &StreamDescriptor,
        events: EngineEventSender,
    ) -> Result<Box<dyn Engine>> {
        let mut shared = self.shared.lock();
        if shared.fail_next_create {
            shared.fail_next_create = false;
            return Err(Error::Engine("simulated instantiation failure".to_string()));
        }

        let state = SimEngineState {
            sink: None,
            loaded: false,
            destroyed: false,
            paused: true,
            ended: false,
            ready_state: ReadyState::HaveNothing,
            current_time: 0.0,
            duration: shared.default_duration,
            seekable: shared.default_seekable,
            playback_rate: 1.0,
            play_calls: 0,
            pause_calls: 0,
        };

        let index = shared.engines.len();
        shared.engines.push(state);
        shared.created.push(descriptor.clone());
        shared.senders.push(events.clone());
        shared.live += 1;
        shared.max_live = shared.max_live.max(shared.live);
        trace!("Simulated engine {} created for {}", index, descriptor.url());

        Ok(Box::new(SimEngine {
            index,
            offset_ms: descriptor.offset_ms(),
            events,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct SimEngine {
    index: usize,
    offset_ms: u64,
    events: EngineEventSender,
    shared: Arc<Mutex<SimShared>>,
}

impl SimEngine {
    fn read<R>(&self, f: impl FnOnce(&SimEngineState) -> R) -> R {
        f(&self.shared.lock().engines[self.index])
    }

    fn write<R>(&self, f: impl FnOnce(&mut SimEngineState) -> R) -> R {
        f(&mut self.shared.lock().engines[self.index])
    }

    fn teardown_result(&self, step: &str) -> Result<()> {
        if self.shared.lock().fail_teardown {
            Err(Error::Engine(format!("simulated {} failure", step)))
        } else {
            Ok(())
        }
    }
}

impl Engine for SimEngine {
    fn attach(&mut self, sink: &OutputSink) -> Result<()> {
        self.write(|e| e.sink = Some(sink.id().to_string()));
        Ok(())
    }

    fn detach(&mut self) -> Result<()> {
        self.write(|e| e.sink = None);
        self.teardown_result("detach")
    }

    fn load(&mut self) -> Result<()> {
        let (auto_events, ready_state, duration) = {
            let shared = self.shared.lock();
            (
                shared.auto_events,
                shared.default_ready_state,
                shared.default_duration,
            )
        };
        self.write(|e| {
            e.loaded = true;
            e.ready_state = ready_state;
        });

        if auto_events {
            if self.offset_ms == 0 {
                self.events.send(EngineEvent::MetadataArrived { duration });
                self.events.send(EngineEvent::MediaInfoArrived {
                    info: MediaInfo {
                        mime_type: Some("video/x-flv".to_string()),
                        has_audio: true,
                        has_video: true,
                        width: Some(1280),
                        height: Some(720),
                        frame_rate: Some(25.0),
                    },
                });
            } else {
                self.write(|e| e.duration = f64::NAN);
            }
            self.write(|e| e.ready_state = ReadyState::HaveEnoughData);
            self.events.send(EngineEvent::DataArrived);
            self.events.send(EngineEvent::CanPlay);
        }
        Ok(())
    }

    fn unload(&mut self) -> Result<()> {
        self.write(|e| {
            e.loaded = false;
            e.paused = true;
        });
        self.teardown_result("unload")
    }

    fn destroy(&mut self) -> Result<()> {
        {
            let mut guard = self.shared.lock();
            let shared = &mut *guard;
            let engine = &mut shared.engines[self.index];
            if !engine.destroyed {
                engine.destroyed = true;
                shared.live -= 1;
                shared.destroyed += 1;
            }
        }
        self.teardown_result("destroy")
    }

    fn play(&mut self) -> Result<()> {
        if self.read(|e| e.destroyed || !e.loaded) {
            return Err(Error::Engine("engine not loaded".to_string()));
        }
        self.write(|e| {
            e.paused = false;
            e.play_calls += 1;
        });
        self.events.send(EngineEvent::Playing);
        Ok(())
    }

    fn pause(&mut self) {
        self.write(|e| {
            e.paused = true;
            e.pause_calls += 1;
        });
        self.events.send(EngineEvent::Paused);
    }

    fn paused(&self) -> bool {
        self.read(|e| e.paused)
    }

    fn ended(&self) -> bool {
        self.read(|e| e.ended)
    }

    fn ready_state(&self) -> ReadyState {
        self.read(|e| e.ready_state)
    }

    fn current_time(&self) -> f64 {
        self.read(|e| e.current_time)
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.write(|e| e.current_time = seconds.max(0.0));
    }

    fn duration(&self) -> f64 {
        self.read(|e| e.duration)
    }

    fn seekable(&self) -> Option<TimeRange> {
        self.read(|e| e.seekable)
    }

    fn playback_rate(&self) -> f64 {
        self.read(|e| e.playback_rate)
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.write(|e| e.playback_rate = rate);
    }
}
