//! Playback session
//!
//! Owns one engine slot, the virtual timeline and every deferred piece of
//! work (seek debounce, rate change, reconnect timer, resume poll).
//!
//! **Responsibilities:**
//! - Expose the host-facing playback surface (play, pause, seek, rate)
//! - Run the engine event loop and drop events from stale engines
//! - Make sure no deferred work acts on an engine it was not issued for
//!
//! **Generation rule:** every destroy/reload advances the session generation
//! under the lifecycle lock. Deferred work captures the generation when it is
//! issued and re-checks it under the same lock before touching the engine.
//!
//! **Lock order:** `lifecycle` first, then any of `timeline`, `rate`, `seek`,
//! `reconnect`. The lifecycle lock is never taken while another is held.

use crate::config::PlayerConfig;
use crate::engine::{
    EngineEnvelope, EngineEvent, EngineFactory, EngineLifecycle, OutputSink, ReadyState,
    TimeRange,
};
use crate::error::{Error, Result};
use crate::provider::{StaticUrl, StreamUrlProvider};
use crate::rate::{PlaybackRateController, RateTicket};
use crate::reconnect::{ReconnectDecision, ReconnectSupervisor};
use crate::seek::{SeekCoordinator, SeekPhase};
use crate::source::{supports_mime_type, PlaybackParams, StreamDescriptor};
use crate::state::SharedState;
use crate::timeline::{is_live_duration, VirtualTimeline};
use crate::watchdog::{
    select_strategy, PlaybackSignal, ResumeAction, ResumeContext, ResumeStrategy,
};
use liveseek_common::time::truncate_tenths;
use liveseek_common::{ErrorKind, PlayerEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Builder for `PlaybackSession`
pub struct SessionBuilder {
    config: PlayerConfig,
    factory: Option<Arc<dyn EngineFactory>>,
    urls: Option<Arc<dyn StreamUrlProvider>>,
    sink: OutputSink,
    strategy: Option<Box<dyn ResumeStrategy>>,
}

impl SessionBuilder {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            factory: None,
            urls: None,
            sink: OutputSink::new("default"),
            strategy: None,
        }
    }

    pub fn engine_factory(mut self, factory: impl EngineFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    pub fn url_provider(mut self, provider: impl StreamUrlProvider + 'static) -> Self {
        self.urls = Some(Arc::new(provider));
        self
    }

    pub fn sink(mut self, sink: OutputSink) -> Self {
        self.sink = sink;
        self
    }

    /// Override the strategy selected from `PlatformConfig`
    pub fn resume_strategy(mut self, strategy: Box<dyn ResumeStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Build the session and start its event loop
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Result<PlaybackSession> {
        let SessionBuilder {
            config,
            factory,
            urls,
            sink,
            strategy,
        } = self;

        config.validate()?;
        let factory =
            factory.ok_or_else(|| Error::Config("an engine factory is required".to_string()))?;
        let urls: Arc<dyn StreamUrlProvider> = match (urls, config.stream_url.as_deref()) {
            (Some(provider), _) => provider,
            (None, Some(url)) => Arc::new(StaticUrl::new(url)),
            (None, None) => {
                return Err(Error::Config(
                    "a stream URL provider or stream_url is required".to_string(),
                ))
            }
        };
        let resume = strategy.unwrap_or_else(|| select_strategy(&config.platform));

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let core = Arc::new(SessionCore {
            id: Uuid::new_v4(),
            state: SharedState::new(config.event_capacity),
            lifecycle: Mutex::new(EngineLifecycle::new(factory, sink, events_tx)),
            timeline: Mutex::new(VirtualTimeline::new()),
            reconnect: Mutex::new(ReconnectSupervisor::new(
                config.reconn_times,
                config.reconn_interval(),
            )),
            seek: Mutex::new(SeekCoordinator::new(config.seek_debounce())),
            rate: Mutex::new(PlaybackRateController::new()),
            resume,
            resume_task: Mutex::new(None),
            urls,
            src: Mutex::new(config.stream_url.clone()),
            config,
        });

        info!(
            "Playback session {} created (resume strategy: {})",
            core.id,
            core.resume.name()
        );

        let event_loop = tokio::spawn(run_event_loop(Arc::clone(&core), events_rx));
        Ok(PlaybackSession { core, event_loop })
    }
}

/// A live-stream playback session
pub struct PlaybackSession {
    core: Arc<SessionCore>,
    event_loop: JoinHandle<()>,
}

impl PlaybackSession {
    pub fn builder(config: PlayerConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    pub fn id(&self) -> Uuid {
        self.core.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.core.config
    }

    /// Record the source URL used by `load(None)` and `play()`
    pub fn set_src(&self, url: impl Into<String>) {
        *self.core.src.lock() = Some(url.into());
    }

    pub fn src(&self) -> Option<String> {
        self.core.src.lock().clone()
    }

    /// Load a stream
    ///
    /// `Some(url)` replaces the engine with one for `url` as given. `None`
    /// fully resets the session and loads the recorded source.
    pub fn load(&self, src: Option<&str>) -> Result<()> {
        self.core.load(src)
    }

    /// Start or resume playback
    pub async fn play(&self) -> Result<()> {
        let core = &self.core;
        if core.src.lock().is_none() {
            warn!("play() called without a playback source");
            return Ok(());
        }

        let next = {
            let lifecycle = core.lifecycle.lock();
            match lifecycle.engine() {
                None => PlayStep::Load,
                Some(engine) if engine.ended() => PlayStep::Restart,
                Some(engine) if engine.paused() => PlayStep::Resume,
                Some(_) => return Ok(()),
            }
        };

        match next {
            PlayStep::Load => {
                core.load(None)?;
                core.state.set_need_play(true);
                Ok(())
            }
            PlayStep::Restart => core.restart().await,
            PlayStep::Resume => core.resume(),
        }
    }

    pub fn pause(&self) {
        if let Some(engine) = self.core.lifecycle.lock().engine_mut() {
            engine.pause();
        }
    }

    /// Seek to `seconds` on the virtual timeline
    ///
    /// Clamped into `seekable()`; ignored when nothing is seekable.
    pub fn set_current_time(&self, seconds: f64) {
        self.core.set_current_time(seconds);
    }

    pub fn set_scrubbing(&self, scrubbing: bool) {
        if scrubbing {
            self.core.begin_scrub();
        } else {
            self.core.end_scrub();
        }
    }

    pub fn begin_scrub(&self) {
        self.core.begin_scrub();
    }

    pub fn end_scrub(&self) {
        self.core.end_scrub();
    }

    pub fn set_playback_rate(&self, rate: f64) {
        self.core.set_playback_rate(rate);
    }

    pub fn current_time(&self) -> f64 {
        self.core.current_time()
    }

    pub fn duration(&self) -> f64 {
        self.core.duration()
    }

    pub fn is_live(&self) -> bool {
        is_live_duration(self.core.duration())
    }

    pub fn seekable(&self) -> Option<TimeRange> {
        self.core.seekable()
    }

    pub fn seeking(&self) -> bool {
        self.core.timeline.lock().seeking()
    }

    pub fn scrubbing(&self) -> bool {
        self.core.timeline.lock().scrubbing()
    }

    pub fn seek_phase(&self) -> SeekPhase {
        self.core.seek.lock().phase()
    }

    /// Rate of the stream being played (not of a pending request)
    pub fn playback_rate(&self) -> f64 {
        self.core.rate.lock().current()
    }

    pub fn paused(&self) -> bool {
        self.core.snapshot().paused
    }

    pub fn ended(&self) -> bool {
        self.core.snapshot().ended
    }

    pub fn buffering(&self) -> bool {
        self.core.state.buffering()
    }

    pub fn generation(&self) -> u64 {
        self.core.state.generation.current()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.core.reconnect.lock().attempts()
    }

    pub fn has_engine(&self) -> bool {
        self.core.lifecycle.lock().has_engine()
    }

    /// Broadcast a `TimeUpdate` for the engine clock
    pub fn emit_time_update(&self) {
        let current_time = self.core.current_time();
        self.core
            .state
            .broadcast_event(PlayerEvent::time_update(current_time, false));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.core.state.subscribe_events()
    }

    /// Destroy the engine and return to the initial state
    ///
    /// The recorded source is kept, so `play()` starts over.
    pub fn reset(&self) {
        self.core.reset();
    }

    /// Tear the session down
    pub fn dispose(self) {
        info!("Disposing playback session {}", self.core.id);
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.core.reset();
        self.event_loop.abort();
    }
}

enum PlayStep {
    Load,
    Restart,
    Resume,
}

#[derive(Debug, Clone, Copy)]
struct EngineSnapshot {
    present: bool,
    time: f64,
    duration: f64,
    seekable: Option<TimeRange>,
    paused: bool,
    ended: bool,
    ready_state: ReadyState,
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self {
            present: false,
            time: 0.0,
            duration: f64::NAN,
            seekable: None,
            paused: true,
            ended: false,
            ready_state: ReadyState::HaveNothing,
        }
    }
}

struct SessionCore {
    id: Uuid,
    config: PlayerConfig,
    state: SharedState,
    lifecycle: Mutex<EngineLifecycle>,
    timeline: Mutex<VirtualTimeline>,
    reconnect: Mutex<ReconnectSupervisor>,
    seek: Mutex<SeekCoordinator>,
    rate: Mutex<PlaybackRateController>,
    resume: Box<dyn ResumeStrategy>,
    resume_task: Mutex<Option<JoinHandle<()>>>,
    urls: Arc<dyn StreamUrlProvider>,
    src: Mutex<Option<String>>,
}

impl SessionCore {
    // ========================================
    // Engine access
    // ========================================

    fn snapshot(&self) -> EngineSnapshot {
        let lifecycle = self.lifecycle.lock();
        match lifecycle.engine() {
            Some(engine) => EngineSnapshot {
                present: true,
                time: engine.current_time(),
                duration: engine.duration(),
                seekable: engine.seekable(),
                paused: engine.paused(),
                ended: engine.ended(),
                ready_state: engine.ready_state(),
            },
            None => EngineSnapshot::default(),
        }
    }

    fn current_time(&self) -> f64 {
        let snapshot = self.snapshot();
        self.timeline.lock().current_time(snapshot.time)
    }

    fn duration(&self) -> f64 {
        let snapshot = self.snapshot();
        self.timeline.lock().duration(snapshot.duration)
    }

    /// Seekable range on the virtual timeline
    ///
    /// With a known finite duration the whole recording can be re-acquired;
    /// otherwise it is the engine's range shifted by the base offset.
    fn seekable(&self) -> Option<TimeRange> {
        let raw = self.snapshot().seekable?;
        let timeline = self.timeline.lock();
        match timeline.cached_duration() {
            Some(duration) if duration.is_finite() && duration > 0.0 => {
                Some(TimeRange::new(0.0, duration))
            }
            _ => {
                let base = timeline.base_offset();
                Some(TimeRange::new(base + raw.start, base + raw.end))
            }
        }
    }

    fn play_engine(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        let Some(engine) = lifecycle.engine_mut() else {
            return false;
        };
        match engine.play() {
            Ok(()) => {
                self.state.set_need_play(false);
                true
            }
            Err(e) => {
                warn!("Engine play() failed: {}", e);
                false
            }
        }
    }

    /// Replace the engine if `issued` is still the current generation
    ///
    /// `still_wanted` and `on_reloaded` run under the lifecycle lock, before
    /// and after the reload. Returns false when the request went stale.
    fn reload_if_current(
        &self,
        issued: u64,
        descriptor: StreamDescriptor,
        still_wanted: impl FnOnce(&Self) -> bool,
        on_reloaded: impl FnOnce(&Self),
    ) -> Result<bool> {
        let mut lifecycle = self.lifecycle.lock();
        if !self.state.generation.is_current(issued) || !still_wanted(self) {
            return Ok(false);
        }

        let was_playing = lifecycle.engine().is_some_and(|engine| !engine.paused());
        let generation = self.state.generation.advance();
        lifecycle.reload(descriptor, generation)?;
        if was_playing {
            self.state.set_need_play(true);
        }
        on_reloaded(self);
        drop(lifecycle);

        self.state.broadcast_event(PlayerEvent::loaded(generation));
        Ok(true)
    }

    /// Surface an error to the host with the current timeline context
    fn report_error(&self, kind: ErrorKind, detail: String) {
        let snapshot = self.snapshot();
        let event = {
            let timeline = self.timeline.lock();
            PlayerEvent::error(
                kind,
                detail,
                timeline.current_time(snapshot.time),
                timeline.duration(snapshot.duration),
                timeline.last_seek_target(),
            )
        };
        self.state.set_buffering(false);
        self.state.broadcast_event(event);
    }

    // ========================================
    // Load / reset
    // ========================================

    fn load(&self, src: Option<&str>) -> Result<()> {
        let src = match src {
            Some(url) => {
                *self.src.lock() = Some(url.to_string());
                url.to_string()
            }
            None => {
                self.reset_inner();
                self.src.lock().clone().ok_or(Error::NoSource)?
            }
        };
        let descriptor = StreamDescriptor::unmodified(&src)?;

        self.state.set_buffering(true);
        let loaded = {
            let mut lifecycle = self.lifecycle.lock();
            let generation = self.state.generation.advance();
            lifecycle.reload(descriptor, generation).map(|()| generation)
        };

        match loaded {
            Ok(generation) => {
                info!("Loaded {} (generation {})", src, generation);
                self.state.broadcast_event(PlayerEvent::loaded(generation));
                Ok(())
            }
            Err(e) => {
                error!("Failed to load {}: {}", src, e);
                self.state.set_buffering(false);
                Err(e)
            }
        }
    }

    fn reset(&self) {
        {
            let mut lifecycle = self.lifecycle.lock();
            self.state.generation.advance();
            lifecycle.destroy();
        }
        self.reset_inner();
        self.state.set_buffering(false);
        debug!("Session {} reset", self.id);
    }

    /// Cancel deferred work and forget per-stream state
    fn reset_inner(&self) {
        self.seek.lock().cancel();
        self.reconnect.lock().reset();
        if let Some(task) = self.resume_task.lock().take() {
            task.abort();
        }
        self.timeline.lock().reset();
        self.rate.lock().reset();
        self.state.set_need_play(false);
    }

    // ========================================
    // Play
    // ========================================

    /// Start over from offset zero after the stream ended
    async fn restart(&self) -> Result<()> {
        let issued = self.state.generation.current();
        let base = self.urls.stream_url().await?;
        let rate = self.rate.lock().current();
        let descriptor = StreamDescriptor::build(&base, PlaybackParams::new(rate, 0.0))?;

        self.state.set_buffering(true);
        let reloaded = self.reload_if_current(
            issued,
            descriptor,
            |_| true,
            |core| {
                core.timeline.lock().commit_seek(0.0);
                core.state.set_need_play(true);
            },
        )?;
        if !reloaded {
            debug!("Restart discarded: session changed while fetching the stream URL");
        }
        Ok(())
    }

    /// Resume a paused engine, jumping to the newest buffered data when the
    /// stream never reported a usable duration
    fn resume(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        let jump_to_edge = match self.timeline.lock().cached_duration() {
            Some(duration) => duration == 0.0 || duration.is_nan(),
            None => true,
        };
        let Some(engine) = lifecycle.engine_mut() else {
            return Ok(());
        };
        if jump_to_edge {
            if let Some(range) = engine.seekable() {
                engine.set_current_time(truncate_tenths(range.end));
            }
        }
        engine.play()
    }

    // ========================================
    // Seek
    // ========================================

    fn set_current_time(self: &Arc<Self>, seconds: f64) {
        let Some(range) = self.seekable() else {
            debug!("Seek to {}s ignored: nothing seekable", seconds);
            return;
        };
        let target = range.clamp(seconds);

        let scrubbing = {
            let mut timeline = self.timeline.lock();
            timeline.set_pending_target(target);
            timeline.scrubbing()
        };
        self.state
            .broadcast_event(PlayerEvent::time_update(target, true));

        if !scrubbing {
            self.state.set_buffering(true);
            self.schedule_seek();
        }
    }

    fn begin_scrub(&self) {
        self.timeline.lock().set_scrubbing(true);
        self.seek.lock().begin_scrub();
    }

    fn end_scrub(self: &Arc<Self>) {
        let pending = {
            let mut timeline = self.timeline.lock();
            timeline.set_scrubbing(false);
            timeline.pending_target()
        };
        self.seek.lock().end_scrub();

        // The seekable window of a live stream may have moved during the drag
        let pending = match (pending, self.seekable()) {
            (Some(target), Some(range)) => {
                let clamped = range.clamp(target);
                if clamped != target {
                    debug!("Scrub target {}s clamped to {}s", target, clamped);
                    self.timeline.lock().set_pending_target(clamped);
                }
                Some(clamped)
            }
            (Some(_), None) => {
                debug!("Scrub released with nothing seekable");
                self.timeline.lock().cancel_pending();
                None
            }
            (None, _) => None,
        };

        if pending.is_some() {
            self.state.set_buffering(true);
            self.schedule_seek();
        }
    }

    fn schedule_seek(self: &Arc<Self>) {
        let mut seek = self.seek.lock();
        let seq = seek.prepare();
        let debounce = seek.debounce();
        let core = Arc::clone(self);
        seek.set_task(tokio::spawn(async move {
            if debounce.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(debounce).await;
            }
            core.perform_seek(seq).await;
        }));
    }

    async fn perform_seek(&self, seq: u64) {
        if !self.seek.lock().is_current(seq) {
            return;
        }
        let Some(target) = self.timeline.lock().pending_target() else {
            self.seek.lock().finish(seq);
            return;
        };

        let issued = self.state.generation.current();
        let descriptor = match self.fresh_descriptor(target).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!("Seek to {}s failed: {}", target, e);
                if self.state.generation.is_current(issued) {
                    self.timeline.lock().cancel_pending();
                    self.report_error(ErrorKind::Other, e.to_string());
                }
                self.seek.lock().finish(seq);
                return;
            }
        };

        let result = self.reload_if_current(
            issued,
            descriptor,
            |core| core.seek.lock().is_current(seq),
            |core| {
                core.timeline.lock().commit_seek(target);
                core.state.set_need_play(true);
            },
        );
        match result {
            Ok(true) => info!("Seek committed at {:.3}s", target),
            Ok(false) => {
                debug!("Seek to {}s discarded", target);
                if self.seek.lock().is_current(seq) {
                    let mut timeline = self.timeline.lock();
                    if !timeline.scrubbing() {
                        timeline.cancel_pending();
                    }
                }
            }
            Err(e) => {
                error!("Seek to {}s failed: {}", target, e);
                self.timeline.lock().cancel_pending();
                self.report_error(ErrorKind::Other, e.to_string());
            }
        }
        self.seek.lock().finish(seq);
    }

    /// Fresh base URL with the current rate at `offset_seconds`
    async fn fresh_descriptor(&self, offset_seconds: f64) -> Result<StreamDescriptor> {
        let base = self.urls.stream_url().await?;
        let rate = self.rate.lock().current();
        StreamDescriptor::build(&base, PlaybackParams::new(rate, offset_seconds))
    }

    // ========================================
    // Rate
    // ========================================

    fn set_playback_rate(self: &Arc<Self>, rate: f64) {
        // Under the lifecycle lock so no reload lands between request and capture
        let (ticket, issued) = {
            let _lifecycle = self.lifecycle.lock();
            match self.rate.lock().request(rate) {
                Some(ticket) => (ticket, self.state.generation.current()),
                None => return,
            }
        };

        info!("Playback rate change requested: {}x", rate);
        self.state.broadcast_event(PlayerEvent::rate_change(rate));
        self.state.set_buffering(true);

        let core = Arc::clone(self);
        tokio::spawn(async move {
            core.perform_rate_change(ticket, issued).await;
        });
    }

    async fn perform_rate_change(&self, ticket: RateTicket, issued: u64) {
        let base = match self.urls.stream_url().await {
            Ok(base) => base,
            Err(e) => {
                warn!("Rate change to {}x failed: {}", ticket.rate, e);
                self.rate.lock().abandon(ticket);
                if self.state.generation.is_current(issued) {
                    self.report_error(ErrorKind::Other, e.to_string());
                }
                return;
            }
        };
        let offset = self.timeline.lock().base_offset();
        let params = PlaybackParams::new(ticket.rate, offset);
        let descriptor = match StreamDescriptor::build(&base, params) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!("Rate change to {}x failed: {}", ticket.rate, e);
                self.rate.lock().abandon(ticket);
                self.report_error(ErrorKind::Other, e.to_string());
                return;
            }
        };

        let result = self.reload_if_current(
            issued,
            descriptor,
            |core| core.rate.lock().is_latest(ticket.seq),
            |core| {
                core.rate.lock().commit(ticket);
            },
        );
        match result {
            Ok(true) => info!("Playback rate now {}x", ticket.rate),
            Ok(false) => {
                debug!("Rate change to {}x discarded", ticket.rate);
                self.rate.lock().abandon(ticket);
            }
            Err(e) => {
                error!("Rate change to {}x failed: {}", ticket.rate, e);
                self.rate.lock().abandon(ticket);
                self.report_error(ErrorKind::Other, e.to_string());
            }
        }
    }

    // ========================================
    // Reconnect
    // ========================================

    fn on_engine_error(self: &Arc<Self>, kind: ErrorKind, detail: String) {
        let snapshot = self.snapshot();
        let live = self.timeline.lock().is_live(snapshot.duration);
        let decision = self.reconnect.lock().decide(kind, live);

        match decision {
            ReconnectDecision::Reconnect { attempt, delay } => {
                let max_attempts = self.config.reconn_times;
                warn!(
                    "Engine {} error ({}), reconnect {}/{} in {:?}",
                    kind, detail, attempt, max_attempts, delay
                );
                self.state.set_buffering(true);
                self.state
                    .broadcast_event(PlayerEvent::reconnecting(attempt, max_attempts));

                let issued = self.state.generation.current();
                let core = Arc::clone(self);
                let timer = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    core.perform_reconnect(issued, attempt).await;
                });
                self.reconnect.lock().arm(timer);
            }
            ReconnectDecision::GiveUp(reason) => {
                error!("Engine {} error: {} ({})", kind, detail, reason);
                self.report_error(kind, detail);
            }
        }
    }

    async fn perform_reconnect(&self, issued: u64, attempt: u32) {
        if !self.state.generation.is_current(issued) {
            return;
        }
        info!("Reconnect attempt {}", attempt);

        let offset = self.timeline.lock().base_offset();
        let descriptor = match self.fresh_descriptor(offset).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!("Reconnect attempt {} failed: {}", attempt, e);
                if self.state.generation.is_current(issued) {
                    self.report_error(ErrorKind::Other, e.to_string());
                }
                return;
            }
        };

        let result = self.reload_if_current(
            issued,
            descriptor,
            |_| true,
            |core| core.state.set_need_play(true),
        );
        match result {
            Ok(true) => debug!("Reconnect attempt {} issued", attempt),
            Ok(false) => debug!("Reconnect attempt {} discarded", attempt),
            Err(e) => {
                error!("Reconnect attempt {} failed: {}", attempt, e);
                self.report_error(ErrorKind::Other, e.to_string());
            }
        }
    }

    // ========================================
    // Engine events
    // ========================================

    fn dispatch(self: &Arc<Self>, event: EngineEvent) {
        match event {
            EngineEvent::MetadataArrived { duration } => {
                info!("Stream metadata: duration {}", duration);
                self.timeline.lock().on_metadata(duration);
                self.state.broadcast_event(PlayerEvent::duration_changed(
                    duration,
                    is_live_duration(duration),
                ));
            }
            EngineEvent::MediaInfoArrived { info } => {
                if let Some(mime_type) = info.mime_type.as_deref() {
                    if !supports_mime_type(mime_type) {
                        warn!("Unexpected stream container type: {}", mime_type);
                    }
                }
                debug!("Media info: {:?}", info);
            }
            EngineEvent::DataArrived => {
                if self.reconnect.lock().on_data_arrived() {
                    info!("Media data flowing again, reconnect attempts reset");
                }
            }
            EngineEvent::Error { kind, detail } => self.on_engine_error(kind, detail),
            EngineEvent::CanPlay => {
                self.restore_rate();
                self.state.set_buffering(false);
                self.on_playback_signal(PlaybackSignal::CanPlay);
            }
            EngineEvent::Playing => {
                self.state.set_buffering(false);
                self.on_playback_signal(PlaybackSignal::Playing);
            }
            EngineEvent::Paused => self.on_playback_signal(PlaybackSignal::Paused),
            EngineEvent::Waiting => {
                self.state.set_buffering(true);
                self.on_playback_signal(PlaybackSignal::Waiting);
            }
            EngineEvent::Ended => self.on_playback_signal(PlaybackSignal::Ended),
        }
    }

    /// A fresh engine starts at 1x
    fn restore_rate(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let rate = self.rate.lock().current();
        if let Some(engine) = lifecycle.engine_mut() {
            if engine.playback_rate() != rate {
                debug!("Restoring engine playback rate to {}x", rate);
                engine.set_playback_rate(rate);
            }
        }
    }

    fn on_playback_signal(self: &Arc<Self>, signal: PlaybackSignal) {
        let snapshot = self.snapshot();
        if !snapshot.present {
            return;
        }
        let ctx = ResumeContext {
            live: self.timeline.lock().is_live(snapshot.duration),
            autoplay: self.config.autoplay,
            need_play: self.state.need_play(),
            paused: snapshot.paused,
            ended: snapshot.ended,
        };

        let action = self.resume.on_signal(signal, &ctx);
        if action != ResumeAction::None {
            debug!("{} resume: {:?} -> {:?}", self.resume.name(), signal, action);
        }
        match action {
            ResumeAction::None => {}
            ResumeAction::PlayNow => {
                self.play_engine();
            }
            ResumeAction::PollUntilReady { interval } => self.spawn_resume_poll(interval),
            ResumeAction::PauseThenResume { delay } => {
                if let Some(engine) = self.lifecycle.lock().engine_mut() {
                    engine.pause();
                }
                let issued = self.state.generation.current();
                let core = Arc::clone(self);
                self.replace_resume_task(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if core.state.generation.is_current(issued) {
                        core.play_engine();
                    }
                }));
            }
            ResumeAction::MarkBuffering => self.state.set_buffering(true),
        }
    }

    fn spawn_resume_poll(self: &Arc<Self>, interval: Duration) {
        let issued = self.state.generation.current();
        let core = Arc::clone(self);
        self.replace_resume_task(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if !core.state.generation.is_current(issued) {
                    return;
                }
                let snapshot = core.snapshot();
                if !snapshot.present || !snapshot.paused {
                    return;
                }
                if snapshot.ready_state.can_play() {
                    core.play_engine();
                    return;
                }
                trace!("Engine not ready, polling again in {:?}", interval);
            }
        }));
    }

    fn replace_resume_task(&self, task: JoinHandle<()>) {
        if let Some(previous) = self.resume_task.lock().replace(task) {
            previous.abort();
        }
    }
}

/// Engine event loop
///
/// Events stamped with a generation other than the current one come from an
/// engine that has already been replaced and are dropped.
async fn run_event_loop(
    core: Arc<SessionCore>,
    mut events_rx: mpsc::UnboundedReceiver<EngineEnvelope>,
) {
    debug!("Engine event loop started for session {}", core.id);
    while let Some(envelope) = events_rx.recv().await {
        if !core.state.generation.is_current(envelope.generation) {
            trace!(
                "Dropping {:?} from stale engine (generation {})",
                envelope.event,
                envelope.generation
            );
            continue;
        }
        core.dispatch(envelope.event);
    }
    debug!("Engine event loop stopped for session {}", core.id);
}
