//! Virtual timeline
//!
//! The engine's clock always starts at zero for the stream it was handed. A
//! re-acquired stream starts at the requested offset, so the user-facing time
//! is `base_offset + engine time`. A re-acquired live stream also never
//! reports its duration again, so the last metadata duration is kept across
//! reloads until a full reset.

/// True for durations that denote a live (unbounded) stream
pub fn is_live_duration(duration: f64) -> bool {
    duration.is_nan() || duration.is_infinite()
}

/// User-facing timeline state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualTimeline {
    /// Last committed seek target (seconds)
    base_offset: f64,
    /// Duration from the most recent metadata event
    cached_duration: Option<f64>,
    /// Target of a seek that has not been committed yet
    pending_target: Option<f64>,
    scrubbing: bool,
}

impl VirtualTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_offset(&self) -> f64 {
        self.base_offset
    }

    pub fn cached_duration(&self) -> Option<f64> {
        self.cached_duration
    }

    pub fn pending_target(&self) -> Option<f64> {
        self.pending_target
    }

    pub fn seeking(&self) -> bool {
        self.pending_target.is_some()
    }

    pub fn scrubbing(&self) -> bool {
        self.scrubbing
    }

    /// Last seek target, pending or committed
    pub fn last_seek_target(&self) -> f64 {
        self.pending_target.unwrap_or(self.base_offset)
    }

    /// Current time given the engine's raw clock
    pub fn current_time(&self, engine_time: f64) -> f64 {
        match self.pending_target {
            Some(target) => target,
            None => self.base_offset + engine_time,
        }
    }

    /// Duration given the engine's raw duration
    pub fn duration(&self, engine_duration: f64) -> f64 {
        if self.base_offset > 0.0 {
            self.cached_duration.unwrap_or(engine_duration)
        } else {
            engine_duration
        }
    }

    pub fn is_live(&self, engine_duration: f64) -> bool {
        is_live_duration(self.duration(engine_duration))
    }

    pub fn on_metadata(&mut self, duration: f64) {
        self.cached_duration = Some(duration);
    }

    pub fn set_scrubbing(&mut self, scrubbing: bool) {
        self.scrubbing = scrubbing;
    }

    /// Record a seek target that has not been re-acquired yet
    pub fn set_pending_target(&mut self, target: f64) {
        self.pending_target = Some(target.max(0.0));
    }

    /// Make `target` the new base offset
    ///
    /// The pending seek ends only if `target` is still the pending target.
    pub fn commit_seek(&mut self, target: f64) {
        let target = target.max(0.0);
        self.base_offset = target;
        if self.pending_target == Some(target) {
            self.pending_target = None;
        }
    }

    /// Drop a pending seek without moving the base offset
    pub fn cancel_pending(&mut self) {
        self.pending_target = None;
    }

    /// Full reset: the only operation that forgets the cached duration
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_time_adds_offset() {
        let mut timeline = VirtualTimeline::new();
        assert_eq!(timeline.current_time(5.0), 5.0);

        timeline.commit_seek(60.0);
        assert_eq!(timeline.current_time(5.0), 65.0);
    }

    #[test]
    fn test_pending_seek_reports_target() {
        let mut timeline = VirtualTimeline::new();
        timeline.commit_seek(10.0);
        timeline.set_pending_target(42.0);

        assert!(timeline.seeking());
        assert_eq!(timeline.current_time(3.0), 42.0);
        // Base offset only moves on commit
        assert_eq!(timeline.base_offset(), 10.0);

        timeline.commit_seek(42.0);
        assert!(!timeline.seeking());
        assert_eq!(timeline.current_time(3.0), 45.0);
    }

    #[test]
    fn test_duration_before_any_seek_uses_engine() {
        let mut timeline = VirtualTimeline::new();
        timeline.on_metadata(300.0);
        assert_eq!(timeline.duration(120.0), 120.0);
    }

    #[test]
    fn test_duration_after_seek_uses_cache() {
        let mut timeline = VirtualTimeline::new();
        timeline.on_metadata(300.0);
        timeline.commit_seek(100.0);

        // Re-acquired stream reports no duration
        assert_eq!(timeline.duration(f64::NAN), 300.0);
        assert!(!timeline.is_live(f64::NAN));
    }

    #[test]
    fn test_duration_after_seek_without_cache_falls_back() {
        let mut timeline = VirtualTimeline::new();
        timeline.commit_seek(100.0);
        assert!(timeline.duration(f64::INFINITY).is_infinite());
        assert!(timeline.is_live(f64::INFINITY));
    }

    #[test]
    fn test_is_live_duration() {
        assert!(is_live_duration(f64::NAN));
        assert!(is_live_duration(f64::INFINITY));
        assert!(!is_live_duration(3600.0));
    }

    #[test]
    fn test_reset_clears_cache() {
        let mut timeline = VirtualTimeline::new();
        timeline.on_metadata(90.0);
        timeline.commit_seek(30.0);
        timeline.set_scrubbing(true);

        timeline.reset();
        assert_eq!(timeline, VirtualTimeline::new());
        assert!(timeline.cached_duration().is_none());
    }

    #[test]
    fn test_commit_keeps_newer_pending_target() {
        let mut timeline = VirtualTimeline::new();
        timeline.set_pending_target(40.0);
        timeline.commit_seek(30.0);

        assert_eq!(timeline.base_offset(), 30.0);
        assert_eq!(timeline.pending_target(), Some(40.0));

        timeline.cancel_pending();
        assert!(!timeline.seeking());
        assert_eq!(timeline.base_offset(), 30.0);
    }

    #[test]
    fn test_last_seek_target() {
        let mut timeline = VirtualTimeline::new();
        timeline.commit_seek(20.0);
        assert_eq!(timeline.last_seek_target(), 20.0);
        timeline.set_pending_target(25.0);
        assert_eq!(timeline.last_seek_target(), 25.0);
    }
}
