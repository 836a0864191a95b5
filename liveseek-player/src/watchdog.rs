//! Resume watchdog strategies
//!
//! Some platforms resume a stalled live stream on their own; others pause or
//! report "ended" at a live stall and never come back. The session consults a
//! `ResumeStrategy` on every playback signal and carries out the action it
//! returns. The strategy is picked once per session from `PlatformConfig`.

use crate::config::PlatformConfig;
use std::time::Duration;

/// Playback signals forwarded to the strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackSignal {
    CanPlay,
    Playing,
    Paused,
    Waiting,
    Ended,
}

/// Snapshot of the session when a signal arrives
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResumeContext {
    pub live: bool,
    pub autoplay: bool,
    /// A seek, rate change or reconnect asked to resume once playable
    pub need_play: bool,
    pub paused: bool,
    pub ended: bool,
}

/// What the session should do in response to a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAction {
    None,
    /// Call `play()` on the engine now
    PlayNow,
    /// Poll readiness every `interval` and play once ready
    PollUntilReady { interval: Duration },
    /// Pause now and call `play()` again after `delay`
    PauseThenResume { delay: Duration },
    /// Show the buffering indicator
    MarkBuffering,
}

pub trait ResumeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_signal(&self, signal: PlaybackSignal, ctx: &ResumeContext) -> ResumeAction;
}

/// For platforms that resume stalled streams themselves
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateResume;

impl ResumeStrategy for ImmediateResume {
    fn name(&self) -> &'static str {
        "immediate"
    }

    fn on_signal(&self, signal: PlaybackSignal, ctx: &ResumeContext) -> ResumeAction {
        match signal {
            PlaybackSignal::CanPlay if ctx.paused && (ctx.need_play || ctx.autoplay) => {
                ResumeAction::PlayNow
            }
            _ => ResumeAction::None,
        }
    }
}

/// For platforms that suppress auto-resume of live streams
#[derive(Debug, Clone, Copy)]
pub struct PollingResume {
    interval: Duration,
}

impl PollingResume {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl ResumeStrategy for PollingResume {
    fn name(&self) -> &'static str {
        "polling"
    }

    fn on_signal(&self, signal: PlaybackSignal, ctx: &ResumeContext) -> ResumeAction {
        let poll = ResumeAction::PollUntilReady {
            interval: self.interval,
        };
        match signal {
            PlaybackSignal::CanPlay if ctx.paused && (ctx.need_play || ctx.autoplay) => poll,
            // A live stream that "ended" is only out of data
            PlaybackSignal::Ended if ctx.live => ResumeAction::MarkBuffering,
            PlaybackSignal::Paused if ctx.live && ctx.autoplay && ctx.ended => poll,
            PlaybackSignal::Waiting if ctx.live => ResumeAction::PauseThenResume {
                delay: self.interval,
            },
            _ => ResumeAction::None,
        }
    }
}

/// Pick the strategy for this platform
pub fn select_strategy(platform: &PlatformConfig) -> Box<dyn ResumeStrategy> {
    if platform.suppresses_auto_resume {
        Box::new(PollingResume::new(platform.resume_poll_interval()))
    } else {
        Box::new(ImmediateResume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paused_ctx() -> ResumeContext {
        ResumeContext {
            live: true,
            paused: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_immediate_plays_when_wanted() {
        let strategy = ImmediateResume;
        let ctx = ResumeContext {
            need_play: true,
            ..paused_ctx()
        };
        assert_eq!(
            strategy.on_signal(PlaybackSignal::CanPlay, &ctx),
            ResumeAction::PlayNow
        );
        // Nothing asked for playback
        assert_eq!(
            strategy.on_signal(PlaybackSignal::CanPlay, &paused_ctx()),
            ResumeAction::None
        );
        assert_eq!(
            strategy.on_signal(PlaybackSignal::Waiting, &ctx),
            ResumeAction::None
        );
    }

    #[test]
    fn test_polling_handles_live_stalls() {
        let strategy = PollingResume::new(Duration::from_millis(1000));
        let ctx = ResumeContext {
            autoplay: true,
            ended: true,
            ..paused_ctx()
        };

        assert_eq!(
            strategy.on_signal(PlaybackSignal::Ended, &ctx),
            ResumeAction::MarkBuffering
        );
        assert_eq!(
            strategy.on_signal(PlaybackSignal::Paused, &ctx),
            ResumeAction::PollUntilReady {
                interval: Duration::from_millis(1000)
            }
        );
        assert_eq!(
            strategy.on_signal(PlaybackSignal::Waiting, &ctx),
            ResumeAction::PauseThenResume {
                delay: Duration::from_millis(1000)
            }
        );
        assert_eq!(
            strategy.on_signal(PlaybackSignal::CanPlay, &ctx),
            ResumeAction::PollUntilReady {
                interval: Duration::from_millis(1000)
            }
        );
    }

    #[test]
    fn test_polling_ignores_recorded_streams() {
        let strategy = PollingResume::new(Duration::from_millis(500));
        let ctx = ResumeContext {
            live: false,
            ..paused_ctx()
        };
        assert_eq!(
            strategy.on_signal(PlaybackSignal::Ended, &ctx),
            ResumeAction::None
        );
        assert_eq!(
            strategy.on_signal(PlaybackSignal::Waiting, &ctx),
            ResumeAction::None
        );
    }

    #[test]
    fn test_select_strategy() {
        let mut platform = PlatformConfig::default();
        assert_eq!(select_strategy(&platform).name(), "immediate");

        platform.suppresses_auto_resume = true;
        assert_eq!(select_strategy(&platform).name(), "polling");
    }
}
