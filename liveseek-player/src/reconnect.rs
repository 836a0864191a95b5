//! Reconnect supervisor
//!
//! Decides, per engine error, whether a live stream is re-acquired or the
//! error is surfaced. Attempts are bounded by `reconn_times` and the counter
//! is reset by the next `DataArrived` of any engine instance.

use liveseek_common::ErrorKind;
use std::fmt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Outcome of an engine error
#[derive(Debug, Clone, PartialEq)]
pub enum ReconnectDecision {
    /// Re-acquire after `delay`; `attempt` is 1-based
    Reconnect { attempt: u32, delay: Duration },
    /// Surface the error to the host
    GiveUp(GiveUpReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    Unrecoverable(ErrorKind),
    NotLive,
    BudgetExhausted { attempts: u32 },
}

impl fmt::Display for GiveUpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GiveUpReason::Unrecoverable(kind) => write!(f, "{} error is not recoverable", kind),
            GiveUpReason::NotLive => write!(f, "stream is not live"),
            GiveUpReason::BudgetExhausted { attempts } => {
                write!(f, "gave up after {} reconnect attempts", attempts)
            }
        }
    }
}

pub struct ReconnectSupervisor {
    attempts: u32,
    max_attempts: u32,
    interval: Duration,
    timer: Option<JoinHandle<()>>,
}

impl ReconnectSupervisor {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            interval,
            timer: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Classify an engine error; counts the attempt when reconnecting
    pub fn decide(&mut self, kind: ErrorKind, is_live: bool) -> ReconnectDecision {
        if !kind.is_recoverable() {
            return ReconnectDecision::GiveUp(GiveUpReason::Unrecoverable(kind));
        }
        if !is_live {
            return ReconnectDecision::GiveUp(GiveUpReason::NotLive);
        }
        if self.attempts >= self.max_attempts {
            return ReconnectDecision::GiveUp(GiveUpReason::BudgetExhausted {
                attempts: self.attempts,
            });
        }

        self.attempts += 1;
        ReconnectDecision::Reconnect {
            attempt: self.attempts,
            delay: self.interval,
        }
    }

    /// Media flowed again; returns true if the counter was reset
    pub fn on_data_arrived(&mut self) -> bool {
        std::mem::replace(&mut self.attempts, 0) > 0
    }

    /// Keep the handle of a scheduled reconnect, superseding any older one
    pub fn arm(&mut self, timer: JoinHandle<()>) {
        if let Some(previous) = self.timer.replace(timer) {
            previous.abort();
        }
    }

    /// Cancel a scheduled reconnect
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Cancel any timer and forget all attempts
    pub fn reset(&mut self) {
        self.cancel();
        self.attempts = 0;
    }
}

impl Drop for ReconnectSupervisor {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor() -> ReconnectSupervisor {
        ReconnectSupervisor::new(3, Duration::from_millis(1000))
    }

    #[test]
    fn test_budget_is_bounded() {
        let mut supervisor = supervisor();
        for attempt in 1..=3 {
            assert_eq!(
                supervisor.decide(ErrorKind::Network, true),
                ReconnectDecision::Reconnect {
                    attempt,
                    delay: Duration::from_millis(1000)
                }
            );
        }
        assert_eq!(
            supervisor.decide(ErrorKind::Network, true),
            ReconnectDecision::GiveUp(GiveUpReason::BudgetExhausted { attempts: 3 })
        );
        assert_eq!(supervisor.attempts(), 3);
    }

    #[test]
    fn test_data_arrived_resets() {
        let mut supervisor = supervisor();
        supervisor.decide(ErrorKind::Media, true);
        supervisor.decide(ErrorKind::Media, true);

        assert!(supervisor.on_data_arrived());
        assert_eq!(supervisor.attempts(), 0);
        assert!(!supervisor.on_data_arrived());
    }

    #[test]
    fn test_other_errors_are_never_retried() {
        let mut supervisor = supervisor();
        assert_eq!(
            supervisor.decide(ErrorKind::Other, true),
            ReconnectDecision::GiveUp(GiveUpReason::Unrecoverable(ErrorKind::Other))
        );
        assert_eq!(supervisor.attempts(), 0);
    }

    #[test]
    fn test_non_live_errors_surface() {
        let mut supervisor = supervisor();
        assert_eq!(
            supervisor.decide(ErrorKind::Network, false),
            ReconnectDecision::GiveUp(GiveUpReason::NotLive)
        );
    }

    #[test]
    fn test_zero_budget_gives_up_immediately() {
        let mut supervisor = ReconnectSupervisor::new(0, Duration::ZERO);
        assert!(matches!(
            supervisor.decide(ErrorKind::Network, true),
            ReconnectDecision::GiveUp(GiveUpReason::BudgetExhausted { attempts: 0 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_timer_supersedes_older() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let fired = Arc::new(AtomicU32::new(0));
        let mut supervisor = supervisor();
        for n in [1, 10] {
            let fired = Arc::clone(&fired);
            supervisor.arm(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                fired.fetch_add(n, Ordering::SeqCst);
            }));
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }
}
