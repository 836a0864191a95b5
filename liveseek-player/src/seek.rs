//! Seek coordination
//!
//! Seeks on a live stream are re-acquisitions, so they are expensive. Targets
//! are accumulated while the user is scrubbing and a single debounced
//! re-acquisition is issued for the last one.
//!
//! ```text
//! Idle --begin_scrub--> Scrubbing --end_scrub--> PendingReload --done--> Idle
//!   \-------------------set target-------------------^
//! ```
//!
//! The target itself lives in the `VirtualTimeline`; this type owns the
//! phase and the debounce timer.

use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekPhase {
    Idle,
    Scrubbing,
    PendingReload,
}

pub struct SeekCoordinator {
    phase: SeekPhase,
    debounce: Duration,
    /// Sequence number of the most recently scheduled reload
    issued: u64,
    pending: Option<JoinHandle<()>>,
}

impl SeekCoordinator {
    pub fn new(debounce: Duration) -> Self {
        Self {
            phase: SeekPhase::Idle,
            debounce,
            issued: 0,
            pending: None,
        }
    }

    pub fn phase(&self) -> SeekPhase {
        self.phase
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// User started dragging: any scheduled reload is dropped
    pub fn begin_scrub(&mut self) {
        self.abort_pending();
        self.phase = SeekPhase::Scrubbing;
    }

    /// User released the scrubber
    pub fn end_scrub(&mut self) {
        if self.phase == SeekPhase::Scrubbing {
            self.phase = SeekPhase::Idle;
        }
    }

    /// Start a new debounce window, cancelling the previous one
    ///
    /// Returns the sequence number the reload task must present to `finish`.
    pub fn prepare(&mut self) -> u64 {
        self.abort_pending();
        self.issued += 1;
        self.phase = SeekPhase::PendingReload;
        self.issued
    }

    /// Keep the handle of the task started for the latest `prepare`
    pub fn set_task(&mut self, task: JoinHandle<()>) {
        if let Some(previous) = self.pending.replace(task) {
            previous.abort();
        }
    }

    /// True while `seq` is the latest scheduled reload
    pub fn is_current(&self, seq: u64) -> bool {
        self.phase == SeekPhase::PendingReload && self.issued == seq
    }

    /// Reload task done; ignored unless `seq` is still the latest
    pub fn finish(&mut self, seq: u64) {
        if self.is_current(seq) {
            self.phase = SeekPhase::Idle;
            self.pending = None;
        }
    }

    /// Drop any scheduled reload and return to idle
    pub fn cancel(&mut self) {
        self.abort_pending();
        self.phase = SeekPhase::Idle;
    }

    fn abort_pending(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl Drop for SeekCoordinator {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_scrub_phases() {
        let mut seek = SeekCoordinator::new(Duration::ZERO);
        assert_eq!(seek.phase(), SeekPhase::Idle);

        seek.begin_scrub();
        assert_eq!(seek.phase(), SeekPhase::Scrubbing);

        seek.end_scrub();
        assert_eq!(seek.phase(), SeekPhase::Idle);

        let seq = seek.prepare();
        assert_eq!(seek.phase(), SeekPhase::PendingReload);
        seek.finish(seq);
        assert_eq!(seek.phase(), SeekPhase::Idle);
    }

    #[test]
    fn test_stale_finish_is_ignored() {
        let mut seek = SeekCoordinator::new(Duration::ZERO);
        let first = seek.prepare();
        let second = seek.prepare();

        assert!(!seek.is_current(first));
        seek.finish(first);
        assert_eq!(seek.phase(), SeekPhase::PendingReload);

        seek.finish(second);
        assert_eq!(seek.phase(), SeekPhase::Idle);
    }

    fn flag_task(flag: &Arc<AtomicBool>) -> JoinHandle<()> {
        let flag = Arc::clone(flag);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            flag.store(true, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_prepare_aborts_previous_window() {
        let mut seek = SeekCoordinator::new(Duration::from_millis(300));
        let first = Arc::new(AtomicBool::new(false));
        let second = Arc::new(AtomicBool::new(false));

        seek.prepare();
        seek.set_task(flag_task(&first));
        seek.prepare();
        seek.set_task(flag_task(&second));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!first.load(Ordering::SeqCst));
        assert!(second.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_scrub_cancels_pending_reload() {
        let mut seek = SeekCoordinator::new(Duration::from_millis(300));
        let fired = Arc::new(AtomicBool::new(false));
        let seq = seek.prepare();
        seek.set_task(flag_task(&fired));

        seek.begin_scrub();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(!seek.is_current(seq));
    }
}
