//! Playback rate control
//!
//! A rate change is a re-acquisition at the new speed. `current` only moves
//! when that reload has been issued, and only for the latest request: every
//! request takes a sequence number and older tickets fail to commit.

use tracing::warn;

/// A rate change waiting for its re-acquisition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateTicket {
    pub rate: f64,
    pub seq: u64,
}

#[derive(Debug)]
pub struct PlaybackRateController {
    current: f64,
    requested: Option<f64>,
    issued: u64,
}

impl Default for PlaybackRateController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackRateController {
    pub fn new() -> Self {
        Self {
            current: 1.0,
            requested: None,
            issued: 0,
        }
    }

    /// Rate of the live stream
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Rate of the newest request still in flight
    pub fn requested(&self) -> Option<f64> {
        self.requested
    }

    /// Register a rate change request
    ///
    /// Returns `None` when there is nothing to do: the rate is invalid, already
    /// current, or already requested. Asking for the current rate while another
    /// request is in flight supersedes that request.
    pub fn request(&mut self, rate: f64) -> Option<RateTicket> {
        if !rate.is_finite() || rate <= 0.0 {
            warn!("Ignoring invalid playback rate {}", rate);
            return None;
        }
        if self.requested == Some(rate) {
            return None;
        }
        if rate == self.current {
            if self.requested.take().is_some() {
                self.issued += 1;
            }
            return None;
        }

        self.issued += 1;
        self.requested = Some(rate);
        Some(RateTicket {
            rate,
            seq: self.issued,
        })
    }

    pub fn is_latest(&self, seq: u64) -> bool {
        seq == self.issued
    }

    /// Make the ticket's rate current; false if a newer request exists
    pub fn commit(&mut self, ticket: RateTicket) -> bool {
        if !self.is_latest(ticket.seq) {
            return false;
        }
        self.current = ticket.rate;
        self.requested = None;
        true
    }

    /// Drop a request that will not commit, so the same rate can be asked for
    /// again. No effect once a newer request has been issued.
    pub fn abandon(&mut self, ticket: RateTicket) {
        if self.is_latest(ticket.seq) && self.requested == Some(ticket.rate) {
            self.requested = None;
        }
    }

    /// Back to 1x; outstanding tickets become stale
    pub fn reset(&mut self) {
        self.current = 1.0;
        self.requested = None;
        self.issued += 1;
    }
}
