//! Heartbeat liveness tracking.
//!
//! The monitor only holds the last-read / last-write timestamps and decides,
//! for a given "now", what the transport should do. Acting on the decision
//! (writing a heartbeat frame or reconnecting) is left to the transport, which
//! owns the socket.

use std::time::{Duration, Instant};

/// Outcome of a liveness evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessAction {
    /// Nothing to do.
    Idle,
    /// Nothing written for more than half the interval: send a heartbeat.
    SendHeartbeat,
    /// Nothing read for more than twice the interval: the peer is gone.
    Reconnect,
}

/// Tracks I/O timestamps against a negotiated heartbeat interval.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    interval: Option<Duration>,
    last_read: Option<Instant>,
    last_write: Option<Instant>,
}

impl LivenessMonitor {
    /// Create a monitor. `None` disables heartbeat checking entirely.
    #[must_use]
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval: interval.filter(|i| !i.is_zero()),
            last_read: None,
            last_write: None,
        }
    }

    /// The heartbeat interval, if enabled.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Time of the last successful non-empty read.
    #[must_use]
    pub fn last_read(&self) -> Option<Instant> {
        self.last_read
    }

    /// Time of the last completed write.
    #[must_use]
    pub fn last_write(&self) -> Option<Instant> {
        self.last_write
    }

    /// Record a successful read. Timestamps never move backwards.
    pub fn record_read(&mut self, now: Instant) {
        self.last_read = Some(self.last_read.map_or(now, |prev| prev.max(now)));
    }

    /// Record a completed write. Timestamps never move backwards.
    pub fn record_write(&mut self, now: Instant) {
        self.last_write = Some(self.last_write.map_or(now, |prev| prev.max(now)));
    }

    /// Forget both timestamps, making the monitor inert until fresh I/O happens.
    pub fn reset(&mut self) {
        self.last_read = None;
        self.last_write = None;
    }

    /// Whether the monitor has enough information to make decisions.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.interval.is_some() && self.last_read.is_some() && self.last_write.is_some()
    }

    /// Decide what to do at `now`.
    ///
    /// Reconnect takes precedence over sending a heartbeat.
    #[must_use]
    pub fn evaluate(&self, now: Instant) -> LivenessAction {
        let (Some(interval), Some(last_read), Some(last_write)) =
            (self.interval, self.last_read, self.last_write)
        else {
            return LivenessAction::Idle;
        };

        let since_read = now.saturating_duration_since(last_read);
        let since_write = now.saturating_duration_since(last_write);

        if since_read > interval * 2 {
            LivenessAction::Reconnect
        } else if since_write > interval / 2 {
            LivenessAction::SendHeartbeat
        } else {
            LivenessAction::Idle
        }
    }

    /// Upper bound for an idle wait so the next evaluation is not starved.
    #[must_use]
    pub fn wait_slice(&self) -> Option<Duration> {
        self.interval.map(|i| i / 2)
    }
}
