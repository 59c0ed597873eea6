//! Window Accounting
//!
//! Synchronous bookkeeping for admissions inside the current window. The
//! limiter holds a `Window` behind its mutex; every check-and-count happens
//! in a single call here so that the window is never read stale.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use super::config::WindowPolicy;

/// Receipt for one admission, used to give the slot back if the caller
/// disappeared before seeing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Grant {
    /// Fixed-window epoch the grant was counted in
    epoch: u64,
    /// When the grant was made
    at: Instant,
}

#[derive(Debug)]
pub(crate) struct Window {
    capacity: u32,
    length: Duration,
    policy: WindowPolicy,

    /// Start of the current fixed window
    start: Instant,
    /// Incremented on every fixed-window reset
    epoch: u64,
    /// Admissions counted since `start` (fixed policy)
    admitted: u32,

    /// Grant timestamps inside the trailing window (sliding policy)
    grants: VecDeque<Instant>,
}

impl Window {
    pub(crate) fn new(capacity: u32, length: Duration, policy: WindowPolicy, now: Instant) -> Self {
        Self {
            capacity,
            length,
            policy,
            start: now,
            epoch: 0,
            admitted: 0,
            grants: VecDeque::with_capacity(capacity as usize),
        }
    }

    #[cfg(test)]
    pub(crate) fn start(&self) -> Instant {
        self.start
    }

    /// Bring the window up to date with `now`.
    ///
    /// Fixed windows advance by whole multiples of the window length so
    /// boundaries stay aligned to the original start, however late the
    /// reset timer runs.
    pub(crate) fn roll(&mut self, now: Instant) {
        match self.policy {
            WindowPolicy::Fixed => {
                let elapsed = now.saturating_duration_since(self.start);
                if elapsed < self.length {
                    return;
                }
                let periods = elapsed.as_nanos() / self.length.as_nanos();
                let advance = self.length.as_nanos().saturating_mul(periods);
                self.start += Duration::from_nanos(u64::try_from(advance).unwrap_or(u64::MAX));
                self.epoch += 1;
                self.admitted = 0;
            }
            WindowPolicy::Sliding => {
                while let Some(oldest) = self.grants.front() {
                    if now.saturating_duration_since(*oldest) >= self.length {
                        self.grants.pop_front();
                    } else {
                        break;
                    }
                }
            }
        }
    }

    /// Count one admission if the window has room for it.
    pub(crate) fn try_admit(&mut self, now: Instant) -> Option<Grant> {
        self.roll(now);
        match self.policy {
            WindowPolicy::Fixed => {
                if self.admitted >= self.capacity {
                    return None;
                }
                self.admitted += 1;
            }
            WindowPolicy::Sliding => {
                if self.grants.len() >= self.capacity as usize {
                    return None;
                }
                self.grants.push_back(now);
            }
        }
        Some(Grant {
            epoch: self.epoch,
            at: now,
        })
    }

    /// Return a grant nobody used.
    ///
    /// A fixed-window grant from an earlier epoch was already wiped by the
    /// reset and is not counted twice.
    pub(crate) fn refund(&mut self, grant: Grant) {
        match self.policy {
            WindowPolicy::Fixed => {
                if grant.epoch == self.epoch {
                    self.admitted = self.admitted.saturating_sub(1);
                }
            }
            WindowPolicy::Sliding => {
                if let Some(pos) = self.grants.iter().rposition(|at| *at == grant.at) {
                    self.grants.remove(pos);
                }
            }
        }
    }

    /// Admissions counted against the window as of `now`
    pub(crate) fn admitted(&self, now: Instant) -> u32 {
        match self.policy {
            WindowPolicy::Fixed => {
                if now.saturating_duration_since(self.start) >= self.length {
                    0
                } else {
                    self.admitted
                }
            }
            WindowPolicy::Sliding => self
                .grants
                .iter()
                .filter(|at| now.saturating_duration_since(**at) < self.length)
                .count() as u32,
        }
    }

    /// Instant at which the next slot frees up, if the window is full
    pub(crate) fn next_release(&self) -> Option<Instant> {
        match self.policy {
            WindowPolicy::Fixed => {
                if self.admitted >= self.capacity {
                    Some(self.start + self.length)
                } else {
                    None
                }
            }
            WindowPolicy::Sliding => {
                if self.grants.len() >= self.capacity as usize {
                    self.grants.front().map(|oldest| *oldest + self.length)
                } else {
                    None
                }
            }
        }
    }
}
