//! Rate Limiter
//!
//! Admission gate shared by every submission. Callers that find the window
//! exhausted park on a oneshot channel and join a FIFO queue; a background
//! task owned by the limiter replenishes the window and hands freed slots to
//! the queue head. Nothing polls.
//!
//! # Window policies
//!
//! - **Fixed** (default): the count resets to zero at every window boundary.
//!   Up to `2 * capacity` grants can fall inside one window length when
//!   they straddle a boundary.
//! - **Sliding**: every grant timestamp is kept, and a slot frees exactly one
//!   window length after the grant that took it.
//!
//! # Example
//!
//! ```ignore
//! let limiter = RateLimiter::new(5, Duration::from_secs(60))?;
//! limiter.acquire().await?;
//! // ... one submission ...
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::config::{RateLimitConfig, WindowPolicy};
use super::error::RateLimitError;
use super::window::{Grant, Window};

type GrantSender = oneshot::Sender<Result<Grant, RateLimitError>>;
type GrantReceiver = oneshot::Receiver<Result<Grant, RateLimitError>>;

/// A parked caller
struct Waiter {
    ticket: u64,
    tx: GrantSender,
}

/// State guarded by the limiter mutex
struct Shared {
    window: Window,
    waiters: VecDeque<Waiter>,
    next_ticket: u64,
    shut_down: bool,
}

impl Shared {
    /// Hand free slots to waiters in arrival order.
    ///
    /// Returns the number of waiters granted.
    fn dispatch(&mut self, now: Instant) -> usize {
        let mut granted = 0;
        while !self.waiters.is_empty() {
            let Some(grant) = self.window.try_admit(now) else {
                break;
            };
            let Some(waiter) = self.waiters.pop_front() else {
                self.window.refund(grant);
                break;
            };
            match waiter.tx.send(Ok(grant)) {
                Ok(()) => {
                    tracing::debug!(ticket = waiter.ticket, "Granted queued caller");
                    granted += 1;
                }
                Err(_) => self.window.refund(grant),
            }
        }
        granted
    }
}

fn lock(state: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    // Critical sections never panic midway, so a poisoned guard is still consistent
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of limiter state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimiterStats {
    /// Maximum admissions per window
    pub capacity: u32,

    /// Admissions counted in the current window
    pub admitted: u32,

    /// Callers parked in the queue
    pub waiting: usize,

    /// Window length
    pub window: Duration,

    /// Counting policy
    pub policy: WindowPolicy,

    /// Whether `shutdown()` has run
    pub shut_down: bool,
}

/// Concurrency-safe admission gate
///
/// Must be created inside a tokio runtime: construction spawns the
/// replenishment task, which is aborted on [`RateLimiter::shutdown`] or drop.
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    policy: WindowPolicy,
    state: Arc<Mutex<Shared>>,
    wake: Arc<Notify>,
    replenisher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("capacity", &self.capacity)
            .field("window", &self.window)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Create a fixed-window limiter admitting `capacity` callers per `window`
    pub fn new(capacity: u32, window: Duration) -> Result<Self, RateLimitError> {
        Self::with_policy(capacity, window, WindowPolicy::Fixed)
    }

    /// Create a limiter from configuration
    pub fn from_config(config: &RateLimitConfig) -> Result<Self, RateLimitError> {
        config.validate()?;
        Self::with_policy(config.request_limit, config.window(), config.policy)
    }

    /// Create a limiter with an explicit window policy
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a zero capacity or zero window, or
    /// when called outside a tokio runtime.
    pub fn with_policy(
        capacity: u32,
        window: Duration,
        policy: WindowPolicy,
    ) -> Result<Self, RateLimitError> {
        if capacity == 0 {
            return Err(RateLimitError::InvalidConfiguration(
                "capacity must be > 0".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(RateLimitError::InvalidConfiguration(
                "window duration must be > 0".to_string(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            RateLimitError::InvalidConfiguration(format!("no tokio runtime available: {}", e))
        })?;

        let start = Instant::now();
        let state = Arc::new(Mutex::new(Shared {
            window: Window::new(capacity, window, policy, start),
            waiters: VecDeque::new(),
            next_ticket: 0,
            shut_down: false,
        }));
        let wake = Arc::new(Notify::new());

        let task = match policy {
            WindowPolicy::Fixed => runtime.spawn(run_fixed(state.clone(), start, window)),
            WindowPolicy::Sliding => runtime.spawn(run_sliding(state.clone(), wake.clone())),
        };

        tracing::info!(
            capacity,
            window_ms = window.as_millis() as u64,
            ?policy,
            "Rate limiter started"
        );

        Ok(Self {
            capacity,
            window,
            policy,
            state,
            wake,
            replenisher: Mutex::new(Some(task)),
        })
    }

    /// Wait for a slot and consume it
    ///
    /// Returns immediately while the window has room. Otherwise the caller is
    /// queued behind earlier waiters and resumes when the window replenishes.
    /// Dropping the returned future removes the caller from the queue without
    /// consuming quota.
    ///
    /// # Errors
    ///
    /// `Shutdown` if the limiter is or becomes shut down before a grant.
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        let mut pending = {
            let mut shared = lock(&self.state);
            if shared.shut_down {
                return Err(RateLimitError::Shutdown);
            }

            let now = Instant::now();
            shared.dispatch(now);
            if shared.waiters.is_empty() && shared.window.try_admit(now).is_some() {
                tracing::debug!("Granted immediately");
                return Ok(());
            }

            let (tx, rx) = oneshot::channel();
            let ticket = shared.next_ticket;
            shared.next_ticket += 1;
            shared.waiters.push_back(Waiter { ticket, tx });
            tracing::debug!(ticket, waiting = shared.waiters.len(), "Window exhausted, queued");

            PendingGrant {
                ticket,
                rx,
                state: self.state.clone(),
                settled: false,
            }
        };

        self.wake.notify_one();
        pending.wait().await
    }

    /// Like [`acquire`](Self::acquire), but give up after `timeout`
    ///
    /// # Errors
    ///
    /// `TimedOut` when no slot was granted in time. No quota is consumed.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<(), RateLimitError> {
        match tokio::time::timeout(timeout, self.acquire()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(timeout_ms = timeout.as_millis() as u64, "Acquire timed out");
                Err(RateLimitError::TimedOut(timeout))
            }
        }
    }

    /// Take a slot only if one is free right now and nobody is queued
    ///
    /// # Errors
    ///
    /// `Exhausted` when the caller would have to wait, `Shutdown` after shutdown.
    pub fn try_acquire(&self) -> Result<(), RateLimitError> {
        let mut shared = lock(&self.state);
        if shared.shut_down {
            return Err(RateLimitError::Shutdown);
        }
        let now = Instant::now();
        shared.dispatch(now);
        if shared.waiters.is_empty() && shared.window.try_admit(now).is_some() {
            Ok(())
        } else {
            Err(RateLimitError::Exhausted)
        }
    }

    /// Stop replenishing and release every waiter with `Shutdown`
    ///
    /// Idempotent. Later `acquire()` calls fail fast.
    pub fn shutdown(&self) {
        let released: Vec<Waiter> = {
            let mut shared = lock(&self.state);
            if shared.shut_down {
                return;
            }
            shared.shut_down = true;
            shared.waiters.drain(..).collect()
        };

        let count = released.len();
        for waiter in released {
            let _ = waiter.tx.send(Err(RateLimitError::Shutdown));
        }

        let task = self
            .replenisher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }

        tracing::info!(released = count, "Rate limiter shut down");
    }

    /// Current usage snapshot
    pub fn stats(&self) -> LimiterStats {
        let shared = lock(&self.state);
        LimiterStats {
            capacity: self.capacity,
            admitted: shared.window.admitted(Instant::now()),
            waiting: shared.waiters.len(),
            window: self.window,
            policy: self.policy,
            shut_down: shared.shut_down,
        }
    }

    /// Maximum admissions per window
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Window length
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Counting policy
    pub fn policy(&self) -> WindowPolicy {
        self.policy
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A queued caller's claim on a future grant
///
/// Dropping it before the grant is observed withdraws the caller. A grant
/// that was already delivered is refunded and passed to the next waiter.
struct PendingGrant {
    ticket: u64,
    rx: GrantReceiver,
    state: Arc<Mutex<Shared>>,
    settled: bool,
}

impl PendingGrant {
    async fn wait(&mut self) -> Result<(), RateLimitError> {
        let outcome = (&mut self.rx).await;
        self.settled = true;
        match outcome {
            Ok(Ok(_grant)) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RateLimitError::Shutdown),
        }
    }
}

impl Drop for PendingGrant {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let mut shared = lock(&self.state);
        shared.waiters.retain(|w| w.ticket != self.ticket);

        if let Ok(Ok(grant)) = self.rx.try_recv() {
            shared.window.refund(grant);
            shared.dispatch(Instant::now());
            tracing::debug!(ticket = self.ticket, "Cancelled after grant, slot refunded");
        } else {
            tracing::debug!(ticket = self.ticket, "Cancelled while queued");
        }
    }
}

/// Reset the window at every boundary and wake the queue
async fn run_fixed(state: Arc<Mutex<Shared>>, start: Instant, window: Duration) {
    let mut ticker = tokio::time::interval_at(start + window, window);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let mut shared = lock(&state);
        let now = Instant::now();
        shared.window.roll(now);
        let granted = shared.dispatch(now);
        tracing::debug!(granted, waiting = shared.waiters.len(), "Window reset");
    }
}

/// Sleep until the oldest grant ages out, or until a new caller queues
async fn run_sliding(state: Arc<Mutex<Shared>>, wake: Arc<Notify>) {
    loop {
        let release = {
            let mut shared = lock(&state);
            let granted = shared.dispatch(Instant::now());
            if granted > 0 {
                tracing::debug!(granted, waiting = shared.waiters.len(), "Sliding window released slots");
            }
            if shared.waiters.is_empty() {
                None
            } else {
                shared.window.next_release()
            }
        };

        match release {
            Some(at) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(at) => {}
                    _ = wake.notified() => {}
                }
            }
            None => wake.notified().await,
        }
    }
}
