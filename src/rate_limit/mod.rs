//! Rate Limiting Module
//!
//! This module provides the admission gate that caps how many documents are
//! submitted per time window.
//!
//! # Features
//!
//! - Fixed-window (default) and sliding-window counting
//! - FIFO hand-off to blocked callers, no polling
//! - Cancellation and timeouts that never leak quota
//! - Owned replenishment task, stopped on shutdown or drop
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      RateLimiter                          │
//! ├──────────────────────────────────────────────────────────┤
//! │  acquire() ──► Mutex<Shared> ◄── replenisher task        │
//! │                 ├─ Window (count / grant timestamps)      │
//! │                 └─ FIFO waiters (oneshot senders)         │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod limiter;
mod window;

pub use config::{RateLimitConfig, WindowPolicy, WindowUnit};
pub use error::RateLimitError;
pub use limiter::{LimiterStats, RateLimiter};
