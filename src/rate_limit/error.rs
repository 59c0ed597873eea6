//! Rate Limiter Error Types

use std::time::Duration;

/// Error types for slot acquisition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// Zero capacity or zero window supplied at construction
    #[error("Invalid rate limit configuration: {0}")]
    InvalidConfiguration(String),

    /// Gave up waiting for a slot; no quota was consumed
    #[error("Timed out after {0:?} waiting for a rate limit slot")]
    TimedOut(Duration),

    /// The limiter was shut down before a slot was granted
    #[error("Rate limiter has been shut down")]
    Shutdown,

    /// No slot is free right now (non-blocking acquire only)
    #[error("Rate limit exhausted for the current window")]
    Exhausted,
}

impl RateLimitError {
    /// Whether the caller may retry later
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RateLimitError::TimedOut(_) | RateLimitError::Exhausted)
    }
}
