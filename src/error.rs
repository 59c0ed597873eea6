//! Submission Error Types
//!
//! Everything `DocumentSubmitter::submit` can fail with. Limiter and
//! transport errors are carried unchanged so callers can match on them.

use crate::rate_limit::RateLimitError;
use crate::registry::transport::TransportError;

/// Error types for document submission
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The signature was empty
    #[error("Signature must not be empty")]
    EmptySignature,

    /// The document could not be serialized to JSON
    #[error("Failed to serialize document: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No slot was granted (invalid limiter, timeout or shutdown)
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    /// The transport failed to deliver the request
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SubmitError {
    /// Whether the same submission may succeed if retried later
    pub fn is_recoverable(&self) -> bool {
        match self {
            SubmitError::RateLimit(e) => e.is_recoverable(),
            SubmitError::Transport(TransportError::Request(_)) => true,
            SubmitError::Transport(TransportError::Status { status, .. }) => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rate_limit_error_is_transparent() {
        let err = SubmitError::from(RateLimitError::Shutdown);
        assert_eq!(err.to_string(), "Rate limiter has been shut down");
    }

    #[test]
    fn test_recoverability() {
        assert!(SubmitError::from(RateLimitError::TimedOut(Duration::from_secs(1))).is_recoverable());
        assert!(!SubmitError::from(RateLimitError::Shutdown).is_recoverable());
        assert!(!SubmitError::EmptySignature.is_recoverable());
        assert!(SubmitError::from(TransportError::Status {
            status: 502,
            body: String::new()
        })
        .is_recoverable());
        assert!(!SubmitError::from(TransportError::Status {
            status: 400,
            body: String::new()
        })
        .is_recoverable());
    }
}
