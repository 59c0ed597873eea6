//! Document Submitter
//!
//! One submission = one rate-limit slot + one transport call. The request
//! body is built before queueing for a slot, so a document that fails to
//! serialize never costs quota, and the limiter lock is never held while the
//! network call runs.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::Config;
use crate::error::SubmitError;
use crate::rate_limit::{RateLimiter, WindowUnit};
use crate::registry::envelope::RequestEnvelope;
use crate::registry::transport::{HttpTransport, Transport, DEFAULT_ENDPOINT};

/// Outcome of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    /// Raw response body returned by the registry
    pub body: String,

    /// Time spent waiting for a rate-limit slot
    pub queued_for: Duration,
}

/// Rate-limited document client
///
/// Cheap to share behind an `Arc`; every clone of the limiter `Arc` counts
/// against the same quota.
pub struct DocumentSubmitter<T: Transport> {
    limiter: Arc<RateLimiter>,
    transport: T,
}

impl<T: Transport> DocumentSubmitter<T> {
    /// Create a submitter from an existing limiter and transport
    pub fn new(limiter: Arc<RateLimiter>, transport: T) -> Self {
        Self { limiter, transport }
    }

    /// The limiter gating this submitter
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit `document` signed with `signature`
    ///
    /// Waits for a rate-limit slot, then sends
    /// `{"document": "<document as JSON string>", "signature": "<signature>"}`
    /// once. The transport's response or error is returned as is.
    ///
    /// # Errors
    ///
    /// - `EmptySignature` / `Serialization` before any quota is consumed
    /// - `RateLimit(Shutdown)` if the limiter stops while waiting
    /// - `Transport` for delivery failures
    pub async fn submit<D>(&self, document: &D, signature: &str) -> Result<SubmissionResult, SubmitError>
    where
        D: Serialize + ?Sized,
    {
        let body = prepare_body(document, signature)?;
        let started = Instant::now();
        self.limiter.acquire().await?;
        self.deliver(body, started.elapsed()).await
    }

    /// Like [`submit`](Self::submit), but give up if no slot is granted
    /// within `timeout`
    ///
    /// The timeout bounds only the wait for a slot, not the transport call.
    pub async fn submit_timeout<D>(
        &self,
        document: &D,
        signature: &str,
        timeout: Duration,
    ) -> Result<SubmissionResult, SubmitError>
    where
        D: Serialize + ?Sized,
    {
        let body = prepare_body(document, signature)?;
        let started = Instant::now();
        self.limiter.acquire_timeout(timeout).await?;
        self.deliver(body, started.elapsed()).await
    }

    /// Stop the limiter, failing queued and future submissions
    pub fn shutdown(&self) {
        self.limiter.shutdown();
    }

    async fn deliver(&self, body: String, queued_for: Duration) -> Result<SubmissionResult, SubmitError> {
        tracing::debug!(queued_ms = queued_for.as_millis() as u64, "Slot granted, submitting document");
        let body = self.transport.send(body).await?;
        Ok(SubmissionResult { body, queued_for })
    }
}

impl DocumentSubmitter<HttpTransport> {
    /// Client for the default registry endpoint allowing `request_limit`
    /// submissions per `window_unit`
    ///
    /// Must be called inside a tokio runtime.
    pub fn rate_limited(window_unit: WindowUnit, request_limit: u32) -> Result<Self, SubmitError> {
        let limiter = RateLimiter::new(request_limit, window_unit.duration())?;
        let transport = HttpTransport::new(DEFAULT_ENDPOINT)?;
        Ok(Self::new(Arc::new(limiter), transport))
    }

    /// Client built from loaded configuration
    pub fn from_config(config: &Config) -> Result<Self, SubmitError> {
        let limiter = RateLimiter::from_config(&config.rate_limit)?;
        let transport =
            HttpTransport::new(config.registry.endpoint.clone())?.with_timeout(config.registry.timeout())?;
        Ok(Self::new(Arc::new(limiter), transport))
    }
}

fn prepare_body<D>(document: &D, signature: &str) -> Result<String, SubmitError>
where
    D: Serialize + ?Sized,
{
    if signature.is_empty() {
        return Err(SubmitError::EmptySignature);
    }
    Ok(RequestEnvelope::new(document, signature)?.to_body()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateLimitError;
    use crate::registry::transport::TransportError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records request bodies and answers with a fixed status
    #[derive(Default)]
    struct RecordingTransport {
        bodies: Mutex<Vec<String>>,
        fail_with: Option<u16>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, body: String) -> Result<String, TransportError> {
            self.bodies.lock().unwrap().push(body);
            match self.fail_with {
                Some(status) => Err(TransportError::Status {
                    status,
                    body: "rejected".to_string(),
                }),
                None => Ok(r#"{"value":"ok"}"#.to_string()),
            }
        }
    }

    fn submitter(capacity: u32, transport: RecordingTransport) -> DocumentSubmitter<RecordingTransport> {
        let limiter = RateLimiter::new(capacity, Duration::from_secs(60)).unwrap();
        DocumentSubmitter::new(Arc::new(limiter), transport)
    }

    #[tokio::test]
    async fn test_request_body_contract() {
        let submitter = submitter(5, RecordingTransport::default());

        let result = submitter.submit(&json!({"doc_id": "X"}), "sig").await.unwrap();
        assert_eq!(result.body, r#"{"value":"ok"}"#);

        let bodies = submitter.transport().bodies.lock().unwrap().clone();
        assert_eq!(bodies, vec![r#"{"document":"{\"doc_id\":\"X\"}","signature":"sig"}"#]);
    }

    #[tokio::test]
    async fn test_empty_signature_consumes_no_quota() {
        let submitter = submitter(1, RecordingTransport::default());

        let result = submitter.submit(&json!({"doc_id": "X"}), "").await;
        assert!(matches!(result, Err(SubmitError::EmptySignature)));
        assert_eq!(submitter.limiter().stats().admitted, 0);
        assert!(submitter.transport().bodies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let submitter = submitter(
            5,
            RecordingTransport {
                fail_with: Some(400),
                ..Default::default()
            },
        );

        let result = submitter.submit(&json!({"doc_id": "X"}), "sig").await;
        match result {
            Err(SubmitError::Transport(TransportError::Status { status, body })) => {
                assert_eq!(status, 400);
                assert_eq!(body, "rejected");
            }
            other => panic!("expected transport error, got {:?}", other),
        }
        // The attempt still used its slot
        assert_eq!(submitter.limiter().stats().admitted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_timeout_when_exhausted() {
        let submitter = submitter(1, RecordingTransport::default());
        submitter.submit(&json!({}), "sig").await.unwrap();

        let result = submitter
            .submit_timeout(&json!({}), "sig", Duration::from_secs(1))
            .await;
        assert!(matches!(
            result,
            Err(SubmitError::RateLimit(RateLimitError::TimedOut(_)))
        ));
        assert_eq!(submitter.transport().bodies.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown() {
        let submitter = submitter(5, RecordingTransport::default());
        submitter.shutdown();

        let result = submitter.submit(&json!({}), "sig").await;
        assert!(matches!(
            result,
            Err(SubmitError::RateLimit(RateLimitError::Shutdown))
        ));
    }

    #[tokio::test]
    async fn test_rate_limited_constructor() {
        let submitter = DocumentSubmitter::rate_limited(WindowUnit::Minutes, 5).unwrap();
        assert_eq!(submitter.limiter().capacity(), 5);
        assert_eq!(submitter.limiter().window(), Duration::from_secs(60));
        assert_eq!(submitter.transport().url(), DEFAULT_ENDPOINT);
    }

    #[tokio::test]
    async fn test_rate_limited_rejects_zero_limit() {
        let result = DocumentSubmitter::rate_limited(WindowUnit::Seconds, 0);
        assert!(matches!(
            result,
            Err(SubmitError::RateLimit(RateLimitError::InvalidConfiguration(_)))
        ));
    }
}
