//! Registry Transport Layer
//!
//! The transport only moves an already-serialized request body to the
//! registry and hands back the raw response body. Rate limiting, envelope
//! construction and document serialization all happen before it is called.

use async_trait::async_trait;
use std::time::Duration;

/// Document-creation endpoint of the registry
pub const DEFAULT_ENDPOINT: &str = "https://ismp.crpt.ru/api/v3/lk/documents/create";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error types for registry transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection, TLS, timeout or body-read failure
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The registry answered with a non-success status
    #[error("Registry responded with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Transport trait for registry communication
///
/// Implementations are shared across concurrent submissions, so `send`
/// takes `&self`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to the registry and return the raw response body
    async fn send(&self, body: String) -> Result<String, TransportError>;
}

/// HTTP transport for the registry
///
/// # Example
///
/// ```ignore
/// let transport = HttpTransport::new(DEFAULT_ENDPOINT)?
///     .with_timeout(Duration::from_secs(10))?;
/// let response = transport.send(body).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Reqwest HTTP client
    client: reqwest::Client,

    /// Registry endpoint URL
    url: String,

    /// Request timeout
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport posting to `url` with the default timeout
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT)?,
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Rebuild the client with a different request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, TransportError> {
        self.client = build_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    /// Get the endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(TransportError::Client)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: String) -> Result<String, TransportError> {
        tracing::debug!(url = %self.url, bytes = body.len(), "Sending HTTP POST");

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(TransportError::Request)?;

        let status = response.status();
        let text = response.text().await.map_err(TransportError::Request)?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Registry rejected request");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        tracing::debug!(status = status.as_u16(), bytes = text.len(), "Received HTTP response");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_creation() {
        let transport = HttpTransport::new("https://example.com/documents").unwrap();
        assert_eq!(transport.url(), "https://example.com/documents");
        assert_eq!(transport.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_http_transport_with_timeout() {
        let transport = HttpTransport::new(DEFAULT_ENDPOINT)
            .unwrap()
            .with_timeout(Duration::from_secs(5))
            .unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(5));
        assert_eq!(transport.url(), DEFAULT_ENDPOINT);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        // Port 9 (discard) on loopback is closed in test environments
        let transport = HttpTransport::new("http://127.0.0.1:9/documents")
            .unwrap()
            .with_timeout(Duration::from_secs(2))
            .unwrap();

        let result = transport.send("{}".to_string()).await;
        assert!(matches!(result, Err(TransportError::Request(_))));
    }

    /// Accept one connection, capture the raw request, answer with `status_line`
    async fn serve_once(
        status_line: &'static str,
        reply: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/documents", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                reply.len(),
                reply
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_posts_json_body() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", "{\"status\":\"ok\"}").await;
        let transport = HttpTransport::new(url).unwrap();

        let response = transport
            .send(r#"{"document":"{}","signature":"sig"}"#.to_string())
            .await
            .unwrap();
        assert_eq!(response, r#"{"status":"ok"}"#);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /documents HTTP/1.1"));
        assert!(request.to_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"document":"{}","signature":"sig"}"#));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let (url, server) = serve_once("HTTP/1.1 503 Service Unavailable", "busy").await;
        let transport = HttpTransport::new(url).unwrap();

        let result = transport.send("{}".to_string()).await;
        match result {
            Err(TransportError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
            }
            other => panic!("expected status error, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[test]
    fn test_status_error_display() {
        let err = TransportError::Status {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "Registry responded with status 401: unauthorized");
    }

    #[test]
    fn test_transport_trait_bounds() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpTransport>();
    }
}
