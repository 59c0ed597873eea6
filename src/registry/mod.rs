//! Registry Client
//!
//! Submission side of the crate, organized in three layers:
//!
//! 1. **Document Layer** (`document`, `envelope`): registry document types
//!    and the `{document, signature}` request body
//! 2. **Transport Layer** (`transport`): the HTTP POST to the registry
//! 3. **Client Layer** (`submitter`): rate-limited submission API

pub mod document;
pub mod envelope;
pub mod submitter;
pub mod transport;

pub use document::{Description, Document, Product};
pub use envelope::RequestEnvelope;
pub use submitter::{DocumentSubmitter, SubmissionResult};
pub use transport::{HttpTransport, Transport, TransportError, DEFAULT_ENDPOINT};
