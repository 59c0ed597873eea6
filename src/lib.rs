//! Registry Client Library
//!
//! Submits signed documents to a remote registry without exceeding a fixed
//! number of requests per time window.
//!
//! - [`rate_limit`]: the admission gate every submission passes through
//! - [`registry`]: document types, request envelope, transport and submitter
//! - [`config`]: file and environment configuration
//!
//! # Example
//!
//! ```ignore
//! use registry_client::{DocumentSubmitter, WindowUnit, Document};
//!
//! let client = DocumentSubmitter::rate_limited(WindowUnit::Minutes, 5)?;
//! let result = client.submit(&Document::sample(), "signature").await?;
//! println!("{}", result.body);
//! ```

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod registry;

pub use error::SubmitError;
pub use rate_limit::{RateLimitError, RateLimiter, WindowPolicy, WindowUnit};
pub use registry::{Document, DocumentSubmitter, HttpTransport, SubmissionResult, Transport};
