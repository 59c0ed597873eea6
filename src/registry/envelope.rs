//! Registry Request Envelope
//!
//! The registry expects the document as a JSON *string* inside the request
//! body rather than a nested object:
//!
//! ```json
//! {
//!   "document": "{\"doc_id\":\"X\"}",
//!   "signature": "sig"
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Body of a document-creation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestEnvelope {
    /// The document, serialized to a JSON string
    pub document: String,

    /// Detached signature over the document
    pub signature: String,
}

impl RequestEnvelope {
    /// Serialize `document` and wrap it with `signature`
    pub fn new<D: Serialize + ?Sized>(
        document: &D,
        signature: impl Into<String>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            document: serde_json::to_string(document)?,
            signature: signature.into(),
        })
    }

    /// Render the request body sent to the transport
    pub fn to_body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
