//! Registry Document Types
//!
//! Typed form of the document accepted by the registry's create endpoint.
//! Field names follow the registry's wire format. `submit` accepts any
//! `Serialize` value, so callers holding raw JSON can skip these types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Participant block of a document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Description {
    /// Taxpayer number of the participant
    #[serde(rename = "participantInn")]
    pub participant_inn: String,
}

/// One product line of a document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_document: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_document_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_document_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_inn: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer_inn: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_date: Option<NaiveDate>,

    /// Commodity classification code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tnved_code: Option<String>,

    /// Unit identification code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uit_code: Option<String>,

    /// Transport-package identification code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uitu_code: Option<String>,
}

/// A document submitted to the registry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Description>,

    pub doc_id: String,

    pub doc_status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,

    #[serde(rename = "importRequest", skip_serializing_if = "Option::is_none")]
    pub import_request: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_inn: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_inn: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer_inn: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<Product>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reg_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reg_number: Option<String>,
}

impl Document {
    /// Create a document with the required identifiers
    pub fn new(doc_id: impl Into<String>, doc_status: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            doc_status: doc_status.into(),
            ..Self::default()
        }
    }

    /// Set the participant block
    pub fn with_participant(mut self, participant_inn: impl Into<String>) -> Self {
        self.description = Some(Description {
            participant_inn: participant_inn.into(),
        });
        self
    }

    /// Append a product line
    pub fn with_product(mut self, product: Product) -> Self {
        self.products.push(product);
        self
    }

    /// A filled-in example, handy for smoke-testing an endpoint
    pub fn sample() -> Self {
        Self::new("string", "string")
            .with_participant("string")
            .with_product(Product {
                certificate_document: Some("string".to_string()),
                certificate_document_date: NaiveDate::from_ymd_opt(2020, 1, 23),
                ..Product::default()
            })
    }
}
