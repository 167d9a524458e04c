//! Invoice types
//!
//! Invoices arrive as JSON documents uploaded under a one-off key. Importing
//! one stores an [`Invoice`] keyed by `(customer_name, invoice_number)` and an
//! [`InvoiceEventRecord`] keyed for the event store as:
//!
//! - `pk = "#invoice_{customer_name}"`
//! - `sk = "{invoice_number}"`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ValidationError, EVENT_TTL_SECS};

/// Prefix of every invoice event partition key
pub const INVOICE_PK_PREFIX: &str = "#invoice_";

/// How long an upload key accepts a document (5 minutes)
pub const INVOICE_UPLOAD_TTL_SECS: i64 = 300;

/// Uploaded invoice document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFile {
    pub customer_name: String,
    pub invoice_number: String,
    pub total_value: f64,
    pub product_id: String,
    pub quantity: u32,
}

impl InvoiceFile {
    /// Parse and validate an uploaded document
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        let file: Self = serde_json::from_slice(bytes)
            .map_err(|e| ValidationError::InvalidDocument(e.to_string()))?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.customer_name.trim().is_empty() {
            return Err(ValidationError::Blank("customerName"));
        }
        if self.invoice_number.trim().is_empty() {
            return Err(ValidationError::Blank("invoiceNumber"));
        }
        if self.product_id.trim().is_empty() {
            return Err(ValidationError::Blank("productId"));
        }
        if !self.total_value.is_finite() || self.total_value < 0.0 {
            return Err(ValidationError::InvalidTotal);
        }
        if self.quantity == 0 {
            return Err(ValidationError::InvalidQuantity);
        }
        Ok(())
    }
}

/// Stored invoice; `key` is the upload it was imported from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub customer_name: String,
    pub invoice_number: String,
    pub total_value: f64,
    pub product_id: String,
    pub quantity: u32,
    pub key: String,
}

impl Invoice {
    pub fn from_file(file: InvoiceFile, key: &str) -> Self {
        Self {
            customer_name: file.customer_name,
            invoice_number: file.invoice_number,
            total_value: file.total_value,
            product_id: file.product_id,
            quantity: file.quantity,
            key: key.to_string(),
        }
    }
}

/// Persisted audit row for an imported invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceEventRecord {
    pub pk: String,
    pub sk: String,
    pub ttl: i64,
    /// The invoice's customer
    pub username: String,
    /// Milliseconds since epoch
    pub created_at: i64,
    pub key: String,
}

impl InvoiceEventRecord {
    /// Build the audit record for an invoice imported at `received_at`
    pub fn from_invoice(invoice: &Invoice, received_at: DateTime<Utc>) -> Self {
        Self {
            pk: invoice_partition_key(&invoice.customer_name),
            sk: invoice.invoice_number.clone(),
            ttl: received_at.timestamp() + EVENT_TTL_SECS,
            username: invoice.customer_name.clone(),
            created_at: received_at.timestamp_millis(),
            key: invoice.key.clone(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.ttl
    }
}

/// Partition key for a customer's invoice events
pub fn invoice_partition_key(customer_name: &str) -> String {
    format!("{INVOICE_PK_PREFIX}{customer_name}")
}

/// Response to an upload request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSlot {
    pub key: String,
    pub url: String,
    /// Seconds the slot stays open
    pub expires: i64,
}
