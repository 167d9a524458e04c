//! Product event types
//!
//! A [`ProductEvent`] is the message a product mutation publishes. The audit
//! consumer turns each message into a [`ProductEventRecord`], keyed for the
//! event store as:
//!
//! - `pk = "#product_{code}"`
//! - `sk = "{EVENT_TYPE}#{created_at_millis}#{message_id}"`
//!
//! The message id keeps two events of the same type landing in the same
//! millisecond apart, while a redelivered message overwrites its own row.
//!
//! Records carry a `ttl` (seconds since epoch) after which the store may
//! expire them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProductId, ValidationError};

/// Prefix of every product partition key
pub const PRODUCT_PK_PREFIX: &str = "#product_";

/// How long audit records are kept (7 days)
pub const EVENT_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Kind of product mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductEventType {
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
}

impl ProductEventType {
    /// Wire name, also the leading part of the sort key
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProductCreated => "PRODUCT_CREATED",
            Self::ProductUpdated => "PRODUCT_UPDATED",
            Self::ProductDeleted => "PRODUCT_DELETED",
        }
    }
}

impl std::fmt::Display for ProductEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductEventType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRODUCT_CREATED" => Ok(Self::ProductCreated),
            "PRODUCT_UPDATED" => Ok(Self::ProductUpdated),
            "PRODUCT_DELETED" => Ok(Self::ProductDeleted),
            other => Err(ValidationError::UnknownEventType(other.to_string())),
        }
    }
}

/// Queue message emitted on every product mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEvent {
    pub request_id: String,
    pub event_type: ProductEventType,
    pub product_id: ProductId,
    pub product_code: String,
    pub username: String,
}

/// Persisted audit row for a product event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEventRecord {
    pub pk: String,
    pub sk: String,
    pub ttl: i64,
    pub username: String,
    /// Milliseconds since epoch
    pub created_at: i64,
    pub request_id: String,
    pub event_type: ProductEventType,
    pub product_id: ProductId,
    pub message_id: String,
}

impl ProductEventRecord {
    /// Build the audit record for a message received at `received_at`
    pub fn from_event(event: &ProductEvent, message_id: &str, received_at: DateTime<Utc>) -> Self {
        let created_at = received_at.timestamp_millis();
        Self {
            pk: product_partition_key(&event.product_code),
            sk: product_sort_key(event.event_type, created_at, message_id),
            ttl: received_at.timestamp() + EVENT_TTL_SECS,
            username: event.username.clone(),
            created_at,
            request_id: event.request_id.clone(),
            event_type: event.event_type,
            product_id: event.product_id,
            message_id: message_id.to_string(),
        }
    }

    /// Whether the record's TTL has passed at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.ttl
    }
}

/// Partition key for a product code
pub fn product_partition_key(code: &str) -> String {
    format!("{PRODUCT_PK_PREFIX}{code}")
}

/// Sort key for an event type, creation time in milliseconds and message id
pub fn product_sort_key(
    event_type: ProductEventType,
    created_at_millis: i64,
    message_id: &str,
) -> String {
    format!("{}#{created_at_millis}#{message_id}", event_type.as_str())
}

/// Product event as returned by the query endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEventView {
    pub created_at: i64,
    pub event_type: String,
    pub username: String,
    pub product_id: ProductId,
    pub request_id: String,
    pub code: String,
}

impl From<&ProductEventRecord> for ProductEventView {
    fn from(record: &ProductEventRecord) -> Self {
        let event_type = record
            .sk
            .split_once('#')
            .map_or(record.sk.as_str(), |(kind, _)| kind)
            .to_string();
        let code = record
            .pk
            .strip_prefix(PRODUCT_PK_PREFIX)
            .unwrap_or(&record.pk)
            .to_string();

        Self {
            created_at: record.created_at,
            event_type,
            username: record.username.clone(),
            product_id: record.product_id,
            request_id: record.request_id.clone(),
            code,
        }
    }
}
