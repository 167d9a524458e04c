//! Upload slots for invoice documents
//!
//! A client first asks for a slot, then PUTs the document under the slot's
//! key before it expires. Importing takes the document out of the store.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Upload store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// No open slot under this key (never issued, expired or already imported)
    #[error("no upload slot for key {0}")]
    NoSuchSlot(String),

    /// The slot is open but nothing was uploaded yet
    #[error("nothing uploaded under key {0}")]
    Empty(String),
}

/// Object storage for uploaded invoice documents
#[async_trait]
pub trait InvoiceObjectStore: Send + Sync {
    /// Open a slot under `key` that accepts uploads until `expires_at`
    async fn open_slot(&self, key: &str, expires_at: DateTime<Utc>);

    /// Store `body` under an open slot, replacing any earlier upload
    async fn put(&self, key: &str, body: Bytes, now: DateTime<Utc>) -> Result<(), UploadError>;

    /// The uploaded document under `key`
    async fn get(&self, key: &str) -> Result<Bytes, UploadError>;

    /// Remove the slot and its document
    async fn delete(&self, key: &str);

    /// Drop slots that expired before anything was uploaded; returns how many went
    async fn purge_expired(&self, now: DateTime<Utc>) -> usize;
}

#[derive(Debug, Clone)]
struct Slot {
    expires_at: DateTime<Utc>,
    body: Option<Bytes>,
}

/// In-memory upload store
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    slots: Arc<DashMap<String, Slot>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceObjectStore for InMemoryObjectStore {
    async fn open_slot(&self, key: &str, expires_at: DateTime<Utc>) {
        self.slots.insert(
            key.to_string(),
            Slot {
                expires_at,
                body: None,
            },
        );
    }

    async fn put(&self, key: &str, body: Bytes, now: DateTime<Utc>) -> Result<(), UploadError> {
        let mut slot = self
            .slots
            .get_mut(key)
            .filter(|slot| now < slot.expires_at)
            .ok_or_else(|| UploadError::NoSuchSlot(key.to_string()))?;
        slot.body = Some(body);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, UploadError> {
        let slot = self
            .slots
            .get(key)
            .ok_or_else(|| UploadError::NoSuchSlot(key.to_string()))?;
        slot.body
            .clone()
            .ok_or_else(|| UploadError::Empty(key.to_string()))
    }

    async fn delete(&self, key: &str) {
        self.slots.remove(key);
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.slots.len();
        // Uploaded documents stay until imported
        self.slots
            .retain(|_, slot| slot.body.is_some() || now < slot.expires_at);
        before - self.slots.len()
    }
}
