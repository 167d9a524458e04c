//! Application state

use std::sync::Arc;

use storefront_auth_core::TokenVerifier;
use storefront_db::Repositories;

use crate::config::Config;
use crate::events::ProductEventPublisher;
use crate::uploads::InvoiceObjectStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Access token verifier with its key-set cache
    pub verifier: TokenVerifier,
    /// Storage repositories
    pub repos: Repositories,
    /// Product event queue
    pub events: Arc<dyn ProductEventPublisher>,
    /// Uploaded invoice documents
    pub uploads: Arc<dyn InvoiceObjectStore>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        verifier: TokenVerifier,
        repos: Repositories,
        events: Arc<dyn ProductEventPublisher>,
        uploads: Arc<dyn InvoiceObjectStore>,
        config: Config,
    ) -> Self {
        Self {
            verifier,
            repos,
            events,
            uploads,
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("issuer", &self.verifier.issuer())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
