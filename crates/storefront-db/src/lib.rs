//! Storefront DB - storage abstractions
//!
//! Repository traits for products, invoices and their audit events, with
//! in-memory implementations used by the service and its tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_db::Repositories;
//!
//! let repos = Repositories::in_memory();
//! let products = repos.products.list().await?;
//! ```

pub mod error;
pub mod memory;
pub mod repo;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use memory::{
    InMemoryInvoiceEventRepository, InMemoryInvoiceRepository, InMemoryProductEventRepository,
    InMemoryProductRepository,
};
pub use repo::*;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub products: Arc<dyn ProductRepository>,
    pub product_events: Arc<dyn ProductEventRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub invoice_events: Arc<dyn InvoiceEventRepository>,
}

impl Repositories {
    /// Bundle the given repository implementations
    pub fn new(
        products: Arc<dyn ProductRepository>,
        product_events: Arc<dyn ProductEventRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        invoice_events: Arc<dyn InvoiceEventRepository>,
    ) -> Self {
        Self {
            products,
            product_events,
            invoices,
            invoice_events,
        }
    }

    /// Create empty in-memory repositories
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryProductRepository::new()),
            Arc::new(InMemoryProductEventRepository::new()),
            Arc::new(InMemoryInvoiceRepository::new()),
            Arc::new(InMemoryInvoiceEventRepository::new()),
        )
    }
}
