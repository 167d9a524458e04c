//! Repository traits
//!
//! Define async repository interfaces for product, invoice and audit event
//! storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storefront_types::{Invoice, InvoiceEventRecord, Product, ProductEventRecord, ProductId};

use crate::error::DbResult;

/// Product repository trait
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// List every product
    async fn list(&self) -> DbResult<Vec<Product>>;

    /// Find a product by ID
    async fn find_by_id(&self, id: ProductId) -> DbResult<Option<Product>>;

    /// Create a new product; fails with `Conflict` if the ID is taken
    async fn create(&self, product: Product) -> DbResult<Product>;

    /// Replace an existing product; fails with `NotFound` if it is missing
    async fn update(&self, product: Product) -> DbResult<Product>;

    /// Delete a product and return what was stored
    async fn delete(&self, id: ProductId) -> DbResult<Product>;
}

/// Product event (audit) repository trait
///
/// Records are keyed by `(pk, sk)`; writing the same key twice keeps the
/// latest record. Reads never return records whose TTL has passed.
#[async_trait]
pub trait ProductEventRepository: Send + Sync {
    /// Store an audit record
    async fn put(&self, record: ProductEventRecord) -> DbResult<()>;

    /// All events for a product code, in sort-key order
    async fn query_by_code(&self, code: &str) -> DbResult<Vec<ProductEventRecord>>;

    /// Events for a product code whose sort key starts with `sk_prefix`
    async fn query_by_code_and_sk_prefix(
        &self,
        code: &str,
        sk_prefix: &str,
    ) -> DbResult<Vec<ProductEventRecord>>;

    /// Product events recorded for `username`, oldest first
    async fn find_by_username(&self, username: &str) -> DbResult<Vec<ProductEventRecord>>;

    /// Remove records whose TTL has passed at `now`; returns how many went.
    ///
    /// Stores that expire rows on their own keep the default.
    async fn purge_expired(&self, _now: DateTime<Utc>) -> DbResult<usize> {
        Ok(0)
    }
}

/// Invoice repository trait
///
/// Invoices are keyed by `(customer_name, invoice_number)`; importing the same
/// pair again replaces the stored invoice.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Store an invoice
    async fn put(&self, invoice: Invoice) -> DbResult<()>;

    /// Find one invoice of a customer
    async fn find(&self, customer_name: &str, invoice_number: &str) -> DbResult<Option<Invoice>>;

    /// A customer's invoices, ordered by invoice number
    async fn list_by_customer(&self, customer_name: &str) -> DbResult<Vec<Invoice>>;
}

/// Invoice event (audit) repository trait
#[async_trait]
pub trait InvoiceEventRepository: Send + Sync {
    /// Store an audit record
    async fn put(&self, record: InvoiceEventRecord) -> DbResult<()>;

    /// Live invoice events for a customer, in sort-key order
    async fn query_by_customer(&self, customer_name: &str) -> DbResult<Vec<InvoiceEventRecord>>;

    /// Remove records whose TTL has passed at `now`; returns how many went
    async fn purge_expired(&self, _now: DateTime<Utc>) -> DbResult<usize> {
        Ok(0)
    }
}
