//! In-memory repository implementations
//!
//! Backed by `DashMap`. Partitions keep their rows in a `BTreeMap` so range
//! reads come back in sort-key order, like a key-value store query.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use storefront_types::{
    invoice_partition_key, product_partition_key, Invoice, InvoiceEventRecord, Product,
    ProductEventRecord, ProductId, PRODUCT_PK_PREFIX,
};

use crate::error::{DbError, DbResult};
use crate::repo::{
    InvoiceEventRepository, InvoiceRepository, ProductEventRepository, ProductRepository,
};

/// In-memory product repository
#[derive(Clone, Default)]
pub struct InMemoryProductRepository {
    products: Arc<DashMap<ProductId, Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn list(&self) -> DbResult<Vec<Product>> {
        let mut products: Vec<Product> = self.products.iter().map(|p| p.value().clone()).collect();
        products.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(products)
    }

    async fn find_by_id(&self, id: ProductId) -> DbResult<Option<Product>> {
        Ok(self.products.get(&id).map(|p| p.value().clone()))
    }

    async fn create(&self, product: Product) -> DbResult<Product> {
        match self.products.entry(product.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(DbError::Conflict(product.id.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(product.clone());
                Ok(product)
            }
        }
    }

    async fn update(&self, product: Product) -> DbResult<Product> {
        let mut stored = self.products.get_mut(&product.id).ok_or(DbError::NotFound)?;
        *stored = product.clone();
        Ok(product)
    }

    async fn delete(&self, id: ProductId) -> DbResult<Product> {
        self.products
            .remove(&id)
            .map(|(_, product)| product)
            .ok_or(DbError::NotFound)
    }
}

/// In-memory product event repository
///
/// Maps `pk -> (sk -> record)`.
#[derive(Clone, Default)]
pub struct InMemoryProductEventRepository {
    partitions: Arc<DashMap<String, BTreeMap<String, ProductEventRecord>>>,
}

impl InMemoryProductEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_in_partition(
        &self,
        pk: &str,
        mut keep: impl FnMut(&str) -> bool,
    ) -> Vec<ProductEventRecord> {
        let now = Utc::now();
        self.partitions
            .get(pk)
            .map(|partition| {
                partition
                    .iter()
                    .filter(|(sk, record)| keep(sk.as_str()) && !record.is_expired_at(now))
                    .map(|(_, record)| record.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProductEventRepository for InMemoryProductEventRepository {
    async fn put(&self, record: ProductEventRecord) -> DbResult<()> {
        self.partitions
            .entry(record.pk.clone())
            .or_default()
            .insert(record.sk.clone(), record);
        Ok(())
    }

    async fn query_by_code(&self, code: &str) -> DbResult<Vec<ProductEventRecord>> {
        Ok(self.live_in_partition(&product_partition_key(code), |_| true))
    }

    async fn query_by_code_and_sk_prefix(
        &self,
        code: &str,
        sk_prefix: &str,
    ) -> DbResult<Vec<ProductEventRecord>> {
        Ok(self.live_in_partition(&product_partition_key(code), |sk| {
            sk.starts_with(sk_prefix)
        }))
    }

    async fn find_by_username(&self, username: &str) -> DbResult<Vec<ProductEventRecord>> {
        let now = Utc::now();
        let mut records: Vec<ProductEventRecord> = self
            .partitions
            .iter()
            .filter(|partition| partition.key().starts_with(PRODUCT_PK_PREFIX))
            .flat_map(|partition| {
                partition
                    .values()
                    .filter(|record| record.username == username && !record.is_expired_at(now))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();

        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.pk.cmp(&b.pk)));
        Ok(records)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<usize> {
        let mut purged = 0;
        for mut partition in self.partitions.iter_mut() {
            let before = partition.len();
            partition.retain(|_, record| !record.is_expired_at(now));
            purged += before - partition.len();
        }
        self.partitions.retain(|_, partition| !partition.is_empty());

        if purged > 0 {
            tracing::debug!(purged, "Purged expired product events");
        }
        Ok(purged)
    }
}

/// In-memory invoice repository
///
/// Maps `customer_name -> (invoice_number -> invoice)`.
#[derive(Clone, Default)]
pub struct InMemoryInvoiceRepository {
    customers: Arc<DashMap<String, BTreeMap<String, Invoice>>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn put(&self, invoice: Invoice) -> DbResult<()> {
        self.customers
            .entry(invoice.customer_name.clone())
            .or_default()
            .insert(invoice.invoice_number.clone(), invoice);
        Ok(())
    }

    async fn find(&self, customer_name: &str, invoice_number: &str) -> DbResult<Option<Invoice>> {
        Ok(self
            .customers
            .get(customer_name)
            .and_then(|invoices| invoices.get(invoice_number).cloned()))
    }

    async fn list_by_customer(&self, customer_name: &str) -> DbResult<Vec<Invoice>> {
        Ok(self
            .customers
            .get(customer_name)
            .map(|invoices| invoices.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// In-memory invoice event repository
///
/// Maps `pk -> (sk -> record)`.
#[derive(Clone, Default)]
pub struct InMemoryInvoiceEventRepository {
    partitions: Arc<DashMap<String, BTreeMap<String, InvoiceEventRecord>>>,
}

impl InMemoryInvoiceEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceEventRepository for InMemoryInvoiceEventRepository {
    async fn put(&self, record: InvoiceEventRecord) -> DbResult<()> {
        self.partitions
            .entry(record.pk.clone())
            .or_default()
            .insert(record.sk.clone(), record);
        Ok(())
    }

    async fn query_by_customer(&self, customer_name: &str) -> DbResult<Vec<InvoiceEventRecord>> {
        let now = Utc::now();
        Ok(self
            .partitions
            .get(&invoice_partition_key(customer_name))
            .map(|partition| {
                partition
                    .values()
                    .filter(|record| !record.is_expired_at(now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<usize> {
        let mut purged = 0;
        for mut partition in self.partitions.iter_mut() {
            let before = partition.len();
            partition.retain(|_, record| !record.is_expired_at(now));
            purged += before - partition.len();
        }
        self.partitions.retain(|_, partition| !partition.is_empty());

        if purged > 0 {
            tracing::debug!(purged, "Purged expired invoice events");
        }
        Ok(purged)
    }
}
