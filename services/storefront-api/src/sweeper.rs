//! Periodic removal of expired audit records and abandoned upload slots

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use storefront_db::Repositories;
use tokio::task::JoinHandle;

use crate::uploads::InvoiceObjectStore;

/// Spawn a task that sweeps every `every` until aborted
pub fn spawn_expiry_sweeper(
    repos: Repositories,
    uploads: Arc<dyn InvoiceObjectStore>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            sweep(&repos, uploads.as_ref(), Utc::now()).await;
        }
    })
}

/// One sweep at `now`; returns how many entries went
pub async fn sweep(repos: &Repositories, uploads: &dyn InvoiceObjectStore, now: DateTime<Utc>) -> usize {
    let mut removed = 0;

    match repos.product_events.purge_expired(now).await {
        Ok(n) => removed += n,
        Err(e) => tracing::warn!(error = %e, "Failed to purge product events"),
    }
    match repos.invoice_events.purge_expired(now).await {
        Ok(n) => removed += n,
        Err(e) => tracing::warn!(error = %e, "Failed to purge invoice events"),
    }
    removed += uploads.purge_expired(now).await;

    if removed > 0 {
        metrics::counter!("storefront_expired_entries_purged_total").increment(u64::try_from(removed).unwrap_or(u64::MAX));
        tracing::info!(removed, "Expired entries purged");
    }
    removed
}
