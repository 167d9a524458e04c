//! Storefront API
//!
//! Product catalogue service behind Cognito access tokens.
//!
//! ## REST Endpoints
//!
//! - `GET /api/v1/users/me` - Current principal
//! - `GET /api/v1/products` - List products
//! - `POST /api/v1/products` - Create product
//! - `GET /api/v1/products/{id}` - Get product
//! - `PUT /api/v1/products/{id}` - Update product
//! - `DELETE /api/v1/products/{id}` - Delete product
//! - `GET /api/v1/products/events?username=` - Product events by user
//! - `GET /api/v1/products/events/{code}` - Product events by code
//! - `GET /api/v1/products/events/{code}/{event}` - Product events by code and type
//! - `POST /api/v1/invoices` - Open an invoice upload slot
//! - `PUT /api/v1/invoices/uploads/{key}` - Upload an invoice document
//! - `POST /api/v1/invoices/uploads/{key}/import` - Import an uploaded invoice
//! - `GET /api/v1/invoices/customers/{customer}` - Invoices of a customer
//! - `GET /api/v1/invoices/events/{customer}` - Invoice events of a customer
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

mod config;
mod error;
mod events;
mod extractors;
mod handlers;
mod router;
mod state;
mod sweeper;
mod uploads;


use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use storefront_auth_core::TokenVerifier;
use storefront_db::Repositories;
use storefront_utils::retry::RetryConfig;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::events::{spawn_audit_consumer, ChannelPublisher};
use crate::router::build_router;
use crate::state::AppState;
use crate::sweeper::spawn_expiry_sweeper;
use crate::uploads::InMemoryObjectStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("storefront_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Storefront API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        issuer = %config.auth.cognito_issuer(),
        jwks_url = %config.auth.jwks_url(),
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    let verifier = TokenVerifier::new(config.auth.clone());

    // Warm the key-set cache; a failure here is retried lazily on first request
    match verifier.prefetch().await {
        Ok(keys) => tracing::info!(keys, "Signing keys loaded"),
        Err(reason) => tracing::warn!(reason = reason.code(), "Signing keys not loaded at startup"),
    }

    let repos = Repositories::in_memory();

    // Product event queue and its audit consumer
    let (publisher, rx) = ChannelPublisher::new(config.event_queue_capacity);
    let consumer = spawn_audit_consumer(rx, repos.product_events.clone(), RetryConfig::default());

    let uploads = Arc::new(InMemoryObjectStore::new());
    let sweeper = spawn_expiry_sweeper(repos.clone(), uploads.clone(), config.expiry_sweep_interval);

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(verifier, repos, Arc::new(publisher), uploads, config);
    let app = build_router(state, metrics_handle);

    if let Err(e) = run_http_server(app, http_addr).await {
        tracing::error!(error = ?e, "HTTP server error");
    }

    sweeper.abort();

    // The router owned the last publisher; let the consumer drain what is queued
    if let Err(e) = consumer.await {
        tracing::error!(error = ?e, "Audit consumer failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let service: IntoMakeServiceWithConnectInfo<Router, SocketAddr> =
        app.into_make_service_with_connect_info();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Register metrics with descriptions
    metrics::describe_counter!(
        "storefront_token_verifications_total",
        "Access token verifications by outcome"
    );
    metrics::describe_counter!(
        "storefront_jwks_fetches_total",
        "Signing key set fetches by status"
    );
    metrics::describe_counter!(
        "storefront_product_events_total",
        "Product events by type and audit status"
    );
    metrics::describe_counter!(
        "storefront_invoices_imported_total",
        "Invoices imported from uploaded documents"
    );
    metrics::describe_counter!(
        "storefront_expired_entries_purged_total",
        "Expired audit records and upload slots removed"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
