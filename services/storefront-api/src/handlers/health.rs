//! Health check handlers

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub checks: ReadyChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadyChecks {
    pub signing_keys: CheckResult,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    pub latency_ms: u64,
    pub keys: usize,
}

/// GET /health - Liveness probe (fast, no dependencies)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "storefront-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /ready - Readiness probe (loads the signing keys)
pub async fn ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, StatusCode> {
    let start = Instant::now();
    let result = state.verifier.prefetch().await;
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(keys) => Ok(Json(ReadyResponse {
            status: "ready",
            service: "storefront-api",
            checks: ReadyChecks {
                signing_keys: CheckResult {
                    status: "ok",
                    latency_ms,
                    keys,
                },
            },
        })),
        Err(reason) => {
            tracing::warn!(reason = reason.code(), latency_ms, "Signing keys unavailable");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
