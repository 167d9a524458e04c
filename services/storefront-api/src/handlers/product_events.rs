//! Product event (audit) queries

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use storefront_types::{ProductEventRecord, ProductEventView};

use crate::error::{ApiError, ApiResult};
use crate::extractors::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub username: Option<String>,
}

/// GET /api/v1/products/events?username=
pub async fn events_by_username(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Json<Vec<ProductEventView>>> {
    user.require_read()?;
    let username = query
        .username
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("username query parameter is required".to_string()))?;

    let records = state.repos.product_events.find_by_username(&username).await?;
    Ok(Json(views(&records)))
}

/// GET /api/v1/products/events/{code}
pub async fn events_by_code(
    State(state): State<AppState>,
    user: AuthUser,
    Path(code): Path<String>,
) -> ApiResult<Json<Vec<ProductEventView>>> {
    user.require_read()?;
    let records = state.repos.product_events.query_by_code(&code).await?;
    Ok(Json(views(&records)))
}

/// GET /api/v1/products/events/{code}/{event}
pub async fn events_by_code_and_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path((code, event)): Path<(String, String)>,
) -> ApiResult<Json<Vec<ProductEventView>>> {
    user.require_read()?;
    let records = state
        .repos
        .product_events
        .query_by_code_and_sk_prefix(&code, &event)
        .await?;
    Ok(Json(views(&records)))
}

fn views(records: &[ProductEventRecord]) -> Vec<ProductEventView> {
    records.iter().map(ProductEventView::from).collect()
}
