//! Product CRUD handlers
//!
//! Every successful mutation is persisted first and then published as a
//! product event. Publishing failures are logged; the change already happened.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use storefront_db::DbError;
use storefront_types::{Product, ProductEvent, ProductEventType, ProductId, ProductInput};

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AuthUser, RequestId};
use crate::state::AppState;

/// GET /api/v1/products
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Product>>> {
    user.require_read()?;
    let products = state.repos.products.list().await?;
    Ok(Json(products))
}

/// GET /api/v1/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    user.require_read()?;
    let product_id = parse_id(&id)?;

    let product = state
        .repos
        .products
        .find_by_id(product_id)
        .await?
        .ok_or(ApiError::ProductNotFound(id))?;

    Ok(Json(product))
}

/// POST /api/v1/products
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    RequestId(request_id): RequestId,
    Json(input): Json<ProductInput>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    user.require_write()?;
    input.validate()?;

    let product = state
        .repos
        .products
        .create(Product::from_input(ProductId::new(), input))
        .await?;

    tracing::info!(product_id = %product.id, code = %product.code, user = %user.username(), "Product created");
    publish(&state, ProductEventType::ProductCreated, &product, &user, request_id).await;

    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/v1/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> ApiResult<Json<Product>> {
    user.require_write()?;
    let product_id = parse_id(&id)?;
    input.validate()?;

    let product = state
        .repos
        .products
        .update(Product::from_input(product_id, input))
        .await
        .map_err(|e| not_found_as(e, &id))?;

    tracing::info!(product_id = %product.id, code = %product.code, user = %user.username(), "Product updated");
    publish(&state, ProductEventType::ProductUpdated, &product, &user, request_id).await;

    Ok(Json(product))
}

/// DELETE /api/v1/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    user.require_write()?;
    let product_id = parse_id(&id)?;

    let product = state
        .repos
        .products
        .delete(product_id)
        .await
        .map_err(|e| not_found_as(e, &id))?;

    tracing::info!(product_id = %product.id, code = %product.code, user = %user.username(), "Product deleted");
    publish(&state, ProductEventType::ProductDeleted, &product, &user, request_id).await;

    Ok(Json(product))
}

/// An id that is not a UUID cannot name a stored product
fn parse_id(id: &str) -> ApiResult<ProductId> {
    ProductId::parse(id).map_err(|_| ApiError::ProductNotFound(id.to_string()))
}

fn not_found_as(err: DbError, id: &str) -> ApiError {
    match err {
        DbError::NotFound => ApiError::ProductNotFound(id.to_string()),
        other => ApiError::Database(other),
    }
}

async fn publish(
    state: &AppState,
    event_type: ProductEventType,
    product: &Product,
    user: &AuthUser,
    request_id: String,
) {
    let event = ProductEvent {
        request_id,
        event_type,
        product_id: product.id,
        product_code: product.code.clone(),
        username: user.username().to_string(),
    };

    match state.events.publish(event).await {
        Ok(message_id) => {
            tracing::debug!(%message_id, event_type = event_type.as_str(), "Product event published");
        }
        Err(e) => {
            tracing::error!(error = %e, event_type = event_type.as_str(), product_id = %product.id, "Failed to publish product event");
        }
    }
}
