//! Current user handler

use axum::Json;
use storefront_auth_core::Principal;

use crate::extractors::AuthUser;

/// GET /api/v1/users/me
pub async fn me(AuthUser(principal): AuthUser) -> Json<Principal> {
    Json(principal)
}
