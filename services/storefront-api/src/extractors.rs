//! Axum extractors for authentication

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use storefront_auth_core::{Principal, RejectionReason};
use storefront_utils::retry::{with_retry, RetryConfig};

use crate::error::ApiError;
use crate::state::AppState;

/// Scope granting full product access
pub const SCOPE_PRODUCTS_ALL: &str = "products/*";
/// Scope granting read-only product access
pub const SCOPE_PRODUCTS_READ: &str = "products/read";

/// Authenticated caller extracted from a verified access token
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl AuthUser {
    pub fn username(&self) -> &str {
        &self.0.username
    }

    /// Require a scope that allows reading products
    pub fn require_read(&self) -> Result<(), ApiError> {
        if self
            .0
            .has_any_scope(&[SCOPE_PRODUCTS_READ, SCOPE_PRODUCTS_ALL])
        {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "requires {SCOPE_PRODUCTS_READ} or {SCOPE_PRODUCTS_ALL}"
            )))
        }
    }

    /// Require a scope that allows changing products
    pub fn require_write(&self) -> Result<(), ApiError> {
        if self.0.has_scope(SCOPE_PRODUCTS_ALL) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("requires {SCOPE_PRODUCTS_ALL}")))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let Some(token) = bearer_token(parts) else {
            tracing::debug!("Request without bearer token");
            return Err(ApiError::Unauthorized);
        };

        let verifier = &app_state.verifier;
        let principal = with_retry(RetryConfig::default(), || verifier.verify(token))
            .await
            .map_err(|reason: RejectionReason| {
                // The caller only ever sees a uniform 401
                tracing::debug!(reason = reason.code(), "Token rejected");
                ApiError::Unauthorized
            })?;

        Ok(AuthUser(principal))
    }
}

/// Request id from `x-request-id`, or a fresh UUID
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(RequestId(id))
    }
}

/// Token from `Authorization: Bearer <token>`
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
