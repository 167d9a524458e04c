//! Invoice upload and import handlers
//!
//! Import reads the uploaded document, stores the invoice and its audit
//! record, then removes the document. A document that does not parse stays
//! in place so the client can upload a corrected one under the same key.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use storefront_types::{
    Invoice, InvoiceEventRecord, InvoiceFile, UploadSlot, INVOICE_UPLOAD_TTL_SECS,
};
use storefront_utils::retry::{with_retry, RetryConfig};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/v1/invoices - open an upload slot
pub async fn create_upload_slot(
    State(state): State<AppState>,
    user: AuthUser,
) -> Json<UploadSlot> {
    let key = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::seconds(INVOICE_UPLOAD_TTL_SECS);
    state.uploads.open_slot(&key, expires_at).await;

    tracing::info!(%key, user = %user.username(), "Invoice upload slot opened");
    Json(UploadSlot {
        url: format!("/api/v1/invoices/uploads/{key}"),
        key,
        expires: INVOICE_UPLOAD_TTL_SECS,
    })
}

/// PUT /api/v1/invoices/uploads/{key}
pub async fn upload_invoice(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(key): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let size = body.len();
    state.uploads.put(&key, body, Utc::now()).await?;
    tracing::debug!(%key, size, "Invoice document uploaded");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/invoices/uploads/{key}/import
pub async fn import_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(key): Path<String>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let document = state.uploads.get(&key).await?;
    let file = InvoiceFile::from_slice(&document)?;
    let invoice = Invoice::from_file(file, &key);

    let invoices = state.repos.invoices.as_ref();
    with_retry(RetryConfig::default(), || invoices.put(invoice.clone())).await?;

    let record = InvoiceEventRecord::from_invoice(&invoice, Utc::now());
    let invoice_events = state.repos.invoice_events.as_ref();
    with_retry(RetryConfig::default(), || invoice_events.put(record.clone())).await?;

    state.uploads.delete(&key).await;

    metrics::counter!("storefront_invoices_imported_total").increment(1);
    tracing::info!(
        %key,
        customer = %invoice.customer_name,
        invoice_number = %invoice.invoice_number,
        user = %user.username(),
        "Invoice imported"
    );

    Ok((StatusCode::CREATED, Json(invoice)))
}

/// GET /api/v1/invoices/customers/{customer}
pub async fn invoices_by_customer(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(customer): Path<String>,
) -> ApiResult<Json<Vec<Invoice>>> {
    let invoices = state.repos.invoices.list_by_customer(&customer).await?;
    Ok(Json(invoices))
}

/// GET /api/v1/invoices/events/{customer}
pub async fn invoice_events_by_customer(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(customer): Path<String>,
) -> ApiResult<Json<Vec<InvoiceEventRecord>>> {
    let records = state.repos.invoice_events.query_by_customer(&customer).await?;
    Ok(Json(records))
}
