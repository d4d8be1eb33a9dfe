//! Cash ledger routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{patch, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use storeledger_core::UnitOfWork;
use storeledger_core::ledger::manual::CashEntryPatch;
use storeledger_shared::types::LedgerEntryId;
use uuid::Uuid;

use crate::{ApiError, AppState, middleware::AuthUser};

/// Creates the cash ledger routes.
pub fn routes<U>() -> Router<AppState<U>>
where
    U: UnitOfWork + 'static,
{
    Router::new()
        .route(
            "/ledger-entries/{id}",
            patch(update_ledger_entry::<U>).delete(delete_ledger_entry::<U>),
        )
        .route("/ledger-entries/{id}/pay", post(pay_ledger_entry::<U>))
        .route(
            "/ledger-entries/{id}/installments/{index}/pay",
            post(pay_installment::<U>),
        )
}

/// Body of a settlement request.
#[derive(Debug, Default, Deserialize)]
pub struct PayRequest {
    /// Settlement time; now when absent.
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

/// PATCH `/ledger-entries/{id}` - Edit a plain cash entry.
///
/// Consolidated invoices and entries owned by a document are rejected.
async fn update_ledger_entry<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<CashEntryPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .engine
        .update_cash_entry(auth.tenant_id(), LedgerEntryId::from_uuid(id), patch)
        .await?;
    Ok(Json(entry))
}

async fn delete_ledger_entry<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .delete_cash_entry(auth.tenant_id(), LedgerEntryId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/ledger-entries/{id}/pay` - Settle an entry, invoices included.
async fn pay_ledger_entry<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PayRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .engine
        .mark_paid(auth.tenant_id(), LedgerEntryId::from_uuid(id), body.paid_at)
        .await?;
    Ok(Json(entry))
}

async fn pay_installment<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path((id, index)): Path<(Uuid, u32)>,
    Json(body): Json<PayRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .engine
        .mark_installment_paid(
            auth.tenant_id(),
            LedgerEntryId::from_uuid(id),
            index,
            body.paid_at,
        )
        .await?;
    Ok(Json(entry))
}
