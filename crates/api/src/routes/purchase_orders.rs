//! Purchase order routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
};
use storeledger_core::UnitOfWork;
use storeledger_core::documents::{DocumentRef, PurchaseDraft, TransitionRequest};
use storeledger_shared::types::PurchaseOrderId;
use uuid::Uuid;

use super::TransitionBody;
use crate::{ApiError, AppState, middleware::AuthUser};

/// Creates the purchase order routes (requires auth middleware to be applied externally).
pub fn routes<U>() -> Router<AppState<U>>
where
    U: UnitOfWork + 'static,
{
    Router::new()
        .route("/purchase-orders", post(create_purchase_order::<U>))
        .route(
            "/purchase-orders/{id}",
            put(update_purchase_order::<U>).delete(delete_purchase_order::<U>),
        )
        .route(
            "/purchase-orders/{id}/transition",
            post(transition_purchase_order::<U>),
        )
}

/// POST `/purchase-orders` - Create a pending purchase order.
async fn create_purchase_order<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Json(draft): Json<PurchaseDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state.engine.create_purchase(auth.tenant_id(), draft).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// PUT `/purchase-orders/{id}` - Replace lines and terms.
///
/// A completed order has its stock and ledger effects re-derived.
async fn update_purchase_order<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(draft): Json<PurchaseDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .engine
        .update_purchase(auth.tenant_id(), PurchaseOrderId::from_uuid(id), draft)
        .await?;
    Ok(Json(order))
}

/// POST `/purchase-orders/{id}/transition` - Change the status.
async fn transition_purchase_order<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<TransitionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = TransitionRequest::parse(
        DocumentRef::Purchase(PurchaseOrderId::from_uuid(id)),
        &body.status,
    )?;
    let snapshot = state.engine.apply_transition(auth.tenant_id(), request).await?;
    Ok(Json(snapshot))
}

/// DELETE `/purchase-orders/{id}` - Reverse effects and delete.
async fn delete_purchase_order<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .delete_document(
            auth.tenant_id(),
            DocumentRef::Purchase(PurchaseOrderId::from_uuid(id)),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
