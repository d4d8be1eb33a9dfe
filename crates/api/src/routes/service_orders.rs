//! Service order routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};
use storeledger_core::UnitOfWork;
use storeledger_core::documents::{DocumentRef, ServiceOrderDraft, TransitionRequest};
use storeledger_shared::types::ServiceOrderId;
use uuid::Uuid;

use super::TransitionBody;
use crate::{ApiError, AppState, middleware::AuthUser};

/// Creates the service order routes.
pub fn routes<U>() -> Router<AppState<U>>
where
    U: UnitOfWork + 'static,
{
    Router::new()
        .route("/service-orders", post(create_service_order::<U>))
        .route("/service-orders/{id}", delete(delete_service_order::<U>))
        .route(
            "/service-orders/{id}/transition",
            post(transition_service_order::<U>),
        )
}

async fn create_service_order<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Json(draft): Json<ServiceOrderDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .engine
        .create_service_order(auth.tenant_id(), draft)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn transition_service_order<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<TransitionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = TransitionRequest::parse(
        DocumentRef::ServiceOrder(ServiceOrderId::from_uuid(id)),
        &body.status,
    )?;
    let snapshot = state.engine.apply_transition(auth.tenant_id(), request).await?;
    Ok(Json(snapshot))
}

async fn delete_service_order<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .delete_document(
            auth.tenant_id(),
            DocumentRef::ServiceOrder(ServiceOrderId::from_uuid(id)),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
