//! E-commerce order routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};
use storeledger_core::UnitOfWork;
use storeledger_core::documents::{DocumentRef, EcommerceDraft, TransitionRequest};
use storeledger_shared::types::EcommerceOrderId;
use uuid::Uuid;

use super::TransitionBody;
use crate::{ApiError, AppState, middleware::AuthUser};

/// Creates the e-commerce order routes.
pub fn routes<U>() -> Router<AppState<U>>
where
    U: UnitOfWork + 'static,
{
    Router::new()
        .route("/ecommerce-orders", post(create_ecommerce_order::<U>))
        .route("/ecommerce-orders/{id}", delete(delete_ecommerce_order::<U>))
        .route(
            "/ecommerce-orders/{id}/transition",
            post(transition_ecommerce_order::<U>),
        )
}

async fn create_ecommerce_order<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Json(draft): Json<EcommerceDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .engine
        .create_ecommerce_order(auth.tenant_id(), draft)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// POST `/ecommerce-orders/{id}/transition` - Move between PENDING, SENT and DELIVERED.
async fn transition_ecommerce_order<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<TransitionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = TransitionRequest::parse(
        DocumentRef::Ecommerce(EcommerceOrderId::from_uuid(id)),
        &body.status,
    )?;
    let snapshot = state.engine.apply_transition(auth.tenant_id(), request).await?;
    Ok(Json(snapshot))
}

async fn delete_ecommerce_order<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .delete_document(
            auth.tenant_id(),
            DocumentRef::Ecommerce(EcommerceOrderId::from_uuid(id)),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use storeledger_core::documents::ItemKind;
    use storeledger_core::memory::fixtures;
    use storeledger_shared::types::StockItemId;

    use super::*;
    use crate::test_support::{TestApp, test_app};

    async fn place_order(app: &TestApp, product: StockItemId, service: StockItemId) -> String {
        let (status, order) = app
            .send(
                "POST",
                "/api/v1/ecommerce-orders",
                Some(json!({
                    "customer_name": "Ana",
                    "customer_phone": "(11) 98765-4321",
                    "lines": [
                        { "item_id": product, "description": "Cable", "kind": "product", "quantity": "2", "unit_price": "50" },
                        { "item_id": service, "description": "Installation", "kind": "service", "quantity": "1", "unit_price": "80" }
                    ],
                    "account_id": app.directory.account_id
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["status"], "PENDING");
        order["id"].as_str().unwrap().to_string()
    }

    async fn move_to(app: &TestApp, id: &str, to: &str) -> (StatusCode, Value) {
        app.send(
            "POST",
            &format!("/api/v1/ecommerce-orders/{id}/transition"),
            Some(json!({ "status": to })),
        )
        .await
    }

    #[tokio::test]
    async fn test_delivery_round_trip() {
        let app = test_app().await;
        let product = fixtures::stock_item(&app.uow, app.tenant, "Cable", ItemKind::Product, dec!(5), dec!(20))
            .await;
        let service = fixtures::stock_item(&app.uow, app.tenant, "Installation", ItemKind::Service, dec!(0), dec!(30))
            .await;
        let id = place_order(&app, product, service).await;

        assert_eq!(move_to(&app, &id, "SENT").await.0, StatusCode::OK);
        let (status, snapshot) = move_to(&app, &id, "DELIVERED").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["kind"], "ecommerce");
        assert_eq!(snapshot["document"]["status"], "DELIVERED");

        let book = app.uow.snapshot(app.tenant).await;
        assert_eq!(book.stock_items[&product].quantity, dec!(3));
        assert_eq!(book.sales.len(), 1);
        assert_eq!(book.service_orders.len(), 1);
        assert_eq!(book.ledger_entries.values().next().unwrap().amount, dec!(100));

        let (status, _) = app
            .send("DELETE", &format!("/api/v1/ecommerce-orders/{id}"), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let book = app.uow.snapshot(app.tenant).await;
        assert!(book.ecommerce_orders.is_empty());
        assert!(book.sales.is_empty());
        assert!(book.service_orders.is_empty());
        assert!(book.ledger_entries.is_empty());
        assert_eq!(book.stock_items[&product].quantity, dec!(5));
    }

    #[tokio::test]
    async fn test_undelivery_refused_after_generated_order_started() {
        let app = test_app().await;
        let product = fixtures::stock_item(&app.uow, app.tenant, "Cable", ItemKind::Product, dec!(5), dec!(20))
            .await;
        let service = fixtures::stock_item(&app.uow, app.tenant, "Installation", ItemKind::Service, dec!(0), dec!(30))
            .await;
        let id = place_order(&app, product, service).await;
        move_to(&app, &id, "SENT").await;
        move_to(&app, &id, "DELIVERED").await;

        let generated = *app
            .uow
            .snapshot(app.tenant)
            .await
            .service_orders
            .keys()
            .next()
            .unwrap();
        let (status, _) = app
            .send(
                "POST",
                &format!("/api/v1/service-orders/{generated}/transition"),
                Some(json!({ "status": "in_progress" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = move_to(&app, &id, "SENT").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "GENERATED_SERVICE_ORDER_ADVANCED");
        assert_eq!(app.uow.snapshot(app.tenant).await.sales.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_phone_is_rejected() {
        let app = test_app().await;
        let (status, body) = app
            .send(
                "POST",
                "/api/v1/ecommerce-orders",
                Some(json!({
                    "customer_name": "Ana",
                    "customer_phone": "--",
                    "lines": [
                        { "item_id": Uuid::new_v4(), "description": "Cable", "kind": "product", "quantity": "1", "unit_price": "50" }
                    ]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }
}
