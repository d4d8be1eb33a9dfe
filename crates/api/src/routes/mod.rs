//! API route definitions.

use axum::{Router, middleware};
use storeledger_core::UnitOfWork;

use crate::{AppState, middleware::auth::auth_middleware};

pub mod card_invoices;
pub mod ecommerce_orders;
pub mod health;
pub mod ledger_entries;
pub mod manual_costs;
pub mod purchase_orders;
pub mod service_orders;

/// Creates the API router; everything but the health check requires a token.
pub fn api_routes_with_state<U>(state: &AppState<U>) -> Router<AppState<U>>
where
    U: UnitOfWork + 'static,
{
    let protected_routes = Router::new()
        .merge(purchase_orders::routes())
        .merge(service_orders::routes())
        .merge(ecommerce_orders::routes())
        .merge(manual_costs::routes())
        .merge(ledger_entries::routes())
        .merge(card_invoices::routes())
        .layer(middleware::from_fn_with_state(
            state.jwt_service.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}

/// Body of a status change request.
#[derive(Debug, serde::Deserialize)]
pub struct TransitionBody {
    /// Target status name.
    pub status: String,
}
