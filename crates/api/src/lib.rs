//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes over the financial engine
//! - Authentication middleware binding each request to a tenant
//! - Engine error to JSON response mapping
//!
//! The router is generic over the engine's unit-of-work factory, so the same
//! routes run on PostgreSQL in the server and in memory in tests.

pub mod error;
pub mod middleware;
pub mod routes;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::Router;
use storeledger_core::{FinancialEngine, UnitOfWork};
use storeledger_shared::JwtService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
pub struct AppState<U> {
    /// The financial engine.
    pub engine: Arc<FinancialEngine<U>>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
}

impl<U> Clone for AppState<U> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            jwt_service: Arc::clone(&self.jwt_service),
        }
    }
}

/// Creates the main application router.
pub fn create_router<U>(state: AppState<U>) -> Router
where
    U: UnitOfWork + 'static,
{
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(&state))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
