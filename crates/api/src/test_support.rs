//! Router harness over the in-memory store.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::AUTHORIZATION},
};
use http_body_util::BodyExt;
use serde_json::Value;
use storeledger_core::memory::{MemoryUnitOfWork, fixtures};
use storeledger_core::{FinancialEngine, ReferenceCalendar};
use storeledger_shared::types::TenantId;
use storeledger_shared::{JwtConfig, JwtService};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{AppState, create_router};

pub(crate) struct TestApp {
    pub router: Router,
    pub uow: MemoryUnitOfWork,
    pub tenant: TenantId,
    pub token: String,
    pub directory: fixtures::Directory,
    jwt_service: Arc<JwtService>,
}

impl TestApp {
    /// Token for another tenant of the same deployment.
    pub fn token_for(&self, tenant: TenantId) -> String {
        self.jwt_service
            .generate_access_token(Uuid::new_v4(), tenant, "admin")
            .expect("should generate token")
    }

    /// Sends a request with this app's token.
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(&self.router, method, uri, Some(&self.token), body).await
    }
}

pub(crate) async fn test_app() -> TestApp {
    let uow = MemoryUnitOfWork::new();
    let tenant = TenantId::new();
    let directory = fixtures::directory(&uow, tenant).await;
    let jwt_service = Arc::new(JwtService::new(JwtConfig::default()));
    let token = jwt_service
        .generate_access_token(Uuid::new_v4(), tenant, "admin")
        .expect("should generate token");

    let state = AppState {
        engine: Arc::new(FinancialEngine::new(uow.clone(), ReferenceCalendar::default())),
        jwt_service: Arc::clone(&jwt_service),
    };

    TestApp {
        router: create_router(state),
        uow,
        tenant,
        token,
        directory,
        jwt_service,
    }
}

pub(crate) async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}
