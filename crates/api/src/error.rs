//! Mapping of engine failures onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use storeledger_core::{EngineError, ErrorKind};
use storeledger_shared::AppError;
use tracing::{error, warn};

/// An error rendered as `{ "error": <code>, "message": <text> }`.
#[derive(Debug)]
pub struct ApiError {
    error: AppError,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// The application error this response carries.
    #[must_use]
    pub fn app_error(&self) -> &AppError {
        &self.error
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        let message = error.to_string();
        Self {
            code: error.error_code(),
            error,
            message,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        let error = match err.kind() {
            ErrorKind::Validation => AppError::Validation(message.clone()),
            ErrorKind::NotFound => AppError::NotFound(message.clone()),
            ErrorKind::Conflict => AppError::Conflict(message.clone()),
            ErrorKind::Consistency => AppError::Forbidden(message.clone()),
            ErrorKind::Dependency => AppError::Database(message.clone()),
        };
        Self {
            error,
            code: err.error_code(),
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(code = self.code, error = %self.message, "Request failed");
        } else {
            warn!(code = self.code, error = %self.message, "Request rejected");
        }

        (
            status,
            Json(json!({
                "error": self.code,
                "message": self.message
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use storeledger_core::StoreError;
    use storeledger_shared::types::{LedgerEntryId, StockItemId};

    #[rstest]
    #[case(EngineError::Validation("bad".into()), 400, "VALIDATION_ERROR")]
    #[case(EngineError::StockItemNotFound(StockItemId::new()), 404, "STOCK_ITEM_NOT_FOUND")]
    #[case(EngineError::ConsolidatedInvoiceReadOnly(LedgerEntryId::new()), 403, "CONSOLIDATED_INVOICE_READ_ONLY")]
    #[case(EngineError::Storage(StoreError::Serialization("40001".into())), 503, "STORAGE_ERROR")]
    fn test_engine_errors_keep_status_and_code(
        #[case] err: EngineError,
        #[case] status: u16,
        #[case] code: &str,
    ) {
        let expected_status = err.http_status_code();
        let api = ApiError::from(err);
        assert_eq!(api.app_error().status_code(), status);
        assert_eq!(api.app_error().status_code(), expected_status);
        assert_eq!(api.code(), code);
    }

    #[test]
    fn test_app_error_uses_its_own_code() {
        let api = ApiError::from(AppError::Unauthorized("no token".into()));
        assert_eq!(api.code(), "UNAUTHORIZED");
        assert_eq!(api.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
