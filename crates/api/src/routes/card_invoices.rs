//! Consolidated card invoice routes.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::Serialize;
use storeledger_core::UnitOfWork;
use storeledger_core::ledger::invoice::ReconcileOutcome;
use storeledger_core::ledger::types::InvoiceKey;
use storeledger_shared::types::LedgerEntryId;

use crate::{ApiError, AppState, middleware::AuthUser};

/// Creates the invoice routes.
pub fn routes<U>() -> Router<AppState<U>>
where
    U: UnitOfWork + 'static,
{
    Router::new().route("/card-invoices/reconcile", post(reconcile_invoice::<U>))
}

/// Result of a reconcile request.
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    /// What happened to the invoice entry.
    pub outcome: &'static str,
    /// The invoice entry, when one exists or existed.
    pub entry_id: Option<LedgerEntryId>,
}

impl From<ReconcileOutcome> for ReconcileResponse {
    fn from(outcome: ReconcileOutcome) -> Self {
        let (outcome, entry_id) = match outcome {
            ReconcileOutcome::Created(id) => ("created", Some(id)),
            ReconcileOutcome::Updated(id) => ("updated", Some(id)),
            ReconcileOutcome::Unchanged(id) => ("unchanged", Some(id)),
            ReconcileOutcome::Deleted(id) => ("deleted", Some(id)),
            ReconcileOutcome::KeptPaid(id) => ("kept_paid", Some(id)),
            ReconcileOutcome::Absent => ("absent", None),
        };
        Self { outcome, entry_id }
    }
}

/// POST `/card-invoices/reconcile` - Re-derive one invoice from the card ledger.
async fn reconcile_invoice<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Json(key): Json<InvoiceKey>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.engine.reconcile_invoice(auth.tenant_id(), key).await?;
    Ok(Json(ReconcileResponse::from(outcome)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::test_app;

    #[tokio::test]
    async fn test_reconcile_reports_outcome() {
        let app = test_app().await;
        let key = json!({
            "account_id": app.directory.account_id,
            "instrument_id": app.directory.credit_id,
            "due_day": "2026-05-20"
        });

        let (status, body) = app
            .send("POST", "/api/v1/card-invoices/reconcile", Some(key.clone()))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "absent");
        assert!(body["entry_id"].is_null());

        app.send(
            "POST",
            "/api/v1/manual-costs",
            Some(json!({
                "description": "Shelves",
                "amount": "120",
                "category": "equipment",
                "payment": {
                    "account_id": app.directory.account_id,
                    "instrument_id": app.directory.credit_id
                },
                "competence_at": "2026-03-15T15:00:00Z"
            })),
        )
        .await;

        let (status, body) = app
            .send("POST", "/api/v1/card-invoices/reconcile", Some(key))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "unchanged");
        assert!(body["entry_id"].is_string());
    }
}
