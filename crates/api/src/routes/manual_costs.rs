//! Manual cost routes.
//!
//! A manual cost on a credit instrument becomes a group of card installments;
//! on any other instrument it becomes a plain cash entry.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post, put},
};
use serde::Serialize;
use storeledger_core::UnitOfWork;
use storeledger_core::ledger::manual::{ManualCostInput, ManualPosting};
use storeledger_core::ledger::posting::PostingOutcome;
use storeledger_core::ledger::types::{CardLedgerEntry, LedgerEntry};
use storeledger_shared::types::{CardEntryId, ManualGroupId};
use uuid::Uuid;

use crate::{ApiError, AppState, middleware::AuthUser};

/// Creates the manual cost routes.
pub fn routes<U>() -> Router<AppState<U>>
where
    U: UnitOfWork + 'static,
{
    Router::new()
        .route("/manual-costs", post(post_manual_cost::<U>))
        .route(
            "/manual-costs/{group}",
            put(replace_manual_cost::<U>).delete(delete_manual_cost::<U>),
        )
        .route("/card-entries/{id}", delete(delete_card_entry::<U>))
}

/// Where a manual cost landed.
#[derive(Debug, Serialize)]
pub struct ManualPostingResponse {
    /// Group id of the installment set.
    pub group_id: ManualGroupId,
    /// Card installments, when paid by card.
    pub card_entries: Vec<CardLedgerEntry>,
    /// Cash entry, when paid otherwise.
    pub cash_entry: Option<LedgerEntry>,
}

impl From<ManualPosting> for ManualPostingResponse {
    fn from(posting: ManualPosting) -> Self {
        let (card_entries, cash_entry) = match posting.outcome {
            PostingOutcome::Card(entries) => (entries, None),
            PostingOutcome::Cash(entry) => (Vec::new(), Some(entry)),
        };
        Self {
            group_id: posting.group_id,
            card_entries,
            cash_entry,
        }
    }
}

async fn post_manual_cost<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Json(input): Json<ManualCostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let posting = state.engine.post_manual_cost(auth.tenant_id(), input).await?;
    Ok((StatusCode::CREATED, Json(ManualPostingResponse::from(posting))))
}

/// PUT `/manual-costs/{group}` - Replace the whole installment group.
async fn replace_manual_cost<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(group): Path<Uuid>,
    Json(input): Json<ManualCostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let posting = state
        .engine
        .replace_manual_cost(auth.tenant_id(), ManualGroupId::from_uuid(group), input)
        .await?;
    Ok(Json(ManualPostingResponse::from(posting)))
}

async fn delete_manual_cost<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(group): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .delete_manual_cost(auth.tenant_id(), ManualGroupId::from_uuid(group))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE `/card-entries/{id}` - Delete a manual card entry with its group.
async fn delete_card_entry<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .delete_card_entry(auth.tenant_id(), CardEntryId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};

    use super::*;
    use crate::test_support::{TestApp, test_app};

    fn card_cost(app: &TestApp, amount: &str, installments: u32) -> Value {
        json!({
            "description": "Shelves",
            "amount": amount,
            "category": "equipment",
            "payment": {
                "account_id": app.directory.account_id,
                "instrument_id": app.directory.credit_id,
                "installments": installments
            },
            "competence_at": "2026-03-15T15:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_card_cost_creates_installments_and_invoices() {
        let app = test_app().await;
        let (status, posting) = app
            .send("POST", "/api/v1/manual-costs", Some(card_cost(&app, "300", 3)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(posting["card_entries"].as_array().unwrap().len(), 3);
        assert!(posting["cash_entry"].is_null());

        let book = app.uow.snapshot(app.tenant).await;
        assert_eq!(book.card_entries.len(), 3);
        let invoices: Vec<_> = book
            .ledger_entries
            .values()
            .filter(|entry| entry.is_consolidated_invoice)
            .collect();
        assert_eq!(invoices.len(), 3);
        assert!(invoices.iter().all(|invoice| invoice.amount == dec!(100)));

        let group = posting["group_id"].as_str().unwrap().to_string();
        let (status, posting) = app
            .send(
                "PUT",
                &format!("/api/v1/manual-costs/{group}"),
                Some(card_cost(&app, "200", 1)),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(posting["group_id"], group.as_str());

        let book = app.uow.snapshot(app.tenant).await;
        assert_eq!(book.card_entries.len(), 1);
        assert_eq!(book.ledger_entries.len(), 1);
        assert_eq!(book.ledger_entries.values().next().unwrap().amount, dec!(200));

        let (status, _) = app
            .send("DELETE", &format!("/api/v1/manual-costs/{group}"), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let book = app.uow.snapshot(app.tenant).await;
        assert!(book.card_entries.is_empty());
        assert!(book.ledger_entries.is_empty());
    }

    #[tokio::test]
    async fn test_delete_single_card_entry_drops_group() {
        let app = test_app().await;
        let (_, posting) = app
            .send("POST", "/api/v1/manual-costs", Some(card_cost(&app, "90", 3)))
            .await;
        let entry = posting["card_entries"][1]["id"].as_str().unwrap().to_string();

        let (status, _) = app
            .send("DELETE", &format!("/api/v1/card-entries/{entry}"), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let book = app.uow.snapshot(app.tenant).await;
        assert!(book.card_entries.is_empty());
        assert!(book.ledger_entries.is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected() {
        let app = test_app().await;
        let (status, body) = app
            .send("POST", "/api/v1/manual-costs", Some(card_cost(&app, "0", 1)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_group_is_not_found() {
        let app = test_app().await;
        let (status, body) = app
            .send(
                "DELETE",
                &format!("/api/v1/manual-costs/{}", Uuid::new_v4()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "MANUAL_GROUP_NOT_FOUND");
    }
}
