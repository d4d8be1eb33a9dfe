//! Manual costs and direct cash-entry operations.
//!
//! Manual costs go through the posting router like document postings do.
//! On a card they become an installment group that is replaced or deleted as
//! a whole; otherwise they become an ordinary cash entry.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use storeledger_shared::types::{CardEntryId, LedgerEntryId, ManualGroupId};
use tracing::debug;

use super::card::CardLedgerWriter;
use super::guard::{ensure_card_entry_editable, ensure_cash_entry_editable};
use super::posting::{PaymentSelection, PostingOutcome, PostingRequest, PostingRouter};
use super::types::{CardSource, EntryStatus, Flow, LedgerEntry, PostingOwner};
use crate::calendar::ReferenceCalendar;
use crate::error::EngineError;
use crate::store::LedgerStore;

/// A manual cost to post.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualCostInput {
    /// Description.
    pub description: String,
    /// Positive amount.
    pub amount: Decimal,
    /// Category.
    pub category: String,
    /// Payment terms.
    pub payment: PaymentSelection,
    /// Time of the cost.
    pub competence_at: DateTime<Utc>,
}

impl ManualCostInput {
    fn validate(&self) -> Result<(), EngineError> {
        if self.description.trim().is_empty() {
            return Err(EngineError::Validation("description is required".to_string()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        self.payment.validate()
    }
}

/// A posted manual cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualPosting {
    /// Group id; identifies the card installment set.
    pub group_id: ManualGroupId,
    /// Where the cost landed.
    pub outcome: PostingOutcome,
}

/// Changes to a plain cash entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CashEntryPatch {
    /// New description.
    pub description: Option<String>,
    /// New amount.
    pub amount: Option<Decimal>,
    /// New category.
    pub category: Option<String>,
    /// New due date.
    pub due_date: Option<NaiveDate>,
}

/// Posts a manual cost under a fresh group.
pub async fn post_manual_cost<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    input: ManualCostInput,
) -> Result<ManualPosting, EngineError> {
    post_in_group(store, calendar, ManualGroupId::new(), input).await
}

/// Replaces every installment of a manual card cost.
///
/// The old installments are removed and their invoices reconciled before
/// the new cost is posted under the same group.
pub async fn replace_manual_cost<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    group_id: ManualGroupId,
    input: ManualCostInput,
) -> Result<ManualPosting, EngineError> {
    input.validate()?;
    delete_manual_cost(store, calendar, group_id).await?;
    post_in_group(store, calendar, group_id, input).await
}

/// Deletes every installment of a manual card cost.
pub async fn delete_manual_cost<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    group_id: ManualGroupId,
) -> Result<(), EngineError> {
    let touched = CardLedgerWriter::remove(store, calendar, &CardSource::Manual(group_id)).await?;
    if touched.is_empty() {
        return Err(EngineError::ManualGroupNotFound(group_id));
    }
    Ok(())
}

/// Deletes a card entry; a manual installment takes its whole group along.
pub async fn delete_card_entry<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    id: CardEntryId,
) -> Result<(), EngineError> {
    let entry = store
        .card_entry(id)
        .await?
        .ok_or(EngineError::CardEntryNotFound(id))?;
    ensure_card_entry_editable(&entry)?;
    CardLedgerWriter::remove(store, calendar, &entry.source).await?;
    Ok(())
}

async fn post_in_group<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    group_id: ManualGroupId,
    input: ManualCostInput,
) -> Result<ManualPosting, EngineError> {
    input.validate()?;
    let request = PostingRequest {
        description: input.description,
        amount: input.amount,
        category: input.category,
        flow: Flow::Expense,
        payment: input.payment,
        competence_at: input.competence_at,
        owner: PostingOwner::Manual(group_id),
    };
    let outcome = PostingRouter::post(store, calendar, request).await?;
    debug!(group_id = %group_id, "Manual cost posted");
    Ok(ManualPosting { group_id, outcome })
}

async fn load_entry<S: LedgerStore>(
    store: &mut S,
    id: LedgerEntryId,
) -> Result<LedgerEntry, EngineError> {
    store
        .ledger_entry_for_update(id)
        .await?
        .ok_or(EngineError::LedgerEntryNotFound(id))
}

/// Edits a plain cash entry.
///
/// The amount of an entry split into parcels cannot change; delete and
/// re-post it instead.
pub async fn update_cash_entry<S: LedgerStore>(
    store: &mut S,
    id: LedgerEntryId,
    patch: CashEntryPatch,
) -> Result<LedgerEntry, EngineError> {
    let mut entry = load_entry(store, id).await?;
    ensure_cash_entry_editable(&entry)?;

    if let Some(description) = patch.description {
        if description.trim().is_empty() {
            return Err(EngineError::Validation("description is required".to_string()));
        }
        entry.description = description;
    }
    if let Some(amount) = patch.amount {
        if amount <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "amount must be positive, got {amount}"
            )));
        }
        if entry.installment_plan.is_some() && amount != entry.amount {
            return Err(EngineError::Validation(
                "the amount of an entry with installments cannot change".to_string(),
            ));
        }
        entry.amount = amount;
    }
    if let Some(category) = patch.category {
        entry.category = category;
    }
    if let Some(due_date) = patch.due_date {
        entry.due_date = due_date;
    }

    store.update_ledger_entry(&entry).await?;
    Ok(entry)
}

/// Deletes a plain cash entry.
pub async fn delete_cash_entry<S: LedgerStore>(
    store: &mut S,
    id: LedgerEntryId,
) -> Result<(), EngineError> {
    let entry = load_entry(store, id).await?;
    ensure_cash_entry_editable(&entry)?;
    store.delete_ledger_entry(id).await?;
    Ok(())
}

/// Settles a cash entry and any unpaid parcels.
///
/// Allowed on consolidated invoices and document-owned entries: settling is
/// not an edit of the amount. Settling an already paid entry is a no-op.
pub async fn mark_paid<S: LedgerStore>(
    store: &mut S,
    id: LedgerEntryId,
    paid_at: DateTime<Utc>,
) -> Result<LedgerEntry, EngineError> {
    let mut entry = load_entry(store, id).await?;
    if entry.status == EntryStatus::Paid {
        return Ok(entry);
    }

    entry.status = EntryStatus::Paid;
    entry.paid_at = Some(paid_at);
    if let Some(plan) = entry.installment_plan.as_mut() {
        for installment in &mut plan.installments {
            if installment.status == EntryStatus::Pending {
                installment.status = EntryStatus::Paid;
                installment.paid_at = Some(paid_at);
            }
        }
    }

    store.update_ledger_entry(&entry).await?;
    debug!(entry_id = %id, "Ledger entry paid");
    Ok(entry)
}

/// Settles one parcel; the entry is paid once every parcel is.
pub async fn mark_installment_paid<S: LedgerStore>(
    store: &mut S,
    id: LedgerEntryId,
    number: u32,
    paid_at: DateTime<Utc>,
) -> Result<LedgerEntry, EngineError> {
    let mut entry = load_entry(store, id).await?;
    let plan = entry.installment_plan.as_mut().ok_or_else(|| {
        EngineError::Validation(format!("ledger entry {id} has no installments"))
    })?;
    let installment = plan
        .installments
        .iter_mut()
        .find(|installment| installment.number == number)
        .ok_or_else(|| {
            EngineError::Validation(format!("ledger entry {id} has no installment {number}"))
        })?;

    if installment.status == EntryStatus::Pending {
        installment.status = EntryStatus::Paid;
        installment.paid_at = Some(paid_at);
    }
    if plan.is_settled() {
        entry.status = EntryStatus::Paid;
        entry.paid_at = Some(paid_at);
    }

    store.update_ledger_entry(&entry).await?;
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{InvoiceKey, OriginRef};
    use crate::memory::{MemoryUnitOfWork, fixtures};
    use crate::store::UnitOfWork;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use storeledger_shared::types::{InstrumentId, PurchaseOrderId, TenantId};

    fn input(fixture: &fixtures::Directory, instrument: InstrumentId, amount: Decimal, installments: u32) -> ManualCostInput {
        ManualCostInput {
            description: "Shop rent".to_string(),
            amount,
            category: "rent".to_string(),
            payment: PaymentSelection {
                account_id: fixture.account_id,
                instrument_id: instrument,
                installments,
                first_due_date: Some(NaiveDate::from_ymd_opt(2026, 4, 5).unwrap()),
                paid: false,
            },
            competence_at: Utc.with_ymd_and_hms(2026, 3, 15, 15, 0, 0).unwrap(),
        }
    }

    fn paid_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 5, 14, 0, 0).unwrap()
    }

    fn may_invoice(fixture: &fixtures::Directory) -> InvoiceKey {
        InvoiceKey {
            account_id: fixture.account_id,
            instrument_id: fixture.credit_id,
            due_day: NaiveDate::from_ymd_opt(2026, 5, 20).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_replace_manual_cost_keeps_group() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        let posted = post_manual_cost(&mut store, &calendar, input(&fixture, fixture.credit_id, dec!(200), 2))
            .await
            .unwrap();
        let replaced = replace_manual_cost(
            &mut store,
            &calendar,
            posted.group_id,
            input(&fixture, fixture.credit_id, dec!(90), 1),
        )
        .await
        .unwrap();
        assert_eq!(replaced.group_id, posted.group_id);

        let entries = store
            .card_entries_by_source(&CardSource::Manual(posted.group_id))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        let invoice = store
            .consolidated_invoice_for_update(&may_invoice(&fixture))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invoice.amount, dec!(90));

        // The June invoice of the old second installment is gone.
        let june = InvoiceKey {
            due_day: NaiveDate::from_ymd_opt(2026, 6, 20).unwrap(),
            ..may_invoice(&fixture)
        };
        assert!(store.consolidated_invoice_for_update(&june).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_group_is_not_found() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        let err = delete_manual_cost(&mut store, &calendar, ManualGroupId::new())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "MANUAL_GROUP_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_consolidated_invoice_rejects_direct_edits() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        post_manual_cost(&mut store, &calendar, input(&fixture, fixture.credit_id, dec!(80), 1))
            .await
            .unwrap();
        let invoice = store
            .consolidated_invoice_for_update(&may_invoice(&fixture))
            .await
            .unwrap()
            .unwrap();

        let patch = CashEntryPatch {
            amount: Some(dec!(1)),
            ..CashEntryPatch::default()
        };
        let err = update_cash_entry(&mut store, invoice.id, patch).await.unwrap_err();
        assert_eq!(err.http_status_code(), 403);
        let err = delete_cash_entry(&mut store, invoice.id).await.unwrap_err();
        assert_eq!(err.error_code(), "CONSOLIDATED_INVOICE_READ_ONLY");

        // Paying it is allowed.
        let paid = mark_paid(&mut store, invoice.id, paid_at()).await.unwrap();
        assert_eq!(paid.status, EntryStatus::Paid);
        assert_eq!(paid.amount, dec!(80));
    }

    #[tokio::test]
    async fn test_document_owned_card_entry_rejected() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();
        let owner = PostingOwner::Purchase(PurchaseOrderId::new());

        let mut store = uow.begin(tenant).await.unwrap();
        let request = PostingRequest {
            description: "Supplier".to_string(),
            amount: dec!(60),
            category: "purchase".to_string(),
            flow: Flow::Expense,
            payment: input(&fixture, fixture.credit_id, dec!(60), 1).payment,
            competence_at: paid_at(),
            owner,
        };
        let PostingOutcome::Card(entries) = PostingRouter::post(&mut store, &calendar, request).await.unwrap() else {
            panic!("expected card posting");
        };

        let err = delete_card_entry(&mut store, &calendar, entries[0].id)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DOCUMENT_OWNED_CARD_ENTRY");
        assert!(store.card_entry(entries[0].id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_manual_card_entry_removes_group() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        let posted = post_manual_cost(&mut store, &calendar, input(&fixture, fixture.credit_id, dec!(300), 3))
            .await
            .unwrap();
        let PostingOutcome::Card(entries) = posted.outcome else {
            panic!("expected card posting");
        };

        delete_card_entry(&mut store, &calendar, entries[1].id).await.unwrap();
        store.commit().await.unwrap();

        let book = uow.snapshot(tenant).await;
        assert!(book.card_entries.is_empty());
        assert!(book.ledger_entries.is_empty());
    }

    #[tokio::test]
    async fn test_manual_cost_on_pix_is_plain_cash_entry() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        let posted = post_manual_cost(&mut store, &calendar, input(&fixture, fixture.pix_id, dec!(45), 1))
            .await
            .unwrap();
        let PostingOutcome::Cash(entry) = posted.outcome else {
            panic!("expected cash posting");
        };
        assert_eq!(entry.origin, None);

        let patch = CashEntryPatch {
            description: Some("Shop rent March".to_string()),
            amount: Some(dec!(50)),
            ..CashEntryPatch::default()
        };
        let updated = update_cash_entry(&mut store, entry.id, patch).await.unwrap();
        assert_eq!(updated.amount, dec!(50));
        assert_eq!(updated.description, "Shop rent March");

        delete_cash_entry(&mut store, entry.id).await.unwrap();
        let err = delete_cash_entry(&mut store, entry.id).await.unwrap_err();
        assert_eq!(err.error_code(), "LEDGER_ENTRY_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_installments_paid_one_by_one() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        let posted = post_manual_cost(&mut store, &calendar, input(&fixture, fixture.boleto_id, dec!(300), 2))
            .await
            .unwrap();
        let PostingOutcome::Cash(entry) = posted.outcome else {
            panic!("expected cash posting");
        };

        let patch = CashEntryPatch {
            amount: Some(dec!(400)),
            ..CashEntryPatch::default()
        };
        let err = update_cash_entry(&mut store, entry.id, patch).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let first = mark_installment_paid(&mut store, entry.id, 1, paid_at()).await.unwrap();
        assert_eq!(first.status, EntryStatus::Pending);
        let second = mark_installment_paid(&mut store, entry.id, 2, paid_at()).await.unwrap();
        assert_eq!(second.status, EntryStatus::Paid);
        assert_eq!(second.paid_at, Some(paid_at()));

        let err = mark_installment_paid(&mut store, entry.id, 3, paid_at()).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_document_owned_cash_entry_rejected() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();
        let purchase = PurchaseOrderId::new();

        let mut store = uow.begin(tenant).await.unwrap();
        let request = PostingRequest {
            description: "Supplier".to_string(),
            amount: dec!(60),
            category: "purchase".to_string(),
            flow: Flow::Expense,
            payment: input(&fixture, fixture.pix_id, dec!(60), 1).payment,
            competence_at: paid_at(),
            owner: PostingOwner::Purchase(purchase),
        };
        let PostingOutcome::Cash(entry) = PostingRouter::post(&mut store, &calendar, request).await.unwrap() else {
            panic!("expected cash posting");
        };

        let err = delete_cash_entry(&mut store, entry.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::DocumentOwnedEntry { origin: OriginRef::Purchase(id), .. } if id == purchase
        ));
    }
}
