//! Invoice consolidation.
//!
//! A card invoice is a single cash entry per (account, card, due day) whose
//! amount is always re-derived from the card ledger. [`reconcile`] is the only
//! code path that creates, changes or deletes such an entry.

use rust_decimal::Decimal;
use storeledger_shared::types::LedgerEntryId;
use tracing::debug;

use super::types::{EntryStatus, Flow, InvoiceKey, LedgerEntry};
use crate::calendar::ReferenceCalendar;
use crate::error::EngineError;
use crate::store::LedgerStore;

/// Category of consolidated invoice entries.
pub const INVOICE_CATEGORY: &str = "card_invoice";

/// What a reconciliation did to the consolidated entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A pending invoice was created.
    Created(LedgerEntryId),
    /// The invoice amount changed.
    Updated(LedgerEntryId),
    /// The invoice already matched the card ledger.
    Unchanged(LedgerEntryId),
    /// The empty pending invoice was removed.
    Deleted(LedgerEntryId),
    /// The invoice is empty but paid, so it stays as a historical record.
    KeptPaid(LedgerEntryId),
    /// No card entries and no invoice.
    Absent,
}

/// Re-derives the consolidated invoice for `key` from the card ledger.
///
/// Idempotent. A paid invoice keeps its status across recomputation.
pub async fn reconcile<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    key: &InvoiceKey,
) -> Result<ReconcileOutcome, EngineError> {
    let existing = store.consolidated_invoice_for_update(key).await?;
    let total = store.card_invoice_total(key).await?;

    let outcome = match existing {
        Some(mut invoice) if total > Decimal::ZERO => {
            if invoice.amount == total {
                ReconcileOutcome::Unchanged(invoice.id)
            } else {
                invoice.amount = total;
                store.update_ledger_entry(&invoice).await?;
                ReconcileOutcome::Updated(invoice.id)
            }
        }
        None if total > Decimal::ZERO => {
            let invoice = new_invoice(store, calendar, key, total).await?;
            store.insert_ledger_entry(&invoice).await?;
            ReconcileOutcome::Created(invoice.id)
        }
        Some(invoice) => match invoice.status {
            EntryStatus::Pending => {
                store.delete_ledger_entry(invoice.id).await?;
                ReconcileOutcome::Deleted(invoice.id)
            }
            EntryStatus::Paid => ReconcileOutcome::KeptPaid(invoice.id),
        },
        None => ReconcileOutcome::Absent,
    };

    debug!(invoice = %key, total = %total, outcome = ?outcome, "Invoice reconciled");
    Ok(outcome)
}

async fn new_invoice<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    key: &InvoiceKey,
    total: Decimal,
) -> Result<LedgerEntry, EngineError> {
    let account = store
        .financial_account(key.account_id)
        .await?
        .ok_or(EngineError::AccountNotFound(key.account_id))?;
    let instrument = account.instrument(key.instrument_id)?;

    Ok(LedgerEntry {
        id: LedgerEntryId::new(),
        description: format!("Invoice {}", instrument.name),
        amount: total,
        flow: Flow::Expense,
        category: INVOICE_CATEGORY.to_string(),
        status: EntryStatus::Pending,
        competence_at: calendar.start_of_day(key.due_day),
        due_date: key.due_day,
        paid_at: None,
        origin: None,
        account_id: Some(key.account_id),
        instrument_id: Some(key.instrument_id),
        installment_plan: None,
        is_consolidated_invoice: true,
    })
}
