//! Card ledger writer.
//!
//! Splits a card spend into one entry per installment and keeps the
//! consolidated invoices of every touched due day in step.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use storeledger_shared::types::{CardEntryId, FinancialAccountId, InstrumentId};
use tracing::debug;

use super::invoice::reconcile;
use super::types::{CardLedgerEntry, CardSource, InvoiceKey};
use crate::billing::BillingCycle;
use crate::calendar::ReferenceCalendar;
use crate::error::EngineError;
use crate::store::LedgerStore;

/// A spending event charged to a credit instrument.
#[derive(Debug, Clone)]
pub struct CardSpend {
    /// Description shared by every installment.
    pub description: String,
    /// Total amount.
    pub amount: Decimal,
    /// Category.
    pub category: String,
    /// Time of the spend.
    pub competence_at: DateTime<Utc>,
    /// Account of the card.
    pub account_id: FinancialAccountId,
    /// The card.
    pub instrument_id: InstrumentId,
    /// Billing cycle of the card.
    pub cycle: BillingCycle,
    /// Installment count, at least one.
    pub installments: u32,
    /// Spending event tag.
    pub source: CardSource,
}

/// Writes and removes card spends.
pub struct CardLedgerWriter;

impl CardLedgerWriter {
    /// Persists one entry per installment, then reconciles each touched invoice.
    ///
    /// The amount is split by straight division; installment amounts are not
    /// rounded to cents, so their sum equals the spend up to decimal
    /// precision.
    pub async fn write<S: LedgerStore>(
        store: &mut S,
        calendar: &ReferenceCalendar,
        spend: CardSpend,
    ) -> Result<Vec<CardLedgerEntry>, EngineError> {
        if spend.installments == 0 {
            return Err(EngineError::Validation(
                "installment count must be at least 1".to_string(),
            ));
        }

        let competence_day = calendar.day_of(spend.competence_at);
        let due_dates = spend.cycle.due_dates(competence_day, spend.installments);
        let installment_amount = spend.amount / Decimal::from(spend.installments);

        let entries: Vec<CardLedgerEntry> = (1..)
            .zip(due_dates)
            .map(|(number, due_date)| CardLedgerEntry {
                id: CardEntryId::new(),
                description: installment_description(&spend.description, number, spend.installments),
                amount: installment_amount,
                category: spend.category.clone(),
                competence_at: spend.competence_at,
                due_date,
                account_id: spend.account_id,
                instrument_id: spend.instrument_id,
                installment: number,
                installment_count: spend.installments,
                source: spend.source,
            })
            .collect();

        store.insert_card_entries(&entries).await?;
        debug!(
            source = %spend.source,
            installments = spend.installments,
            amount = %spend.amount,
            "Card spend written"
        );

        let touched: BTreeSet<InvoiceKey> = entries.iter().map(CardLedgerEntry::invoice_key).collect();
        Self::reconcile_all(store, calendar, &touched).await?;

        Ok(entries)
    }

    /// Deletes every entry of a spend, then reconciles the invoices they
    /// belonged to. Returns the touched invoice keys.
    pub async fn remove<S: LedgerStore>(
        store: &mut S,
        calendar: &ReferenceCalendar,
        source: &CardSource,
    ) -> Result<BTreeSet<InvoiceKey>, EngineError> {
        let entries = store.card_entries_by_source(source).await?;
        if entries.is_empty() {
            return Ok(BTreeSet::new());
        }

        let touched: BTreeSet<InvoiceKey> = entries.iter().map(CardLedgerEntry::invoice_key).collect();
        let ids: Vec<CardEntryId> = entries.iter().map(|entry| entry.id).collect();

        store.delete_card_entries(&ids).await?;
        debug!(source = %source, removed = ids.len(), "Card spend removed");

        Self::reconcile_all(store, calendar, &touched).await?;
        Ok(touched)
    }

    async fn reconcile_all<S: LedgerStore>(
        store: &mut S,
        calendar: &ReferenceCalendar,
        keys: &BTreeSet<InvoiceKey>,
    ) -> Result<(), EngineError> {
        for key in keys {
            reconcile(store, calendar, key).await?;
        }
        Ok(())
    }
}

fn installment_description(description: &str, number: u32, count: u32) -> String {
    if count > 1 {
        format!("{description} ({number}/{count})")
    } else {
        description.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::invoice::ReconcileOutcome;
    use crate::ledger::types::EntryStatus;
    use crate::memory::{MemoryUnitOfWork, fixtures};
    use crate::store::UnitOfWork;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;
    use storeledger_shared::types::{ManualGroupId, PurchaseOrderId, TenantId};

    fn spend(fixture: &fixtures::Directory, amount: Decimal, installments: u32, source: CardSource) -> CardSpend {
        CardSpend {
            description: "Shelf".to_string(),
            amount,
            category: "equipment".to_string(),
            // 15 March 2026, midday in Sao Paulo.
            competence_at: Utc.with_ymd_and_hms(2026, 3, 15, 15, 0, 0).unwrap(),
            account_id: fixture.account_id,
            instrument_id: fixture.credit_id,
            cycle: BillingCycle::new(10, 20).unwrap(),
            installments,
            source,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_split_into_installments_and_invoices() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        let source = CardSource::Manual(ManualGroupId::new());
        let entries = CardLedgerWriter::write(&mut store, &calendar, spend(&fixture, dec!(300), 3, source))
            .await
            .unwrap();
        store.commit().await.unwrap();

        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|entry| entry.amount == dec!(100)));
        assert_eq!(entries[0].due_date, date(2026, 5, 20));
        assert_eq!(entries[2].due_date, date(2026, 7, 20));
        assert_eq!(entries[1].description, "Shelf (2/3)");

        let book = uow.snapshot(tenant).await;
        let invoices: Vec<_> = book
            .ledger_entries
            .values()
            .filter(|entry| entry.is_consolidated_invoice)
            .collect();
        assert_eq!(invoices.len(), 3);
        assert!(invoices.iter().all(|invoice| invoice.amount == dec!(100)));
        assert!(invoices.iter().all(|invoice| invoice.description == "Invoice Visa"));
        assert!(invoices.iter().all(|invoice| invoice.status == EntryStatus::Pending));
    }

    #[tokio::test]
    async fn test_spends_on_same_due_day_share_an_invoice() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        let first = CardSource::Manual(ManualGroupId::new());
        let second = CardSource::Purchase(PurchaseOrderId::new());
        CardLedgerWriter::write(&mut store, &calendar, spend(&fixture, dec!(40), 1, first))
            .await
            .unwrap();
        CardLedgerWriter::write(&mut store, &calendar, spend(&fixture, dec!(60), 1, second))
            .await
            .unwrap();

        let key = InvoiceKey {
            account_id: fixture.account_id,
            instrument_id: fixture.credit_id,
            due_day: date(2026, 5, 20),
        };
        let invoice = store.consolidated_invoice_for_update(&key).await.unwrap().unwrap();
        assert_eq!(invoice.amount, dec!(100));

        let touched = CardLedgerWriter::remove(&mut store, &calendar, &first).await.unwrap();
        assert_eq!(touched.into_iter().collect::<Vec<_>>(), vec![key]);
        let invoice = store.consolidated_invoice_for_update(&key).await.unwrap().unwrap();
        assert_eq!(invoice.amount, dec!(60));

        CardLedgerWriter::remove(&mut store, &calendar, &second).await.unwrap();
        assert!(store.consolidated_invoice_for_update(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_paid_invoice_survives_and_stays_paid() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        let first = CardSource::Manual(ManualGroupId::new());
        CardLedgerWriter::write(&mut store, &calendar, spend(&fixture, dec!(50), 1, first))
            .await
            .unwrap();
        let key = InvoiceKey {
            account_id: fixture.account_id,
            instrument_id: fixture.credit_id,
            due_day: date(2026, 5, 20),
        };
        let mut invoice = store.consolidated_invoice_for_update(&key).await.unwrap().unwrap();
        invoice.status = EntryStatus::Paid;
        invoice.paid_at = Some(Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap());
        store.update_ledger_entry(&invoice).await.unwrap();

        // A later spend on the same invoice keeps it paid.
        let second = CardSource::Manual(ManualGroupId::new());
        CardLedgerWriter::write(&mut store, &calendar, spend(&fixture, dec!(25), 1, second))
            .await
            .unwrap();
        let recomputed = store.consolidated_invoice_for_update(&key).await.unwrap().unwrap();
        assert_eq!(recomputed.amount, dec!(75));
        assert_eq!(recomputed.status, EntryStatus::Paid);

        // Emptying it keeps the paid record.
        CardLedgerWriter::remove(&mut store, &calendar, &first).await.unwrap();
        CardLedgerWriter::remove(&mut store, &calendar, &second).await.unwrap();
        let kept = store.consolidated_invoice_for_update(&key).await.unwrap().unwrap();
        assert_eq!(kept.status, EntryStatus::Paid);
        assert_eq!(
            reconcile(&mut store, &calendar, &key).await.unwrap(),
            ReconcileOutcome::KeptPaid(kept.id)
        );
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        let source = CardSource::Manual(ManualGroupId::new());
        CardLedgerWriter::write(&mut store, &calendar, spend(&fixture, dec!(90), 1, source))
            .await
            .unwrap();
        let key = InvoiceKey {
            account_id: fixture.account_id,
            instrument_id: fixture.credit_id,
            due_day: date(2026, 5, 20),
        };

        let first = reconcile(&mut store, &calendar, &key).await.unwrap();
        let second = reconcile(&mut store, &calendar, &key).await.unwrap();
        assert!(matches!(first, ReconcileOutcome::Unchanged(_)));
        assert_eq!(first, second);

        let empty_key = InvoiceKey {
            due_day: date(2026, 9, 20),
            ..key
        };
        assert_eq!(
            reconcile(&mut store, &calendar, &empty_key).await.unwrap(),
            ReconcileOutcome::Absent
        );
    }

    #[tokio::test]
    async fn test_uneven_split_keeps_straight_division() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        let source = CardSource::Manual(ManualGroupId::new());
        let entries = CardLedgerWriter::write(&mut store, &calendar, spend(&fixture, dec!(100), 3, source))
            .await
            .unwrap();

        // No cent redistribution: every installment carries the full quotient.
        let quotient = dec!(100) / Decimal::from(3);
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|entry| entry.amount == quotient));
        assert_ne!(entries[0].amount, dec!(33.33));
        assert_ne!(entries[2].amount, dec!(33.34));
    }

    #[tokio::test]
    async fn test_zero_installments_rejected() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        let source = CardSource::Manual(ManualGroupId::new());
        let err = CardLedgerWriter::write(&mut store, &calendar, spend(&fixture, dec!(10), 0, source))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
