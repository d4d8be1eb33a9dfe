//! Property-based tests for invoice consolidation.
//!
//! - Every consolidated invoice equals the live sum of its card entries
//! - A write followed by a delete of the same spend leaves the invoices as
//!   they were
//! - A paid invoice never returns to pending

use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use storeledger_shared::types::{ManualGroupId, TenantId};

use super::card::{CardLedgerWriter, CardSpend};
use super::types::{CardSource, EntryStatus, InvoiceKey, LedgerEntry};
use crate::billing::BillingCycle;
use crate::calendar::ReferenceCalendar;
use crate::memory::{MemoryUnitOfWork, TenantBook, fixtures};
use crate::store::{LedgerStore, UnitOfWork};

#[derive(Debug, Clone)]
struct Spend {
    cents: i64,
    installments: u32,
    day_offset: i64,
}

fn spend_strategy() -> impl Strategy<Value = Spend> {
    (1i64..100_000, 1u32..=6, 0i64..90).prop_map(|(cents, installments, day_offset)| Spend {
        cents,
        installments,
        day_offset,
    })
}

fn card_spend(fixture: &fixtures::Directory, spend: &Spend, source: CardSource) -> CardSpend {
    CardSpend {
        description: "Spend".to_string(),
        amount: Decimal::new(spend.cents, 2),
        category: "misc".to_string(),
        competence_at: Utc.with_ymd_and_hms(2026, 1, 1, 15, 0, 0).unwrap()
            + Duration::days(spend.day_offset),
        account_id: fixture.account_id,
        instrument_id: fixture.credit_id,
        cycle: BillingCycle::new(10, 20).unwrap(),
        installments: spend.installments,
        source,
    }
}

fn invoices(book: &TenantBook) -> BTreeMap<InvoiceKey, LedgerEntry> {
    book.ledger_entries
        .values()
        .filter_map(|entry| entry.invoice_key().map(|key| (key, entry.clone())))
        .collect()
}

fn live_sums(book: &TenantBook) -> BTreeMap<InvoiceKey, Decimal> {
    let mut sums = BTreeMap::new();
    for entry in book.card_entries.values() {
        *sums.entry(entry.invoice_key()).or_insert(Decimal::ZERO) += entry.amount;
    }
    sums
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_invoice_equals_live_sum(
        spends in prop::collection::vec(spend_strategy(), 1..8),
        removed in prop::collection::vec(any::<bool>(), 8),
    ) {
        let book = runtime().block_on(async {
            let uow = MemoryUnitOfWork::new();
            let tenant = TenantId::new();
            let fixture = fixtures::directory(&uow, tenant).await;
            let calendar = ReferenceCalendar::default();

            let mut store = uow.begin(tenant).await.unwrap();
            let mut sources = Vec::new();
            for spend in &spends {
                let source = CardSource::Manual(ManualGroupId::new());
                CardLedgerWriter::write(&mut store, &calendar, card_spend(&fixture, spend, source))
                    .await
                    .unwrap();
                sources.push(source);
            }
            for (source, remove) in sources.iter().zip(&removed) {
                if *remove {
                    CardLedgerWriter::remove(&mut store, &calendar, source).await.unwrap();
                }
            }
            store.commit().await.unwrap();
            uow.snapshot(tenant).await
        });

        let invoices = invoices(&book);
        let sums = live_sums(&book);
        prop_assert_eq!(
            invoices.keys().collect::<Vec<_>>(),
            sums.keys().collect::<Vec<_>>()
        );
        for (key, invoice) in &invoices {
            prop_assert_eq!(invoice.amount, sums[key]);
            prop_assert_eq!(invoice.status, EntryStatus::Pending);
        }
    }

    #[test]
    fn prop_write_then_remove_round_trips(
        existing in prop::collection::vec(spend_strategy(), 0..5),
        extra in spend_strategy(),
    ) {
        let (before, after) = runtime().block_on(async {
            let uow = MemoryUnitOfWork::new();
            let tenant = TenantId::new();
            let fixture = fixtures::directory(&uow, tenant).await;
            let calendar = ReferenceCalendar::default();

            let mut store = uow.begin(tenant).await.unwrap();
            for spend in &existing {
                let source = CardSource::Manual(ManualGroupId::new());
                CardLedgerWriter::write(&mut store, &calendar, card_spend(&fixture, spend, source))
                    .await
                    .unwrap();
            }
            store.commit().await.unwrap();
            let before = uow.snapshot(tenant).await;

            let mut store = uow.begin(tenant).await.unwrap();
            let source = CardSource::Manual(ManualGroupId::new());
            CardLedgerWriter::write(&mut store, &calendar, card_spend(&fixture, &extra, source))
                .await
                .unwrap();
            CardLedgerWriter::remove(&mut store, &calendar, &source).await.unwrap();
            store.commit().await.unwrap();
            let after = uow.snapshot(tenant).await;
            (before, after)
        });

        let before = invoices(&before);
        let after = invoices(&after);
        prop_assert_eq!(before.len(), after.len());
        for (key, invoice) in &before {
            let other = &after[key];
            prop_assert_eq!(invoice.amount, other.amount);
            prop_assert_eq!(invoice.status, other.status);
        }
    }

    #[test]
    fn prop_paid_invoice_stays_paid(
        first in spend_strategy(),
        later in prop::collection::vec(spend_strategy(), 0..5),
    ) {
        let book = runtime().block_on(async {
            let uow = MemoryUnitOfWork::new();
            let tenant = TenantId::new();
            let fixture = fixtures::directory(&uow, tenant).await;
            let calendar = ReferenceCalendar::default();

            let mut store = uow.begin(tenant).await.unwrap();
            let source = CardSource::Manual(ManualGroupId::new());
            let entries = CardLedgerWriter::write(&mut store, &calendar, card_spend(&fixture, &first, source))
                .await
                .unwrap();
            let key = entries[0].invoice_key();
            let mut invoice = store.consolidated_invoice_for_update(&key).await.unwrap().unwrap();
            invoice.status = EntryStatus::Paid;
            invoice.paid_at = Some(Utc::now());
            store.update_ledger_entry(&invoice).await.unwrap();

            for spend in &later {
                let other = CardSource::Manual(ManualGroupId::new());
                CardLedgerWriter::write(&mut store, &calendar, card_spend(&fixture, spend, other))
                    .await
                    .unwrap();
            }
            CardLedgerWriter::remove(&mut store, &calendar, &source).await.unwrap();
            store.commit().await.unwrap();
            (uow.snapshot(tenant).await, key)
        });

        let (book, key) = book;
        let invoices = invoices(&book);
        prop_assert_eq!(invoices[&key].status, EntryStatus::Paid);
    }
}
