//! Posting router.
//!
//! The instrument kind decides where a posting lands: credit instruments go
//! to the card ledger, everything else becomes a cash entry, split into an
//! installment plan when paid in several parcels.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::{FinancialAccountId, InstrumentId, LedgerEntryId};
use tracing::debug;

use super::card::{CardLedgerWriter, CardSpend};
use super::types::{
    CardLedgerEntry, EntryStatus, Flow, Installment, InstallmentPlan, LedgerEntry, PostingOwner,
};
use crate::calendar::{ReferenceCalendar, add_months};
use crate::error::EngineError;
use crate::store::LedgerStore;

/// How a posting is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSelection {
    /// Account paid from or into.
    pub account_id: FinancialAccountId,
    /// Instrument used.
    pub instrument_id: InstrumentId,
    /// Number of installments.
    #[serde(default = "default_installments")]
    pub installments: u32,
    /// Due date of the first parcel of a cash posting; defaults to the
    /// competence day.
    #[serde(default)]
    pub first_due_date: Option<NaiveDate>,
    /// Whether a single-parcel cash posting is already settled.
    #[serde(default)]
    pub paid: bool,
}

fn default_installments() -> u32 {
    1
}

impl PaymentSelection {
    /// Validates the selection.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.installments == 0 {
            return Err(EngineError::Validation(
                "installment count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A movement to record.
#[derive(Debug, Clone)]
pub struct PostingRequest {
    /// Description.
    pub description: String,
    /// Positive amount.
    pub amount: Decimal,
    /// Category.
    pub category: String,
    /// Direction.
    pub flow: Flow,
    /// Payment terms.
    pub payment: PaymentSelection,
    /// Time the movement is attributed to.
    pub competence_at: DateTime<Utc>,
    /// Owner of the resulting entries.
    pub owner: PostingOwner,
}

/// Where a posting landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostingOutcome {
    /// Installments on the card ledger.
    Card(Vec<CardLedgerEntry>),
    /// A cash entry.
    Cash(LedgerEntry),
}

/// Routes postings to the card or cash ledger and reverses them.
pub struct PostingRouter;

impl PostingRouter {
    /// Records a posting.
    pub async fn post<S: LedgerStore>(
        store: &mut S,
        calendar: &ReferenceCalendar,
        request: PostingRequest,
    ) -> Result<PostingOutcome, EngineError> {
        if request.amount <= Decimal::ZERO {
            return Err(EngineError::Validation(format!(
                "posting amount must be positive, got {}",
                request.amount
            )));
        }
        request.payment.validate()?;

        let account = store
            .financial_account(request.payment.account_id)
            .await?
            .ok_or(EngineError::AccountNotFound(request.payment.account_id))?;
        let instrument = account.instrument(request.payment.instrument_id)?;

        if let Some(cycle) = instrument.billing_cycle() {
            let source = request.owner.card_source().ok_or_else(|| {
                EngineError::Validation("sales cannot be charged to a credit instrument".to_string())
            })?;
            if request.flow != Flow::Expense {
                return Err(EngineError::Validation(
                    "credit instruments only carry expenses".to_string(),
                ));
            }

            let spend = CardSpend {
                description: request.description,
                amount: request.amount,
                category: request.category,
                competence_at: request.competence_at,
                account_id: request.payment.account_id,
                instrument_id: request.payment.instrument_id,
                cycle,
                installments: request.payment.installments,
                source,
            };
            let entries = CardLedgerWriter::write(store, calendar, spend).await?;
            return Ok(PostingOutcome::Card(entries));
        }

        let entry = cash_entry(calendar, request);
        store.insert_ledger_entry(&entry).await?;
        debug!(
            entry_id = %entry.id,
            amount = %entry.amount,
            flow = entry.flow.as_str(),
            status = entry.status.as_str(),
            "Cash entry posted"
        );
        Ok(PostingOutcome::Cash(entry))
    }

    /// Removes every cash and card entry the owner produced.
    ///
    /// Card invoices are reconciled after the card entries are gone.
    pub async fn unpost<S: LedgerStore>(
        store: &mut S,
        calendar: &ReferenceCalendar,
        owner: PostingOwner,
    ) -> Result<(), EngineError> {
        if let Some(origin) = owner.origin() {
            for entry in store.ledger_entries_by_origin(&origin).await? {
                store.delete_ledger_entry(entry.id).await?;
                debug!(entry_id = %entry.id, origin = %origin, "Cash entry reversed");
            }
        }
        if let Some(source) = owner.card_source() {
            CardLedgerWriter::remove(store, calendar, &source).await?;
        }
        Ok(())
    }
}

fn cash_entry(calendar: &ReferenceCalendar, request: PostingRequest) -> LedgerEntry {
    let payment = &request.payment;
    let first_due = payment
        .first_due_date
        .unwrap_or_else(|| calendar.day_of(request.competence_at));

    let (status, paid_at, installment_plan) = if payment.installments > 1 {
        let plan = installment_plan(request.amount, payment.installments, first_due);
        (EntryStatus::Pending, None, Some(plan))
    } else if payment.paid {
        (EntryStatus::Paid, Some(request.competence_at), None)
    } else {
        (EntryStatus::Pending, None, None)
    };

    LedgerEntry {
        id: LedgerEntryId::new(),
        description: request.description,
        amount: request.amount,
        flow: request.flow,
        category: request.category,
        status,
        competence_at: request.competence_at,
        due_date: first_due,
        paid_at,
        origin: request.owner.origin(),
        account_id: Some(payment.account_id),
        instrument_id: Some(payment.instrument_id),
        installment_plan,
        is_consolidated_invoice: false,
    }
}

/// Monthly pending parcels of `amount / count` starting at `first_due`.
fn installment_plan(amount: Decimal, count: u32, first_due: NaiveDate) -> InstallmentPlan {
    let parcel = amount / Decimal::from(count);
    InstallmentPlan {
        installments: (0..count)
            .map(|offset| Installment {
                number: offset + 1,
                due_date: add_months(first_due, offset),
                amount: parcel,
                status: EntryStatus::Pending,
                paid_at: None,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::OriginRef;
    use crate::memory::{MemoryUnitOfWork, fixtures};
    use crate::store::UnitOfWork;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use storeledger_shared::types::{ManualGroupId, PurchaseOrderId, SaleId, TenantId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(
        amount: Decimal,
        payment: PaymentSelection,
        flow: Flow,
        owner: PostingOwner,
    ) -> PostingRequest {
        PostingRequest {
            description: "Stock purchase".to_string(),
            amount,
            category: "purchase".to_string(),
            flow,
            payment,
            competence_at: Utc.with_ymd_and_hms(2026, 3, 15, 15, 0, 0).unwrap(),
            owner,
        }
    }

    fn payment(
        fixture: &fixtures::Directory,
        instrument_id: InstrumentId,
        installments: u32,
    ) -> PaymentSelection {
        PaymentSelection {
            account_id: fixture.account_id,
            instrument_id,
            installments,
            first_due_date: None,
            paid: false,
        }
    }

    #[tokio::test]
    async fn test_credit_routes_to_card_ledger() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();
        let owner = PostingOwner::Purchase(PurchaseOrderId::new());

        let mut store = uow.begin(tenant).await.unwrap();
        let outcome = PostingRouter::post(
            &mut store,
            &calendar,
            request(dec!(300), payment(&fixture, fixture.credit_id, 3), Flow::Expense, owner),
        )
        .await
        .unwrap();

        let PostingOutcome::Card(entries) = outcome else {
            panic!("expected card posting");
        };
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].source, owner.card_source().unwrap());
        // Only consolidated invoices land on the cash ledger.
        let origin = owner.origin().unwrap();
        assert!(store.ledger_entries_by_origin(&origin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_boleto_installments_become_a_plan() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();
        let owner = PostingOwner::Purchase(PurchaseOrderId::new());

        let mut selection = payment(&fixture, fixture.boleto_id, 3);
        selection.first_due_date = Some(date(2026, 4, 10));

        let mut store = uow.begin(tenant).await.unwrap();
        let outcome = PostingRouter::post(
            &mut store,
            &calendar,
            request(dec!(900), selection, Flow::Expense, owner),
        )
        .await
        .unwrap();

        let PostingOutcome::Cash(entry) = outcome else {
            panic!("expected cash posting");
        };
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_eq!(entry.due_date, date(2026, 4, 10));
        let plan = entry.installment_plan.unwrap();
        let dues: Vec<_> = plan.installments.iter().map(|i| i.due_date).collect();
        assert_eq!(dues, vec![date(2026, 4, 10), date(2026, 5, 10), date(2026, 6, 10)]);
        assert!(plan.installments.iter().all(|i| i.amount == dec!(300)));
        assert_eq!(plan.total(), dec!(900));
    }

    #[tokio::test]
    async fn test_single_paid_cash_entry() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();
        let sale = SaleId::new();

        let mut selection = payment(&fixture, fixture.pix_id, 1);
        selection.paid = true;

        let mut store = uow.begin(tenant).await.unwrap();
        let outcome = PostingRouter::post(
            &mut store,
            &calendar,
            request(dec!(50), selection, Flow::Income, PostingOwner::Sale(sale)),
        )
        .await
        .unwrap();

        let PostingOutcome::Cash(entry) = outcome else {
            panic!("expected cash posting");
        };
        assert_eq!(entry.status, EntryStatus::Paid);
        assert_eq!(entry.paid_at, Some(entry.competence_at));
        assert_eq!(entry.due_date, date(2026, 3, 15));
        assert_eq!(entry.origin, Some(OriginRef::Sale(sale)));
        assert_eq!(entry.signed_amount(), dec!(50));
    }

    #[tokio::test]
    async fn test_sale_on_credit_rejected() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut store = uow.begin(tenant).await.unwrap();
        let err = PostingRouter::post(
            &mut store,
            &calendar,
            request(
                dec!(50),
                payment(&fixture, fixture.credit_id, 1),
                Flow::Income,
                PostingOwner::Sale(SaleId::new()),
            ),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_account_is_not_found() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();

        let mut selection = payment(&fixture, fixture.pix_id, 1);
        selection.account_id = FinancialAccountId::new();

        let mut store = uow.begin(tenant).await.unwrap();
        let err = PostingRouter::post(
            &mut store,
            &calendar,
            request(dec!(10), selection, Flow::Expense, PostingOwner::Manual(ManualGroupId::new())),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_code(), "ACCOUNT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_unpost_removes_cash_and_card() {
        let uow = MemoryUnitOfWork::new();
        let tenant = TenantId::new();
        let fixture = fixtures::directory(&uow, tenant).await;
        let calendar = ReferenceCalendar::default();
        let owner = PostingOwner::Purchase(PurchaseOrderId::new());

        let mut store = uow.begin(tenant).await.unwrap();
        PostingRouter::post(
            &mut store,
            &calendar,
            request(dec!(120), payment(&fixture, fixture.credit_id, 2), Flow::Expense, owner),
        )
        .await
        .unwrap();
        PostingRouter::post(
            &mut store,
            &calendar,
            request(dec!(30), payment(&fixture, fixture.pix_id, 1), Flow::Expense, owner),
        )
        .await
        .unwrap();

        PostingRouter::unpost(&mut store, &calendar, owner).await.unwrap();
        store.commit().await.unwrap();

        let book = uow.snapshot(tenant).await;
        assert!(book.card_entries.is_empty());
        assert!(book.ledger_entries.is_empty());
    }
}
