//! Service orders.
//!
//! Completing a service order consumes its parts, books the revenue and,
//! when the service had a paid cost, books that cost. Reopening reverses all
//! three.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::{
    CustomerId, EcommerceOrderId, FinancialAccountId, InstrumentId, LedgerEntryId, ServiceOrderId,
    StockItemId,
};
use tracing::debug;

use super::stock::{StockDemand, restore_stock, take_stock};
use crate::calendar::ReferenceCalendar;
use crate::error::{DocumentKind, EngineError};
use crate::ledger::posting::{PaymentSelection, PostingRequest, PostingRouter};
use crate::ledger::types::{EntryStatus, Flow, LedgerEntry, OriginRef, PostingOwner};
use crate::store::LedgerStore;

/// Category of service revenue.
pub const SERVICE_REVENUE_CATEGORY: &str = "service_revenue";

/// Category of service costs.
pub const SERVICE_COST_CATEGORY: &str = "service_cost";

/// Service order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceOrderStatus {
    /// Opened, not started.
    Pending,
    /// Work started.
    InProgress,
    /// Delivered; parts consumed and revenue booked.
    Completed,
    /// Called off.
    Cancelled,
}

impl ServiceOrderStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ServiceOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceOrderStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(EngineError::UnknownStatus {
                document: DocumentKind::ServiceOrder,
                status: s.to_string(),
            }),
        }
    }
}

/// Side effects of a service order transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStep {
    /// Status change only.
    Move,
    /// Consume parts and book revenue and cost.
    Complete,
    /// Exact inverse of `Complete`.
    Reopen,
}

/// Resolves a status change. `None` means the order is already there.
pub fn step(
    from: ServiceOrderStatus,
    to: ServiceOrderStatus,
) -> Result<Option<ServiceStep>, EngineError> {
    use ServiceOrderStatus::{Cancelled, Completed, InProgress, Pending};

    match (from, to) {
        _ if from == to => Ok(None),
        (Pending, InProgress)
        | (InProgress, Pending)
        | (Pending | InProgress, Cancelled)
        | (Cancelled, Pending) => Ok(Some(ServiceStep::Move)),
        (Pending | InProgress, Completed) => Ok(Some(ServiceStep::Complete)),
        (Completed, InProgress) => Ok(Some(ServiceStep::Reopen)),
        _ => Err(EngineError::InvalidTransition {
            document: DocumentKind::ServiceOrder,
            from: from.as_str(),
            to: to.as_str(),
        }),
    }
}

/// A part consumed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePart {
    /// Stock item.
    pub item_id: StockItemId,
    /// Description.
    pub description: String,
    /// Quantity.
    pub quantity: Decimal,
}

/// Where the service revenue is received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptSelection {
    /// Receiving account.
    pub account_id: FinancialAccountId,
    /// Receiving instrument; its rules decide fee and settlement delay.
    pub instrument_id: InstrumentId,
    /// Installments the customer pays in.
    #[serde(default = "default_installments")]
    pub installments: u32,
}

fn default_installments() -> u32 {
    1
}

/// Editable content of a service order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOrderDraft {
    /// What is done.
    pub description: String,
    /// Customer name.
    #[serde(default)]
    pub customer_name: String,
    /// Customer record, when known.
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    /// Parts taken from stock on completion.
    #[serde(default)]
    pub parts: Vec<ServicePart>,
    /// Price charged to the customer.
    pub price: Decimal,
    /// Cost of providing the service.
    #[serde(default)]
    pub cost: Decimal,
    /// Where revenue is received; revenue is paid on completion when absent.
    #[serde(default)]
    pub receipt: Option<ReceiptSelection>,
    /// How the cost is paid; no cost is booked when absent.
    #[serde(default)]
    pub cost_payment: Option<PaymentSelection>,
}

impl ServiceOrderDraft {
    /// Validates the draft.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.description.trim().is_empty() {
            return Err(EngineError::Validation("description is required".to_string()));
        }
        if self.price < Decimal::ZERO || self.cost < Decimal::ZERO {
            return Err(EngineError::Validation(
                "price and cost cannot be negative".to_string(),
            ));
        }
        for (index, part) in self.parts.iter().enumerate() {
            if part.quantity <= Decimal::ZERO {
                return Err(EngineError::Validation(format!(
                    "part {} quantity must be positive",
                    index + 1
                )));
            }
        }
        if let Some(receipt) = &self.receipt
            && receipt.installments == 0
        {
            return Err(EngineError::Validation(
                "installment count must be at least 1".to_string(),
            ));
        }
        if let Some(payment) = &self.cost_payment {
            payment.validate()?;
        }
        Ok(())
    }
}

/// A service order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOrder {
    /// Order id.
    pub id: ServiceOrderId,
    /// Status.
    pub status: ServiceOrderStatus,
    /// Content.
    #[serde(flatten)]
    pub draft: ServiceOrderDraft,
    /// E-commerce order whose delivery generated this order.
    pub origin_order_id: Option<EcommerceOrderId>,
    /// Opening time.
    pub opened_at: DateTime<Utc>,
    /// Time the order was last completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ServiceOrder {
    /// Creates a pending order.
    pub fn new(draft: ServiceOrderDraft, opened_at: DateTime<Utc>) -> Result<Self, EngineError> {
        draft.validate()?;
        Ok(Self {
            id: ServiceOrderId::new(),
            status: ServiceOrderStatus::Pending,
            draft,
            origin_order_id: None,
            opened_at,
            completed_at: None,
        })
    }

    fn demands(&self) -> Vec<StockDemand<'_>> {
        self.draft
            .parts
            .iter()
            .enumerate()
            .map(|(index, part)| StockDemand {
                line: index + 1,
                item_id: part.item_id,
                description: &part.description,
                quantity: part.quantity,
            })
            .collect()
    }
}

async fn load<S: LedgerStore>(store: &mut S, id: ServiceOrderId) -> Result<ServiceOrder, EngineError> {
    store
        .service_order_for_update(id)
        .await?
        .ok_or(EngineError::DocumentNotFound {
            document: DocumentKind::ServiceOrder,
            id: id.into_inner(),
        })
}

/// Stores a new pending order.
pub async fn create<S: LedgerStore>(
    store: &mut S,
    draft: ServiceOrderDraft,
    now: DateTime<Utc>,
) -> Result<ServiceOrder, EngineError> {
    let order = ServiceOrder::new(draft, now)?;
    store.insert_service_order(&order).await?;
    Ok(order)
}

/// Moves an order to `to`, applying or reversing its effects.
pub async fn transition<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    id: ServiceOrderId,
    to: ServiceOrderStatus,
    now: DateTime<Utc>,
) -> Result<ServiceOrder, EngineError> {
    let mut order = load(store, id).await?;
    let Some(step) = step(order.status, to)? else {
        return Ok(order);
    };

    match step {
        ServiceStep::Complete => {
            apply_effects(store, calendar, &order, now).await?;
            order.completed_at = Some(now);
        }
        ServiceStep::Reopen => {
            reverse_effects(store, calendar, &order).await?;
            order.completed_at = None;
        }
        ServiceStep::Move => {}
    }

    order.status = to;
    store.save_service_order(&order).await?;
    Ok(order)
}

/// Deletes an order, reversing it first when completed.
pub async fn delete<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    id: ServiceOrderId,
) -> Result<(), EngineError> {
    let order = load(store, id).await?;
    if order.status == ServiceOrderStatus::Completed {
        reverse_effects(store, calendar, &order).await?;
    }
    store.delete_service_order(id).await?;
    Ok(())
}

async fn apply_effects<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    order: &ServiceOrder,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    take_stock(store, &order.demands(), now).await?;

    if order.draft.price > Decimal::ZERO {
        let revenue = revenue_entry(store, calendar, order, now).await?;
        store.insert_ledger_entry(&revenue).await?;
        debug!(service_order_id = %order.id, amount = %revenue.amount, "Service revenue booked");
    }

    if let Some(payment) = &order.draft.cost_payment
        && order.draft.cost > Decimal::ZERO
    {
        let request = PostingRequest {
            description: format!("Service cost: {}", order.draft.description),
            amount: order.draft.cost,
            category: SERVICE_COST_CATEGORY.to_string(),
            flow: Flow::Expense,
            payment: payment.clone(),
            competence_at: now,
            owner: PostingOwner::ServiceOrder(order.id),
        };
        PostingRouter::post(store, calendar, request).await?;
    }
    Ok(())
}

async fn reverse_effects<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    order: &ServiceOrder,
) -> Result<(), EngineError> {
    restore_stock(store, &order.demands()).await?;
    PostingRouter::unpost(store, calendar, PostingOwner::ServiceOrder(order.id)).await
}

/// Revenue entry, net of the receiving instrument's fee.
///
/// Settled at once when there is no receiving instrument or it pays out the
/// same day; otherwise pending until `days_to_receive` later.
async fn revenue_entry<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    order: &ServiceOrder,
    now: DateTime<Utc>,
) -> Result<LedgerEntry, EngineError> {
    let today = calendar.day_of(now);
    let gross = order.draft.price;

    let (amount, due_date, account_id, instrument_id) = match &order.draft.receipt {
        None => (gross, today, None, None),
        Some(receipt) => {
            let account = store
                .financial_account(receipt.account_id)
                .await?
                .ok_or(EngineError::AccountNotFound(receipt.account_id))?;
            let instrument = account.instrument(receipt.instrument_id)?;
            let rules = instrument.receiving_rules().ok_or_else(|| {
                EngineError::Validation(format!(
                    "instrument {} cannot receive payments",
                    instrument.name
                ))
            })?;

            let amount = if rules.applies_to(receipt.installments) {
                rules.net_amount(gross)
            } else {
                gross
            };
            let due_date = today
                .checked_add_days(Days::new(u64::from(rules.days_to_receive)))
                .unwrap_or(today);
            (amount, due_date, Some(receipt.account_id), Some(receipt.instrument_id))
        }
    };

    let settled = due_date == today;
    Ok(LedgerEntry {
        id: LedgerEntryId::new(),
        description: format!("Service: {}", order.draft.description),
        amount,
        flow: Flow::Income,
        category: SERVICE_REVENUE_CATEGORY.to_string(),
        status: if settled {
            EntryStatus::Paid
        } else {
            EntryStatus::Pending
        },
        competence_at: now,
        due_date,
        paid_at: settled.then_some(now),
        origin: Some(OriginRef::ServiceOrder(order.id)),
        account_id,
        instrument_id,
        installment_plan: None,
        is_consolidated_invoice: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ServiceOrderStatus::{Cancelled, Completed, InProgress, Pending};

    #[rstest]
    #[case(Pending, InProgress, Some(ServiceStep::Move))]
    #[case(InProgress, Pending, Some(ServiceStep::Move))]
    #[case(Pending, Completed, Some(ServiceStep::Complete))]
    #[case(InProgress, Completed, Some(ServiceStep::Complete))]
    #[case(Completed, InProgress, Some(ServiceStep::Reopen))]
    #[case(InProgress, Cancelled, Some(ServiceStep::Move))]
    #[case(Cancelled, Pending, Some(ServiceStep::Move))]
    #[case(Completed, Completed, None)]
    fn test_allowed_steps(
        #[case] from: ServiceOrderStatus,
        #[case] to: ServiceOrderStatus,
        #[case] expected: Option<ServiceStep>,
    ) {
        assert_eq!(step(from, to).unwrap(), expected);
    }

    #[rstest]
    #[case(Completed, Pending)]
    #[case(Completed, Cancelled)]
    #[case(Cancelled, Completed)]
    #[case(Cancelled, InProgress)]
    fn test_rejected_steps(#[case] from: ServiceOrderStatus, #[case] to: ServiceOrderStatus) {
        assert!(step(from, to).is_err());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("in_progress".parse::<ServiceOrderStatus>().unwrap(), InProgress);
        assert!("done".parse::<ServiceOrderStatus>().is_err());
    }
}
