//! Purchase orders.
//!
//! Completing a purchase blends its lines into the weighted-average cost of
//! the stocked items and posts the expense. Every other transition either
//! reverses those effects exactly or touches nothing but the status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::{PurchaseOrderId, StockItemId};
use tracing::{debug, warn};

use crate::calendar::ReferenceCalendar;
use crate::costing::{CostLine, PurchaseCostBasis};
use crate::error::{DocumentKind, EngineError};
use crate::ledger::posting::{PaymentSelection, PostingRequest, PostingRouter};
use crate::ledger::types::{Flow, PostingOwner};
use crate::store::LedgerStore;

/// Category of purchase expenses.
pub const PURCHASE_CATEGORY: &str = "purchase";

/// Purchase order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Ordered, nothing received.
    Pending,
    /// Received; stock and ledger reflect it.
    Completed,
    /// Called off.
    Cancelled,
}

impl PurchaseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(EngineError::UnknownStatus {
                document: DocumentKind::PurchaseOrder,
                status: s.to_string(),
            }),
        }
    }
}

/// Side effects of a purchase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseStep {
    /// Pending to completed: apply costing and post.
    Complete,
    /// Completed to pending: reverse costing and unpost.
    Reopen,
    /// Pending to cancelled.
    Cancel,
    /// Cancelled to pending.
    Restore,
}

/// Resolves a status change. `None` means the order is already there.
pub fn step(from: PurchaseStatus, to: PurchaseStatus) -> Result<Option<PurchaseStep>, EngineError> {
    use PurchaseStatus::{Cancelled, Completed, Pending};

    match (from, to) {
        _ if from == to => Ok(None),
        (Pending, Completed) => Ok(Some(PurchaseStep::Complete)),
        (Completed, Pending) => Ok(Some(PurchaseStep::Reopen)),
        (Pending, Cancelled) => Ok(Some(PurchaseStep::Cancel)),
        (Cancelled, Pending) => Ok(Some(PurchaseStep::Restore)),
        _ => Err(EngineError::InvalidTransition {
            document: DocumentKind::PurchaseOrder,
            from: from.as_str(),
            to: to.as_str(),
        }),
    }
}

/// One purchased line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    /// Purchased item.
    pub item_id: StockItemId,
    /// Description.
    pub description: String,
    /// Quantity.
    pub quantity: Decimal,
    /// Declared unit cost.
    pub unit_cost: Decimal,
}

/// Editable content of a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDraft {
    /// Supplier name.
    pub supplier: String,
    /// Lines.
    pub lines: Vec<PurchaseLine>,
    /// Freight shared by all lines.
    #[serde(default)]
    pub freight: Decimal,
    /// Other costs shared by all lines.
    #[serde(default)]
    pub other_costs: Decimal,
    /// Payment terms of the expense.
    pub payment: PaymentSelection,
    /// Purchase time; competence of the expense.
    pub purchased_at: DateTime<Utc>,
}

impl PurchaseDraft {
    /// Validates the draft.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.supplier.trim().is_empty() {
            return Err(EngineError::Validation("supplier is required".to_string()));
        }
        if self.lines.is_empty() {
            return Err(EngineError::Validation(
                "a purchase needs at least one line".to_string(),
            ));
        }
        for (index, line) in self.lines.iter().enumerate() {
            if line.quantity <= Decimal::ZERO {
                return Err(EngineError::Validation(format!(
                    "line {} quantity must be positive",
                    index + 1
                )));
            }
            if line.unit_cost < Decimal::ZERO {
                return Err(EngineError::Validation(format!(
                    "line {} unit cost cannot be negative",
                    index + 1
                )));
            }
        }
        if self.freight < Decimal::ZERO || self.other_costs < Decimal::ZERO {
            return Err(EngineError::Validation(
                "freight and other costs cannot be negative".to_string(),
            ));
        }
        self.payment.validate()
    }
}

/// A purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    /// Order id.
    pub id: PurchaseOrderId,
    /// Status.
    pub status: PurchaseStatus,
    /// Content.
    #[serde(flatten)]
    pub draft: PurchaseDraft,
    /// Time the order was last completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl PurchaseOrder {
    /// Creates a pending order.
    pub fn new(draft: PurchaseDraft) -> Result<Self, EngineError> {
        draft.validate()?;
        Ok(Self {
            id: PurchaseOrderId::new(),
            status: PurchaseStatus::Pending,
            draft,
            completed_at: None,
        })
    }

    /// Line totals plus shared costs.
    #[must_use]
    pub fn total(&self) -> Decimal {
        let lines: Decimal = self
            .draft
            .lines
            .iter()
            .map(|line| line.quantity * line.unit_cost)
            .sum();
        lines + self.draft.freight + self.draft.other_costs
    }

    fn cost_basis(&self) -> PurchaseCostBasis {
        let lines: Vec<CostLine> = self
            .draft
            .lines
            .iter()
            .map(|line| CostLine {
                quantity: line.quantity,
                unit_cost: line.unit_cost,
            })
            .collect();
        PurchaseCostBasis::from_lines(&lines, self.draft.freight, self.draft.other_costs)
    }
}

async fn load<S: LedgerStore>(store: &mut S, id: PurchaseOrderId) -> Result<PurchaseOrder, EngineError> {
    store
        .purchase_order_for_update(id)
        .await?
        .ok_or(EngineError::DocumentNotFound {
            document: DocumentKind::PurchaseOrder,
            id: id.into_inner(),
        })
}

/// Stores a new pending order.
pub async fn create<S: LedgerStore>(
    store: &mut S,
    draft: PurchaseDraft,
) -> Result<PurchaseOrder, EngineError> {
    let order = PurchaseOrder::new(draft)?;
    store.insert_purchase_order(&order).await?;
    Ok(order)
}

/// Moves an order to `to`, applying or reversing its effects.
pub async fn transition<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    id: PurchaseOrderId,
    to: PurchaseStatus,
    now: DateTime<Utc>,
) -> Result<PurchaseOrder, EngineError> {
    let mut order = load(store, id).await?;
    let Some(step) = step(order.status, to)? else {
        return Ok(order);
    };

    match step {
        PurchaseStep::Complete => {
            apply_effects(store, calendar, &order).await?;
            order.completed_at = Some(now);
        }
        PurchaseStep::Reopen => {
            reverse_effects(store, calendar, &order).await?;
            order.completed_at = None;
        }
        PurchaseStep::Cancel | PurchaseStep::Restore => {}
    }

    order.status = to;
    store.save_purchase_order(&order).await?;
    Ok(order)
}

/// Replaces the content of an order.
///
/// A completed order is fully reversed using its stored content before the
/// new content is applied, so the ledger and stock never drift from it.
pub async fn update<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    id: PurchaseOrderId,
    draft: PurchaseDraft,
) -> Result<PurchaseOrder, EngineError> {
    draft.validate()?;
    let mut order = load(store, id).await?;

    if order.status == PurchaseStatus::Completed {
        reverse_effects(store, calendar, &order).await?;
        order.draft = draft;
        apply_effects(store, calendar, &order).await?;
    } else {
        order.draft = draft;
    }

    store.save_purchase_order(&order).await?;
    Ok(order)
}

/// Deletes an order, reversing it first when completed.
pub async fn delete<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    id: PurchaseOrderId,
) -> Result<(), EngineError> {
    let order = load(store, id).await?;
    if order.status == PurchaseStatus::Completed {
        reverse_effects(store, calendar, &order).await?;
    }
    store.delete_purchase_order(id).await?;
    Ok(())
}

async fn apply_effects<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    order: &PurchaseOrder,
) -> Result<(), EngineError> {
    let basis = order.cost_basis();
    for (line, unit_cost) in order.draft.lines.iter().zip(basis.unit_costs()) {
        let Some(mut item) = store.stock_item_for_update(line.item_id).await? else {
            warn!(purchase_id = %order.id, item_id = %line.item_id, "Stock item missing, costing skipped");
            continue;
        };
        if !item.is_stocked() {
            continue;
        }
        item.set_position(item.position().apply(line.quantity, *unit_cost));
        store.save_stock_item(&item).await?;
        debug!(item_id = %item.id, quantity = %item.quantity, average_cost = %item.average_cost, "Purchase costing applied");
    }

    let amount = order.total();
    if amount <= Decimal::ZERO {
        debug!(purchase_id = %order.id, "Free purchase, nothing posted");
        return Ok(());
    }
    let request = PostingRequest {
        description: format!("Purchase from {}", order.draft.supplier),
        amount,
        category: PURCHASE_CATEGORY.to_string(),
        flow: Flow::Expense,
        payment: order.draft.payment.clone(),
        competence_at: order.draft.purchased_at,
        owner: PostingOwner::Purchase(order.id),
    };
    PostingRouter::post(store, calendar, request).await?;
    Ok(())
}

async fn reverse_effects<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    order: &PurchaseOrder,
) -> Result<(), EngineError> {
    let basis = order.cost_basis();
    for (line, unit_cost) in order.draft.lines.iter().zip(basis.unit_costs()) {
        let Some(mut item) = store.stock_item_for_update(line.item_id).await? else {
            warn!(purchase_id = %order.id, item_id = %line.item_id, "Stock item missing, cost reversal skipped");
            continue;
        };
        if !item.is_stocked() {
            continue;
        }
        item.set_position(item.position().reverse(line.quantity, *unit_cost));
        store.save_stock_item(&item).await?;
        debug!(item_id = %item.id, quantity = %item.quantity, average_cost = %item.average_cost, "Purchase costing reversed");
    }

    PostingRouter::unpost(store, calendar, PostingOwner::Purchase(order.id)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PurchaseStatus::Pending, PurchaseStatus::Completed, Some(PurchaseStep::Complete))]
    #[case(PurchaseStatus::Completed, PurchaseStatus::Pending, Some(PurchaseStep::Reopen))]
    #[case(PurchaseStatus::Pending, PurchaseStatus::Cancelled, Some(PurchaseStep::Cancel))]
    #[case(PurchaseStatus::Cancelled, PurchaseStatus::Pending, Some(PurchaseStep::Restore))]
    #[case(PurchaseStatus::Completed, PurchaseStatus::Completed, None)]
    fn test_allowed_steps(
        #[case] from: PurchaseStatus,
        #[case] to: PurchaseStatus,
        #[case] expected: Option<PurchaseStep>,
    ) {
        assert_eq!(step(from, to).unwrap(), expected);
    }

    #[rstest]
    #[case(PurchaseStatus::Completed, PurchaseStatus::Cancelled)]
    #[case(PurchaseStatus::Cancelled, PurchaseStatus::Completed)]
    fn test_rejected_steps(#[case] from: PurchaseStatus, #[case] to: PurchaseStatus) {
        let err = step(from, to).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Completed".parse::<PurchaseStatus>().unwrap(), PurchaseStatus::Completed);
        let err = "shipped".parse::<PurchaseStatus>().unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_STATUS");
    }
}
