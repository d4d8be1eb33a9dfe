//! E-commerce orders.
//!
//! `PENDING -> SENT -> DELIVERED`, with each step reversible. Sending takes
//! the products from stock. Delivering books the product sale and opens one
//! pending service order per service line; service revenue waits for those
//! orders to complete.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::{EcommerceOrderId, FinancialAccountId, LedgerEntryId, SaleId, StockItemId};
use tracing::debug;

use super::service_order::{ServiceOrder, ServiceOrderDraft, ServiceOrderStatus};
use super::stock::{StockDemand, restore_stock, take_stock};
use super::types::{ItemKind, Sale, SaleLine, normalize_phone};
use crate::calendar::ReferenceCalendar;
use crate::error::{DocumentKind, EngineError};
use crate::ledger::posting::PostingRouter;
use crate::ledger::types::{EntryStatus, Flow, LedgerEntry, OriginRef, PostingOwner};
use crate::store::LedgerStore;

/// Category of product sales.
pub const SALE_CATEGORY: &str = "sale";

/// E-commerce order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EcommerceStatus {
    /// Placed, nothing shipped.
    Pending,
    /// Shipped; products left the stock.
    Sent,
    /// Received by the customer; sale booked.
    Delivered,
}

impl EcommerceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Delivered => "DELIVERED",
        }
    }
}

impl fmt::Display for EcommerceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EcommerceStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "SENT" => Ok(Self::Sent),
            "DELIVERED" => Ok(Self::Delivered),
            _ => Err(EngineError::UnknownStatus {
                document: DocumentKind::EcommerceOrder,
                status: s.to_string(),
            }),
        }
    }
}

/// Side effects of an e-commerce transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcommerceStep {
    /// PENDING to SENT.
    Ship,
    /// SENT to PENDING.
    Unship,
    /// SENT to DELIVERED.
    Deliver,
    /// DELIVERED to SENT.
    Undeliver,
}

/// Resolves a status change. `None` means the order is already there.
pub fn step(from: EcommerceStatus, to: EcommerceStatus) -> Result<Option<EcommerceStep>, EngineError> {
    use EcommerceStatus::{Delivered, Pending, Sent};

    match (from, to) {
        _ if from == to => Ok(None),
        (Pending, Sent) => Ok(Some(EcommerceStep::Ship)),
        (Sent, Pending) => Ok(Some(EcommerceStep::Unship)),
        (Sent, Delivered) => Ok(Some(EcommerceStep::Deliver)),
        (Delivered, Sent) => Ok(Some(EcommerceStep::Undeliver)),
        _ => Err(EngineError::InvalidTransition {
            document: DocumentKind::EcommerceOrder,
            from: from.as_str(),
            to: to.as_str(),
        }),
    }
}

/// One ordered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Catalog item.
    pub item_id: StockItemId,
    /// Description.
    pub description: String,
    /// Product or service.
    pub kind: ItemKind,
    /// Quantity.
    pub quantity: Decimal,
    /// Unit price.
    pub unit_price: Decimal,
}

impl OrderLine {
    /// Line total.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Content of a new e-commerce order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcommerceDraft {
    /// Customer name.
    pub customer_name: String,
    /// Customer phone, any format.
    pub customer_phone: String,
    /// Lines.
    pub lines: Vec<OrderLine>,
    /// Account receiving the product revenue.
    #[serde(default)]
    pub account_id: Option<FinancialAccountId>,
}

impl EcommerceDraft {
    /// Validates the draft.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.customer_name.trim().is_empty() {
            return Err(EngineError::Validation("customer name is required".to_string()));
        }
        normalize_phone(&self.customer_phone)?;
        if self.lines.is_empty() {
            return Err(EngineError::Validation(
                "an order needs at least one line".to_string(),
            ));
        }
        for (index, line) in self.lines.iter().enumerate() {
            if line.description.trim().is_empty() {
                return Err(EngineError::Validation(format!(
                    "line {} description is required",
                    index + 1
                )));
            }
            if line.quantity <= Decimal::ZERO {
                return Err(EngineError::Validation(format!(
                    "line {} quantity must be positive",
                    index + 1
                )));
            }
            if line.unit_price < Decimal::ZERO {
                return Err(EngineError::Validation(format!(
                    "line {} price cannot be negative",
                    index + 1
                )));
            }
        }
        Ok(())
    }
}

/// An e-commerce order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcommerceOrder {
    /// Order id.
    pub id: EcommerceOrderId,
    /// Status.
    pub status: EcommerceStatus,
    /// Content.
    #[serde(flatten)]
    pub draft: EcommerceDraft,
    /// Placement time.
    pub placed_at: DateTime<Utc>,
    /// Last shipping time.
    pub sent_at: Option<DateTime<Utc>>,
    /// Last delivery time.
    pub delivered_at: Option<DateTime<Utc>>,
}

impl EcommerceOrder {
    /// Creates a pending order.
    pub fn new(draft: EcommerceDraft, placed_at: DateTime<Utc>) -> Result<Self, EngineError> {
        draft.validate()?;
        Ok(Self {
            id: EcommerceOrderId::new(),
            status: EcommerceStatus::Pending,
            draft,
            placed_at,
            sent_at: None,
            delivered_at: None,
        })
    }

    fn lines_of(&self, kind: ItemKind) -> impl Iterator<Item = &OrderLine> {
        self.draft.lines.iter().filter(move |line| line.kind == kind)
    }

    fn product_demands(&self) -> Vec<StockDemand<'_>> {
        self.draft
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.kind == ItemKind::Product)
            .map(|(index, line)| StockDemand {
                line: index + 1,
                item_id: line.item_id,
                description: &line.description,
                quantity: line.quantity,
            })
            .collect()
    }
}

async fn load<S: LedgerStore>(
    store: &mut S,
    id: EcommerceOrderId,
) -> Result<EcommerceOrder, EngineError> {
    store
        .ecommerce_order_for_update(id)
        .await?
        .ok_or(EngineError::DocumentNotFound {
            document: DocumentKind::EcommerceOrder,
            id: id.into_inner(),
        })
}

/// Stores a new pending order.
pub async fn create<S: LedgerStore>(
    store: &mut S,
    draft: EcommerceDraft,
    now: DateTime<Utc>,
) -> Result<EcommerceOrder, EngineError> {
    let order = EcommerceOrder::new(draft, now)?;
    store.insert_ecommerce_order(&order).await?;
    Ok(order)
}

/// Moves an order to `to`, applying or reversing its effects.
pub async fn transition<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    id: EcommerceOrderId,
    to: EcommerceStatus,
    now: DateTime<Utc>,
) -> Result<EcommerceOrder, EngineError> {
    let mut order = load(store, id).await?;
    let Some(step) = step(order.status, to)? else {
        return Ok(order);
    };

    match step {
        EcommerceStep::Ship => {
            take_stock(store, &order.product_demands(), now).await?;
            order.sent_at = Some(now);
        }
        EcommerceStep::Unship => {
            restore_stock(store, &order.product_demands()).await?;
            order.sent_at = None;
        }
        EcommerceStep::Deliver => {
            deliver(store, calendar, &order, now).await?;
            order.delivered_at = Some(now);
        }
        EcommerceStep::Undeliver => {
            undeliver(store, calendar, &order).await?;
            order.delivered_at = None;
        }
    }

    order.status = to;
    store.save_ecommerce_order(&order).await?;
    debug!(order_id = %order.id, status = %order.status, "E-commerce order moved");
    Ok(order)
}

/// Deletes an order after walking it back to PENDING.
pub async fn delete<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    id: EcommerceOrderId,
) -> Result<(), EngineError> {
    let order = load(store, id).await?;
    if order.status == EcommerceStatus::Delivered {
        undeliver(store, calendar, &order).await?;
    }
    if matches!(order.status, EcommerceStatus::Delivered | EcommerceStatus::Sent) {
        restore_stock(store, &order.product_demands()).await?;
    }
    store.delete_ecommerce_order(id).await?;
    Ok(())
}

async fn deliver<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    order: &EcommerceOrder,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let phone = normalize_phone(&order.draft.customer_phone)?;
    let customer = store
        .find_or_create_customer(&phone, &order.draft.customer_name)
        .await?;

    let lines: Vec<SaleLine> = order
        .lines_of(ItemKind::Product)
        .map(|line| SaleLine {
            item_id: line.item_id,
            description: line.description.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        })
        .collect();

    if !lines.is_empty() {
        let sale = Sale {
            id: SaleId::new(),
            order_id: order.id,
            customer_id: customer.id,
            total: lines.iter().map(SaleLine::total).sum(),
            lines,
            sold_at: now,
        };
        store.insert_sale(&sale).await?;

        if sale.total > Decimal::ZERO {
            let income = LedgerEntry {
                id: LedgerEntryId::new(),
                description: format!("Sale to {}", order.draft.customer_name),
                amount: sale.total,
                flow: Flow::Income,
                category: SALE_CATEGORY.to_string(),
                status: EntryStatus::Paid,
                competence_at: now,
                due_date: calendar.day_of(now),
                paid_at: Some(now),
                origin: Some(OriginRef::Sale(sale.id)),
                account_id: order.draft.account_id,
                instrument_id: None,
                installment_plan: None,
                is_consolidated_invoice: false,
            };
            store.insert_ledger_entry(&income).await?;
        }
        debug!(order_id = %order.id, sale_id = %sale.id, total = %sale.total, "Sale booked");
    }

    for line in order.lines_of(ItemKind::Service) {
        let cost = match store.stock_item(line.item_id).await? {
            Some(item) => item.average_cost * line.quantity,
            None => Decimal::ZERO,
        };
        let draft = ServiceOrderDraft {
            description: line.description.clone(),
            customer_name: order.draft.customer_name.clone(),
            customer_id: Some(customer.id),
            parts: Vec::new(),
            price: line.total(),
            cost,
            receipt: None,
            cost_payment: None,
        };
        let mut service_order = ServiceOrder::new(draft, now)?;
        service_order.origin_order_id = Some(order.id);
        store.insert_service_order(&service_order).await?;
        debug!(order_id = %order.id, service_order_id = %service_order.id, "Service order generated");
    }
    Ok(())
}

async fn undeliver<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    order: &EcommerceOrder,
) -> Result<(), EngineError> {
    for service_order in store.service_orders_by_origin_order(order.id).await? {
        if service_order.status != ServiceOrderStatus::Pending {
            return Err(EngineError::GeneratedServiceOrderAdvanced(service_order.id));
        }
        PostingRouter::unpost(store, calendar, PostingOwner::ServiceOrder(service_order.id)).await?;
        store.delete_service_order(service_order.id).await?;
    }

    if let Some(sale) = store.sale_by_order(order.id).await? {
        PostingRouter::unpost(store, calendar, PostingOwner::Sale(sale.id)).await?;
        store.delete_sale(sale.id).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use EcommerceStatus::{Delivered, Pending, Sent};

    #[rstest]
    #[case(Pending, Sent, Some(EcommerceStep::Ship))]
    #[case(Sent, Pending, Some(EcommerceStep::Unship))]
    #[case(Sent, Delivered, Some(EcommerceStep::Deliver))]
    #[case(Delivered, Sent, Some(EcommerceStep::Undeliver))]
    #[case(Sent, Sent, None)]
    fn test_allowed_steps(
        #[case] from: EcommerceStatus,
        #[case] to: EcommerceStatus,
        #[case] expected: Option<EcommerceStep>,
    ) {
        assert_eq!(step(from, to).unwrap(), expected);
    }

    #[rstest]
    #[case(Pending, Delivered)]
    #[case(Delivered, Pending)]
    fn test_skipping_a_step_is_rejected(#[case] from: EcommerceStatus, #[case] to: EcommerceStatus) {
        let err = step(from, to).unwrap_err();
        assert_eq!(err.http_status_code(), 409);
    }

    fn line(description: &str, kind: ItemKind) -> OrderLine {
        OrderLine {
            item_id: StockItemId::new(),
            description: description.to_string(),
            kind,
            quantity: Decimal::ONE,
            unit_price: Decimal::TEN,
        }
    }

    fn draft(lines: Vec<OrderLine>) -> EcommerceDraft {
        EcommerceDraft {
            customer_name: "Ana".to_string(),
            customer_phone: "11987654321".to_string(),
            lines,
            account_id: None,
        }
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_blank_line_description_is_rejected(#[case] description: &str) {
        let err = draft(vec![line("Cable", ItemKind::Product), line(description, ItemKind::Product)])
            .validate()
            .unwrap_err();
        assert_eq!(err.http_status_code(), 400);
        assert!(err.to_string().contains("line 2 description is required"));
    }

    #[test]
    fn test_product_demands_keep_document_line_numbers() {
        let order = EcommerceOrder::new(
            draft(vec![
                line("Installation", ItemKind::Service),
                line("Cable", ItemKind::Product),
                line("Support", ItemKind::Service),
                line("Plug", ItemKind::Product),
            ]),
            Utc::now(),
        )
        .unwrap();
        let lines: Vec<usize> = order.product_demands().iter().map(|demand| demand.line).collect();
        assert_eq!(lines, vec![2, 4]);
    }

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("sent".parse::<EcommerceStatus>().unwrap(), Sent);
        assert_eq!("DELIVERED".parse::<EcommerceStatus>().unwrap(), Delivered);
        assert!("LOST".parse::<EcommerceStatus>().is_err());
    }
}
