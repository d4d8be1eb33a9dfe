//! Cash and card ledger records.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::{
    CardEntryId, EcommerceOrderId, FinancialAccountId, InstrumentId, LedgerEntryId,
    ManualGroupId, PurchaseOrderId, SaleId, ServiceOrderId,
};
use uuid::Uuid;

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
}

impl Flow {
    /// Returns the string representation of the flow.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

/// Settlement status of a cash entry or parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Not settled yet.
    Pending,
    /// Settled.
    Paid,
}

impl EntryStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

/// Origin document a cash entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum OriginRef {
    /// A purchase order.
    Purchase(PurchaseOrderId),
    /// A service order.
    ServiceOrder(ServiceOrderId),
    /// An e-commerce order.
    EcommerceOrder(EcommerceOrderId),
    /// A sale record.
    Sale(SaleId),
}

impl OriginRef {
    /// Tag of the origin kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Purchase(_) => "purchase",
            Self::ServiceOrder(_) => "service_order",
            Self::EcommerceOrder(_) => "ecommerce_order",
            Self::Sale(_) => "sale",
        }
    }

    /// Raw id of the origin document.
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Purchase(id) => id.into_inner(),
            Self::ServiceOrder(id) => id.into_inner(),
            Self::EcommerceOrder(id) => id.into_inner(),
            Self::Sale(id) => id.into_inner(),
        }
    }
}

impl fmt::Display for OriginRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Spending event a card entry was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CardSource {
    /// Manual cost; the group ties the installment set together.
    Manual(ManualGroupId),
    /// A purchase order.
    Purchase(PurchaseOrderId),
    /// A service order.
    ServiceOrder(ServiceOrderId),
    /// An e-commerce order.
    EcommerceOrder(EcommerceOrderId),
}

impl CardSource {
    /// Whether an origin document owns the entry.
    #[must_use]
    pub fn is_owned_by_document(&self) -> bool {
        match self {
            Self::Manual(_) => false,
            Self::Purchase(_) | Self::ServiceOrder(_) | Self::EcommerceOrder(_) => true,
        }
    }

    /// Source tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Manual(_) => "manual",
            Self::Purchase(_) => "purchase",
            Self::ServiceOrder(_) => "service_order",
            Self::EcommerceOrder(_) => "ecommerce_order",
        }
    }

    /// Raw id of the group or document.
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Manual(id) => id.into_inner(),
            Self::Purchase(id) => id.into_inner(),
            Self::ServiceOrder(id) => id.into_inner(),
            Self::EcommerceOrder(id) => id.into_inner(),
        }
    }
}

impl fmt::Display for CardSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Owner of a posting; decides how its cash and card entries are tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingOwner {
    /// A purchase order.
    Purchase(PurchaseOrderId),
    /// A service order.
    ServiceOrder(ServiceOrderId),
    /// A sale record; never paid by card.
    Sale(SaleId),
    /// A manual cost.
    Manual(ManualGroupId),
}

impl PostingOwner {
    /// Origin link for cash entries; manual costs have none.
    #[must_use]
    pub fn origin(&self) -> Option<OriginRef> {
        match self {
            Self::Purchase(id) => Some(OriginRef::Purchase(*id)),
            Self::ServiceOrder(id) => Some(OriginRef::ServiceOrder(*id)),
            Self::Sale(id) => Some(OriginRef::Sale(*id)),
            Self::Manual(_) => None,
        }
    }

    /// Source tag for card entries; sales have none.
    #[must_use]
    pub fn card_source(&self) -> Option<CardSource> {
        match self {
            Self::Purchase(id) => Some(CardSource::Purchase(*id)),
            Self::ServiceOrder(id) => Some(CardSource::ServiceOrder(*id)),
            Self::Manual(id) => Some(CardSource::Manual(*id)),
            Self::Sale(_) => None,
        }
    }
}

/// One dated parcel of a split cash obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// 1-based parcel number.
    pub number: u32,
    /// Due date.
    pub due_date: NaiveDate,
    /// Parcel amount.
    pub amount: Decimal,
    /// Settlement status.
    pub status: EntryStatus,
    /// Payment time, set only when paid.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Parcels of a split cash obligation, ordered by number.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstallmentPlan {
    /// The parcels.
    pub installments: Vec<Installment>,
}

impl InstallmentPlan {
    /// Whether every parcel is paid.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.installments
            .iter()
            .all(|installment| installment.status == EntryStatus::Paid)
    }

    /// Sum of parcel amounts.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.installments.iter().map(|i| i.amount).sum()
    }
}

/// A cash ledger line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Entry id.
    pub id: LedgerEntryId,
    /// Description.
    pub description: String,
    /// Unsigned amount; the sign comes from `flow`.
    pub amount: Decimal,
    /// Direction.
    pub flow: Flow,
    /// Category.
    pub category: String,
    /// Settlement status.
    pub status: EntryStatus,
    /// Time the movement is economically attributed to.
    pub competence_at: DateTime<Utc>,
    /// Due date.
    pub due_date: NaiveDate,
    /// Payment time, set only when paid.
    pub paid_at: Option<DateTime<Utc>>,
    /// Owning document, if any.
    pub origin: Option<OriginRef>,
    /// Account the movement goes through.
    pub account_id: Option<FinancialAccountId>,
    /// Instrument the movement goes through.
    pub instrument_id: Option<InstrumentId>,
    /// Dated parcels, when the obligation is split.
    pub installment_plan: Option<InstallmentPlan>,
    /// Derived invoice total owned by invoice consolidation.
    pub is_consolidated_invoice: bool,
}

impl LedgerEntry {
    /// Amount signed by flow: income positive, expense negative.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.flow {
            Flow::Income => self.amount,
            Flow::Expense => -self.amount,
        }
    }

    /// Invoice key of a consolidated invoice.
    #[must_use]
    pub fn invoice_key(&self) -> Option<InvoiceKey> {
        if !self.is_consolidated_invoice {
            return None;
        }
        Some(InvoiceKey {
            account_id: self.account_id?,
            instrument_id: self.instrument_id?,
            due_day: self.due_date,
        })
    }
}

/// One installment of a card spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLedgerEntry {
    /// Entry id.
    pub id: CardEntryId,
    /// Description.
    pub description: String,
    /// Installment amount.
    pub amount: Decimal,
    /// Category.
    pub category: String,
    /// Time of the spend.
    pub competence_at: DateTime<Utc>,
    /// Invoice due date the installment falls into.
    pub due_date: NaiveDate,
    /// Account of the card.
    pub account_id: FinancialAccountId,
    /// The card.
    pub instrument_id: InstrumentId,
    /// 1-based installment number.
    pub installment: u32,
    /// Installment count of the spend.
    pub installment_count: u32,
    /// Spending event.
    pub source: CardSource,
}

impl CardLedgerEntry {
    /// Invoice this installment is billed on.
    #[must_use]
    pub fn invoice_key(&self) -> InvoiceKey {
        InvoiceKey {
            account_id: self.account_id,
            instrument_id: self.instrument_id,
            due_day: self.due_date,
        }
    }
}

/// Identity of a card invoice: one per account, card and due day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvoiceKey {
    /// Account of the card.
    pub account_id: FinancialAccountId,
    /// The card.
    pub instrument_id: InstrumentId,
    /// Invoice due day.
    pub due_day: NaiveDate,
}

impl fmt::Display for InvoiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@{}",
            self.account_id, self.instrument_id, self.due_day
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_tagging_is_exhaustive() {
        let group = ManualGroupId::new();
        let manual = PostingOwner::Manual(group);
        assert_eq!(manual.origin(), None);
        assert_eq!(manual.card_source(), Some(CardSource::Manual(group)));
        assert!(!CardSource::Manual(group).is_owned_by_document());

        let sale = SaleId::new();
        assert_eq!(PostingOwner::Sale(sale).card_source(), None);
        assert_eq!(PostingOwner::Sale(sale).origin(), Some(OriginRef::Sale(sale)));

        let purchase = PurchaseOrderId::new();
        let owner = PostingOwner::Purchase(purchase);
        assert!(owner.card_source().unwrap().is_owned_by_document());
        assert_eq!(owner.origin().unwrap().id(), purchase.into_inner());
    }

    #[test]
    fn test_origin_display() {
        let id = ServiceOrderId::new();
        assert_eq!(
            OriginRef::ServiceOrder(id).to_string(),
            format!("service_order {id}")
        );
    }
}
