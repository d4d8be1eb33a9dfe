//! Catalog, customer and sale records touched by document transitions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storeledger_shared::types::{CustomerId, EcommerceOrderId, SaleId, StockItemId};

use crate::costing::StockPosition;
use crate::error::EngineError;

/// Whether a catalog item is a physical product or a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Physical product with stock.
    Product,
    /// Service; has no stock.
    Service,
}

impl ItemKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Service => "service",
        }
    }
}

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    /// Item id.
    pub id: StockItemId,
    /// Display name.
    pub name: String,
    /// Product or service.
    pub kind: ItemKind,
    /// Quantity on hand.
    pub quantity: Decimal,
    /// Weighted-average unit cost.
    pub average_cost: Decimal,
    /// Sale price.
    pub sale_price: Decimal,
    /// Last time units left the stock.
    pub last_sold_at: Option<DateTime<Utc>>,
}

impl StockItem {
    /// Quantity and cost as a costing position.
    #[must_use]
    pub fn position(&self) -> StockPosition {
        StockPosition::new(self.quantity, self.average_cost)
    }

    /// Replaces quantity and cost.
    pub fn set_position(&mut self, position: StockPosition) {
        self.quantity = position.quantity;
        self.average_cost = position.average_cost;
    }

    /// Whether the item tracks stock.
    #[must_use]
    pub fn is_stocked(&self) -> bool {
        self.kind == ItemKind::Product
    }
}

/// A customer, keyed by phone digits within the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer id.
    pub id: CustomerId,
    /// Name.
    pub name: String,
    /// Phone number, digits only.
    pub phone_digits: String,
}

/// Strips everything but digits from a phone number.
pub fn normalize_phone(phone: &str) -> Result<String, EngineError> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(EngineError::Validation(format!(
            "phone number '{phone}' has no digits"
        )));
    }
    Ok(digits)
}

/// One product line of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    /// Sold item.
    pub item_id: StockItemId,
    /// Description.
    pub description: String,
    /// Quantity.
    pub quantity: Decimal,
    /// Unit price.
    pub unit_price: Decimal,
}

impl SaleLine {
    /// Line total.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Sale record produced by delivering an e-commerce order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Sale id.
    pub id: SaleId,
    /// The delivered order.
    pub order_id: EcommerceOrderId,
    /// Buyer.
    pub customer_id: CustomerId,
    /// Product lines.
    pub lines: Vec<SaleLine>,
    /// Sum of line totals.
    pub total: Decimal,
    /// Delivery time.
    pub sold_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("+55 (11) 98765-4321", "5511987654321")]
    #[case("11987654321", "11987654321")]
    #[case(" 11 9 8765 4321 ", "11987654321")]
    fn test_normalize_phone(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_phone(raw).unwrap(), expected);
    }

    #[test]
    fn test_phone_without_digits_rejected() {
        let err = normalize_phone("n/a").unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
