//! Weighted-average cost calculations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quantity and unit cost of one purchase line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostLine {
    /// Purchased quantity.
    pub quantity: Decimal,
    /// Declared unit cost.
    pub unit_cost: Decimal,
}

impl CostLine {
    /// Declared line value.
    #[must_use]
    pub fn line_cost(&self) -> Decimal {
        self.quantity * self.unit_cost
    }
}

/// Final unit cost of every line of a purchase once shared costs are spread.
///
/// Freight and other costs are split across lines in proportion to each
/// line's declared value, then divided by the line quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseCostBasis {
    unit_costs: Vec<Decimal>,
}

impl PurchaseCostBasis {
    /// Computes the surcharged unit cost of each line.
    #[must_use]
    pub fn from_lines(lines: &[CostLine], freight: Decimal, other_costs: Decimal) -> Self {
        let total: Decimal = lines.iter().map(CostLine::line_cost).sum();
        let additional = freight + other_costs;

        let unit_costs = lines
            .iter()
            .map(|line| line.unit_cost + surcharge(line, total, additional))
            .collect();

        Self { unit_costs }
    }

    /// Final unit cost of line `index`.
    #[must_use]
    pub fn unit_cost(&self, index: usize) -> Option<Decimal> {
        self.unit_costs.get(index).copied()
    }

    /// Final unit costs in line order.
    #[must_use]
    pub fn unit_costs(&self) -> &[Decimal] {
        &self.unit_costs
    }
}

fn surcharge(line: &CostLine, total: Decimal, additional: Decimal) -> Decimal {
    if total.is_zero() || line.quantity.is_zero() || additional.is_zero() {
        return Decimal::ZERO;
    }
    line.line_cost() / total * additional / line.quantity
}

/// Quantity on hand and average unit cost of a stock item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockPosition {
    /// Quantity on hand.
    pub quantity: Decimal,
    /// Average unit cost.
    pub average_cost: Decimal,
}

impl StockPosition {
    /// Creates a position.
    #[must_use]
    pub const fn new(quantity: Decimal, average_cost: Decimal) -> Self {
        Self {
            quantity,
            average_cost,
        }
    }

    /// Stock value at average cost.
    #[must_use]
    pub fn total_value(&self) -> Decimal {
        self.quantity * self.average_cost
    }

    /// Adds `quantity` units bought at `unit_cost`.
    #[must_use]
    pub fn apply(self, quantity: Decimal, unit_cost: Decimal) -> Self {
        let new_quantity = self.quantity + quantity;
        let average_cost = if self.quantity.is_zero() || new_quantity.is_zero() {
            unit_cost
        } else {
            (self.total_value() + quantity * unit_cost) / new_quantity
        };
        Self::new(new_quantity, average_cost)
    }

    /// Removes `quantity` units previously added at `unit_cost`.
    ///
    /// An empty (or negative) remainder has no meaningful cost and gets zero.
    /// So does a remainder whose value would turn negative, which happens
    /// when units were sold off between the purchase and its reversal.
    #[must_use]
    pub fn reverse(self, quantity: Decimal, unit_cost: Decimal) -> Self {
        let remaining_quantity = self.quantity - quantity;
        if remaining_quantity <= Decimal::ZERO {
            return Self::new(remaining_quantity, Decimal::ZERO);
        }
        let remaining_value = self.total_value() - quantity * unit_cost;
        if remaining_value <= Decimal::ZERO {
            return Self::new(remaining_quantity, Decimal::ZERO);
        }
        Self::new(remaining_quantity, remaining_value / remaining_quantity)
    }
}
