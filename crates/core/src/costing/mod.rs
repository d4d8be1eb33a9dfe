//! Weighted-average inventory costing.
//!
//! Purchases blend their surcharged unit cost into a stock item's average
//! cost; reversing a purchase removes exactly the value it added.

pub mod weighted_average;

#[cfg(test)]
mod weighted_average_props;

pub use weighted_average::{CostLine, PurchaseCostBasis, StockPosition};
