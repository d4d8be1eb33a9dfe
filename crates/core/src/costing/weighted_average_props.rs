//! Property-based tests for weighted-average costing.
//!
//! - Reverse after apply restores the prior quantity exactly and the prior
//!   cost up to decimal division precision
//! - Reversal never leaves a negative average cost, even after sales
//! - Spread shared costs add up to freight plus other costs

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::weighted_average::{CostLine, PurchaseCostBasis, StockPosition};

/// Strategy for money amounts (0.00 to 10,000.00).
fn money() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for strictly positive quantities (0.001 to 1,000.000).
fn quantity() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|milli| Decimal::new(milli, 3))
}

fn lines() -> impl Strategy<Value = Vec<CostLine>> {
    prop::collection::vec(
        (quantity(), money()).prop_map(|(quantity, unit_cost)| CostLine {
            quantity,
            unit_cost,
        }),
        1..6,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_reverse_undoes_apply(
        stock_quantity in quantity(),
        stock_cost in money(),
        lines in lines(),
        freight in money(),
        other in money(),
    ) {
        let basis = PurchaseCostBasis::from_lines(&lines, freight, other);
        let before = StockPosition::new(stock_quantity, stock_cost);

        for (line, unit_cost) in lines.iter().zip(basis.unit_costs()) {
            let restored = before
                .apply(line.quantity, *unit_cost)
                .reverse(line.quantity, *unit_cost);

            prop_assert_eq!(restored.quantity, before.quantity);
            prop_assert_eq!(restored.average_cost.round_dp(8), before.average_cost.round_dp(8));
        }
    }

    #[test]
    fn prop_reverse_on_empty_stock_leaves_it_empty(
        line_quantity in quantity(),
        unit_cost in money(),
    ) {
        let restored = StockPosition::default()
            .apply(line_quantity, unit_cost)
            .reverse(line_quantity, unit_cost);
        prop_assert_eq!(restored, StockPosition::default());
    }

    #[test]
    fn prop_reverse_after_sales_never_negative(
        stock_quantity in quantity(),
        stock_cost in money(),
        line_quantity in quantity(),
        unit_cost in money(),
        sold_percent in 0u32..=100u32,
    ) {
        let bought = StockPosition::new(stock_quantity, stock_cost).apply(line_quantity, unit_cost);
        let sold = bought.quantity * Decimal::from(sold_percent) / Decimal::ONE_HUNDRED;
        let after_sales = StockPosition::new(bought.quantity - sold, bought.average_cost);

        let restored = after_sales.reverse(line_quantity, unit_cost);
        prop_assert!(restored.average_cost >= Decimal::ZERO);
    }

    #[test]
    fn prop_surcharges_sum_to_shared_costs(
        lines in lines(),
        freight in money(),
        other in money(),
    ) {
        let total: Decimal = lines.iter().map(CostLine::line_cost).sum();
        prop_assume!(!total.is_zero());

        let basis = PurchaseCostBasis::from_lines(&lines, freight, other);
        let spread: Decimal = lines
            .iter()
            .zip(basis.unit_costs())
            .map(|(line, unit_cost)| (*unit_cost - line.unit_cost) * line.quantity)
            .sum();

        prop_assert_eq!(spread.round_dp(6), (freight + other).round_dp(6));
    }
}
