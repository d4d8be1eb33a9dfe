//! Property-based tests for the billing-cycle calculator.
//!
//! - Closing-day boundary: competence on the closing day rolls to the next
//!   cycle, the day before never does
//! - Due dates are strictly increasing, one calendar month apart
//! - Every due date is a valid day no later than the configured due day

use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;

use super::cycle::BillingCycle;

/// Strategy for calendar days in 2020..2040.
fn any_date() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2040, 1u32..=12, 1u32..=31).prop_map(|(y, m, d)| {
        let first = NaiveDate::from_ymd_opt(y, m, 1).unwrap();
        crate::calendar::clamped_day(first, d)
    })
}

fn any_cycle() -> impl Strategy<Value = BillingCycle> {
    (1u32..=31, 1u32..=31).prop_map(|(closing, due)| BillingCycle::new(closing, due).unwrap())
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_closing_day_rolls_to_next_cycle(
        (y, m) in (2020i32..2040, 1u32..=12),
        closing in 2u32..=28,
        due in 1u32..=31,
    ) {
        let cycle = BillingCycle::new(closing, due).unwrap();
        let on_closing = NaiveDate::from_ymd_opt(y, m, closing).unwrap();
        let day_before = NaiveDate::from_ymd_opt(y, m, closing - 1).unwrap();

        prop_assert_eq!(months_between(on_closing, cycle.first_due_date(on_closing)), 2);
        prop_assert_eq!(months_between(day_before, cycle.first_due_date(day_before)), 1);
    }

    #[test]
    fn prop_due_dates_are_monthly(
        cycle in any_cycle(),
        competence in any_date(),
        installments in 1u32..=24,
    ) {
        let dates = cycle.due_dates(competence, installments);
        prop_assert_eq!(dates.len(), installments as usize);
        prop_assert_eq!(dates[0], cycle.first_due_date(competence));

        for pair in dates.windows(2) {
            prop_assert!(pair[0] < pair[1]);
            prop_assert_eq!(months_between(pair[0], pair[1]), 1);
        }
        for date in &dates {
            prop_assert!(date.day() <= cycle.due_day());
        }
    }

    #[test]
    fn prop_first_due_date_after_competence(
        cycle in any_cycle(),
        competence in any_date(),
    ) {
        let first = cycle.first_due_date(competence);
        prop_assert!(first > competence);
        prop_assert!((1..=2).contains(&months_between(competence, first)));
    }
}
