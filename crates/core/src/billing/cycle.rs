//! Billing-cycle calculator.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::{add_months, clamped_day, first_of_month};
use crate::error::EngineError;

/// Closing and due day of a credit instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCycle {
    pub(crate) closing_day: u32,
    pub(crate) due_day: u32,
}

impl BillingCycle {
    /// Creates a cycle; both days must be in `1..=31`.
    pub fn new(closing_day: u32, due_day: u32) -> Result<Self, EngineError> {
        for (name, day) in [("closing", closing_day), ("due", due_day)] {
            if !(1..=31).contains(&day) {
                return Err(EngineError::Validation(format!(
                    "{name} day must be between 1 and 31, got {day}"
                )));
            }
        }
        Ok(Self {
            closing_day,
            due_day,
        })
    }

    /// Day of the month the invoice closes.
    #[must_use]
    pub const fn closing_day(&self) -> u32 {
        self.closing_day
    }

    /// Day of the month the invoice is due.
    #[must_use]
    pub const fn due_day(&self) -> u32 {
        self.due_day
    }

    /// Due dates of `installments` consecutive cycles, starting with the
    /// cycle a purchase on `competence` falls into.
    ///
    /// A purchase on or after the closing day belongs to next month's cycle.
    /// Installment `k` (1-based) is due `k` months after the cycle month, on
    /// the due day clamped to the month's length. A count of zero is treated
    /// as one.
    #[must_use]
    pub fn due_dates(&self, competence: NaiveDate, installments: u32) -> Vec<NaiveDate> {
        let cycle_offset = u32::from(competence.day() >= self.closing_day);
        let cycle_month = first_of_month(competence);

        (1..=installments.max(1))
            .map(|k| clamped_day(add_months(cycle_month, cycle_offset + k), self.due_day))
            .collect()
    }

    /// Due date of the first installment.
    #[must_use]
    pub fn first_due_date(&self, competence: NaiveDate) -> NaiveDate {
        let cycle_offset = u32::from(competence.day() >= self.closing_day);
        clamped_day(
            add_months(first_of_month(competence), cycle_offset + 1),
            self.due_day,
        )
    }
}
