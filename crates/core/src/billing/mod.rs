//! Credit-card billing cycles.
//!
//! Maps a competence day and an installment count onto the invoice due
//! dates the installments fall into.

pub mod cycle;

#[cfg(test)]
mod cycle_props;

pub use cycle::BillingCycle;
