//! Core business logic for StoreLedger.
//!
//! This crate holds the financial engine behind purchases, service orders and
//! e-commerce orders: weighted-average stock costing, card billing cycles,
//! the cash and card ledgers, and the consolidated card invoices that tie
//! them together. It has no web or database dependencies; persistence goes
//! through the [`store`] port.
//!
//! # Modules
//!
//! - `accounts` - Financial accounts and payment instruments
//! - `billing` - Card billing-cycle calculator
//! - `calendar` - Reference time zone and date arithmetic
//! - `costing` - Weighted-average stock costing
//! - `documents` - Origin document state machines
//! - `engine` - Transactional facade over the above
//! - `ledger` - Cash ledger, card ledger and invoice reconciliation
//! - `store` - Storage port implemented by the persistence layer

pub mod accounts;
pub mod billing;
pub mod calendar;
pub mod costing;
pub mod documents;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;


pub use calendar::ReferenceCalendar;
pub use engine::FinancialEngine;
pub use error::{DocumentKind, EngineError, ErrorKind};
pub use store::{LedgerStore, StoreError, UnitOfWork};
