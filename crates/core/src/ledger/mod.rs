//! Cash and card ledgers.
//!
//! This module implements the ledger side of the engine:
//! - Ledger records and origin tagging
//! - Card ledger writer (per-installment entries)
//! - Invoice consolidation
//! - Posting router (card, installment plan or single cash entry)
//! - Ownership guard for direct edits
//! - Manual costs and direct cash-entry operations

pub mod card;
pub mod guard;
pub mod invoice;
pub mod manual;
pub mod posting;
pub mod types;

#[cfg(test)]
mod invoice_props;

pub use card::{CardLedgerWriter, CardSpend};
pub use guard::{ensure_card_entry_editable, ensure_cash_entry_editable};
pub use invoice::{ReconcileOutcome, reconcile};
pub use manual::{CashEntryPatch, ManualCostInput, ManualPosting};
pub use posting::{PaymentSelection, PostingOutcome, PostingRequest, PostingRouter};
pub use types::{
    CardLedgerEntry, CardSource, EntryStatus, Flow, Installment, InstallmentPlan, InvoiceKey,
    LedgerEntry, OriginRef, PostingOwner,
};
