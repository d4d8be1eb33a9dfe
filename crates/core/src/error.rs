//! Engine error types.
//!
//! Every failure an engine operation can produce is an `EngineError`. The
//! variants fall into five families (`ErrorKind`) and each family maps to a
//! single behaviour at the transition boundary: the unit of work is dropped,
//! nothing written in the request survives, and the typed error is returned.

use std::fmt;

use rust_decimal::Decimal;
use storeledger_shared::types::{
    CardEntryId, FinancialAccountId, InstrumentId, LedgerEntryId, ManualGroupId, ServiceOrderId,
    StockItemId,
};
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::types::{CardSource, OriginRef};
use crate::store::StoreError;

/// The kind of origin document an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A supplier purchase.
    PurchaseOrder,
    /// A service order.
    ServiceOrder,
    /// An e-commerce order.
    EcommerceOrder,
}

impl DocumentKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PurchaseOrder => "purchase_order",
            Self::ServiceOrder => "service_order",
            Self::EcommerceOrder => "ecommerce_order",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before any side effect.
    Validation,
    /// A referenced record does not exist for the tenant.
    NotFound,
    /// Business conflict (stock, status graph).
    Conflict,
    /// Attempt to directly mutate derived or document-owned ledger data.
    Consistency,
    /// Storage failure; the whole request is safe to retry.
    Dependency,
}

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    // ========== Validation Errors ==========
    /// Input failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A status string did not name a status of the document kind.
    #[error("Unknown {document} status '{status}'")]
    UnknownStatus {
        /// Document kind.
        document: DocumentKind,
        /// The rejected status text.
        status: String,
    },

    // ========== Not Found Errors ==========
    /// Origin document not found.
    #[error("{document} {id} not found")]
    DocumentNotFound {
        /// Document kind.
        document: DocumentKind,
        /// Document id.
        id: Uuid,
    },

    /// Financial account not found.
    #[error("Financial account {0} not found")]
    AccountNotFound(FinancialAccountId),

    /// Payment instrument not found in the account.
    #[error("Payment instrument {instrument} not found in account {account}")]
    InstrumentNotFound {
        /// Account that was searched.
        account: FinancialAccountId,
        /// Missing instrument.
        instrument: InstrumentId,
    },

    /// Stock item referenced by a sale or service line not found.
    #[error("Stock item {0} not found")]
    StockItemNotFound(StockItemId),

    /// Cash ledger entry not found.
    #[error("Ledger entry {0} not found")]
    LedgerEntryNotFound(LedgerEntryId),

    /// Card ledger entry not found.
    #[error("Card ledger entry {0} not found")]
    CardEntryNotFound(CardEntryId),

    /// No card entries exist for a manual group.
    #[error("Manual cost group {0} not found")]
    ManualGroupNotFound(ManualGroupId),

    // ========== Conflict Errors ==========
    /// Not enough stock to fulfil a line.
    #[error(
        "Insufficient stock for line {line} ('{description}'): requested {requested}, available {available}"
    )]
    InsufficientStock {
        /// 1-based line number inside the document.
        line: usize,
        /// Line description.
        description: String,
        /// Stock item.
        item_id: StockItemId,
        /// Requested quantity.
        requested: Decimal,
        /// Quantity on hand.
        available: Decimal,
    },

    /// The document's status graph does not allow the transition.
    #[error("Invalid {document} status transition from {from} to {to}")]
    InvalidTransition {
        /// Document kind.
        document: DocumentKind,
        /// Current status.
        from: &'static str,
        /// Requested status.
        to: &'static str,
    },

    /// A service order generated on delivery has moved past pending.
    #[error("Service order {0} generated by this order is no longer pending")]
    GeneratedServiceOrderAdvanced(ServiceOrderId),

    // ========== Consistency Errors ==========
    /// Consolidated invoices are owned by invoice consolidation.
    #[error("Ledger entry {0} is a consolidated invoice and cannot be edited directly")]
    ConsolidatedInvoiceReadOnly(LedgerEntryId),

    /// Cash entry owned by an origin document.
    #[error("Ledger entry {entry} is owned by {origin} and cannot be edited directly")]
    DocumentOwnedEntry {
        /// The entry.
        entry: LedgerEntryId,
        /// Owning document.
        origin: OriginRef,
    },

    /// Card entry owned by an origin document.
    #[error("Card ledger entry {entry} is owned by {owner} and cannot be edited directly")]
    DocumentOwnedCardEntry {
        /// The entry.
        entry: CardEntryId,
        /// Owning source.
        owner: CardSource,
    },

    // ========== Dependency Errors ==========
    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl EngineError {
    /// Returns the error family.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::UnknownStatus { .. } => ErrorKind::Validation,
            Self::DocumentNotFound { .. }
            | Self::AccountNotFound(_)
            | Self::InstrumentNotFound { .. }
            | Self::StockItemNotFound(_)
            | Self::LedgerEntryNotFound(_)
            | Self::CardEntryNotFound(_)
            | Self::ManualGroupNotFound(_) => ErrorKind::NotFound,
            Self::InsufficientStock { .. }
            | Self::InvalidTransition { .. }
            | Self::GeneratedServiceOrderAdvanced(_) => ErrorKind::Conflict,
            Self::ConsolidatedInvoiceReadOnly(_)
            | Self::DocumentOwnedEntry { .. }
            | Self::DocumentOwnedCardEntry { .. } => ErrorKind::Consistency,
            Self::Storage(_) => ErrorKind::Dependency,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnknownStatus { .. } => "UNKNOWN_STATUS",
            Self::DocumentNotFound { .. } => "DOCUMENT_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::InstrumentNotFound { .. } => "INSTRUMENT_NOT_FOUND",
            Self::StockItemNotFound(_) => "STOCK_ITEM_NOT_FOUND",
            Self::LedgerEntryNotFound(_) => "LEDGER_ENTRY_NOT_FOUND",
            Self::CardEntryNotFound(_) => "CARD_ENTRY_NOT_FOUND",
            Self::ManualGroupNotFound(_) => "MANUAL_GROUP_NOT_FOUND",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::GeneratedServiceOrderAdvanced(_) => "GENERATED_SERVICE_ORDER_ADVANCED",
            Self::ConsolidatedInvoiceReadOnly(_) => "CONSOLIDATED_INVOICE_READ_ONLY",
            Self::DocumentOwnedEntry { .. } => "DOCUMENT_OWNED_ENTRY",
            Self::DocumentOwnedCardEntry { .. } => "DOCUMENT_OWNED_CARD_ENTRY",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Consistency => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Dependency => 503,
        }
    }

    /// Returns true if the caller may retry the whole request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
