//! Origin document state machines.
//!
//! Each document kind owns a small status graph. Status changes drive the
//! stock, costing and ledger effects; deleting a document first reverses
//! whatever its current status applied.
//!
//! # Modules
//!
//! - `purchase` - Supplier purchases (weighted-average costing, expense posting)
//! - `service_order` - Service orders (parts, revenue, cost posting)
//! - `ecommerce` - E-commerce orders (stock, sale, generated service orders)
//! - `stock` - Stock take and restore shared by the above
//! - `types` - Catalog items, customers and sales

pub mod ecommerce;
pub mod purchase;
pub mod service_order;
pub mod stock;
pub mod types;

use chrono::{DateTime, Utc};
use serde::Serialize;
use storeledger_shared::types::{EcommerceOrderId, PurchaseOrderId, ServiceOrderId};

use crate::calendar::ReferenceCalendar;
use crate::error::{DocumentKind, EngineError};
use crate::store::LedgerStore;

pub use ecommerce::{EcommerceDraft, EcommerceOrder, EcommerceStatus, OrderLine};
pub use purchase::{PurchaseDraft, PurchaseLine, PurchaseOrder, PurchaseStatus};
pub use service_order::{
    ReceiptSelection, ServiceOrder, ServiceOrderDraft, ServiceOrderStatus, ServicePart,
};
pub use types::{Customer, ItemKind, Sale, SaleLine, StockItem, normalize_phone};

/// Reference to an origin document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRef {
    /// A purchase order.
    Purchase(PurchaseOrderId),
    /// A service order.
    ServiceOrder(ServiceOrderId),
    /// An e-commerce order.
    Ecommerce(EcommerceOrderId),
}

impl DocumentRef {
    /// Kind of the referenced document.
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Purchase(_) => DocumentKind::PurchaseOrder,
            Self::ServiceOrder(_) => DocumentKind::ServiceOrder,
            Self::Ecommerce(_) => DocumentKind::EcommerceOrder,
        }
    }
}

/// A requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRequest {
    /// Move a purchase order.
    Purchase {
        /// The order.
        id: PurchaseOrderId,
        /// Target status.
        to: PurchaseStatus,
    },
    /// Move a service order.
    ServiceOrder {
        /// The order.
        id: ServiceOrderId,
        /// Target status.
        to: ServiceOrderStatus,
    },
    /// Move an e-commerce order.
    Ecommerce {
        /// The order.
        id: EcommerceOrderId,
        /// Target status.
        to: EcommerceStatus,
    },
}

impl TransitionRequest {
    /// Builds a request from a document reference and a status name.
    pub fn parse(document: DocumentRef, status: &str) -> Result<Self, EngineError> {
        Ok(match document {
            DocumentRef::Purchase(id) => Self::Purchase {
                id,
                to: status.parse()?,
            },
            DocumentRef::ServiceOrder(id) => Self::ServiceOrder {
                id,
                to: status.parse()?,
            },
            DocumentRef::Ecommerce(id) => Self::Ecommerce {
                id,
                to: status.parse()?,
            },
        })
    }

    /// The document being moved.
    #[must_use]
    pub fn document(&self) -> DocumentRef {
        match self {
            Self::Purchase { id, .. } => DocumentRef::Purchase(*id),
            Self::ServiceOrder { id, .. } => DocumentRef::ServiceOrder(*id),
            Self::Ecommerce { id, .. } => DocumentRef::Ecommerce(*id),
        }
    }
}

/// A document as stored after an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "document", rename_all = "snake_case")]
pub enum DocumentSnapshot {
    /// A purchase order.
    Purchase(PurchaseOrder),
    /// A service order.
    ServiceOrder(ServiceOrder),
    /// An e-commerce order.
    Ecommerce(EcommerceOrder),
}

impl DocumentSnapshot {
    /// Status name of the document.
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::Purchase(order) => order.status.as_str(),
            Self::ServiceOrder(order) => order.status.as_str(),
            Self::Ecommerce(order) => order.status.as_str(),
        }
    }
}

/// Applies a status change to a document.
pub async fn apply_transition<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    request: TransitionRequest,
    now: DateTime<Utc>,
) -> Result<DocumentSnapshot, EngineError> {
    Ok(match request {
        TransitionRequest::Purchase { id, to } => {
            DocumentSnapshot::Purchase(purchase::transition(store, calendar, id, to, now).await?)
        }
        TransitionRequest::ServiceOrder { id, to } => DocumentSnapshot::ServiceOrder(
            service_order::transition(store, calendar, id, to, now).await?,
        ),
        TransitionRequest::Ecommerce { id, to } => {
            DocumentSnapshot::Ecommerce(ecommerce::transition(store, calendar, id, to, now).await?)
        }
    })
}

/// Reverses a document's applied effects and removes it.
pub async fn delete_document<S: LedgerStore>(
    store: &mut S,
    calendar: &ReferenceCalendar,
    document: DocumentRef,
) -> Result<(), EngineError> {
    match document {
        DocumentRef::Purchase(id) => purchase::delete(store, calendar, id).await,
        DocumentRef::ServiceOrder(id) => service_order::delete(store, calendar, id).await,
        DocumentRef::Ecommerce(id) => ecommerce::delete(store, calendar, id).await,
    }
}
