//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `PurchaseOrderId` where a `ServiceOrderId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(TenantId, "Unique identifier for a tenant (one retail business).");
typed_id!(
    FinancialAccountId,
    "Unique identifier for a financial account in the directory."
);
typed_id!(
    InstrumentId,
    "Unique identifier for a payment instrument of a financial account."
);
typed_id!(StockItemId, "Unique identifier for a catalog/stock item.");
typed_id!(CustomerId, "Unique identifier for a customer.");
typed_id!(LedgerEntryId, "Unique identifier for a cash ledger entry.");
typed_id!(CardEntryId, "Unique identifier for a card ledger entry.");
typed_id!(PurchaseOrderId, "Unique identifier for a purchase order.");
typed_id!(ServiceOrderId, "Unique identifier for a service order.");
typed_id!(EcommerceOrderId, "Unique identifier for an e-commerce order.");
typed_id!(SaleId, "Unique identifier for a consolidated sale record.");
typed_id!(
    ManualGroupId,
    "Groups the installments of one manually posted card spend."
);
