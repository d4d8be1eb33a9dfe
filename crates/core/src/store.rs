//! Storage port.
//!
//! The engines never talk to a database directly. Every operation runs inside
//! a unit of work obtained from [`UnitOfWork::begin`], which binds the store to
//! one tenant. Nothing written through a [`LedgerStore`] is visible to other
//! units until [`LedgerStore::commit`] succeeds; dropping the store without
//! committing discards every write made through it.

use async_trait::async_trait;
use rust_decimal::Decimal;
use storeledger_shared::types::{
    CardEntryId, EcommerceOrderId, FinancialAccountId, LedgerEntryId, PurchaseOrderId, SaleId,
    ServiceOrderId, StockItemId, TenantId,
};
use thiserror::Error;

use crate::accounts::FinancialAccount;
use crate::documents::ecommerce::EcommerceOrder;
use crate::documents::purchase::PurchaseOrder;
use crate::documents::service_order::ServiceOrder;
use crate::documents::types::{Customer, Sale, StockItem};
use crate::ledger::types::{CardLedgerEntry, CardSource, InvoiceKey, LedgerEntry, OriginRef};

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed; the unit of work is unusable.
    #[error("Storage failure: {0}")]
    Backend(String),

    /// The unit could not be serialized against a concurrent one.
    #[error("Concurrent update conflict: {0}")]
    Serialization(String),
}

/// Factory for tenant-bound units of work.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Store type handed out by `begin`.
    type Store: LedgerStore;

    /// Starts an atomic unit bound to `tenant`.
    async fn begin(&self, tenant: TenantId) -> Result<Self::Store, StoreError>;
}

/// Tenant-bound transactional access to ledger, stock and document records.
///
/// `*_for_update` reads lock the row until the unit ends, so two units
/// touching the same stock item or document are serialized.
#[async_trait]
pub trait LedgerStore: Send {
    /// Tenant this unit is bound to.
    fn tenant(&self) -> TenantId;

    /// Makes every write of the unit durable.
    async fn commit(self) -> Result<(), StoreError>;

    // ========== Directory ==========

    /// Loads a financial account with its payment instruments.
    async fn financial_account(
        &mut self,
        id: FinancialAccountId,
    ) -> Result<Option<FinancialAccount>, StoreError>;

    // ========== Stock ==========

    /// Reads a stock item without locking it.
    async fn stock_item(&mut self, id: StockItemId) -> Result<Option<StockItem>, StoreError>;

    /// Reads and locks a stock item for a read-modify-write cycle.
    async fn stock_item_for_update(
        &mut self,
        id: StockItemId,
    ) -> Result<Option<StockItem>, StoreError>;

    /// Persists quantity, average cost and last-sold time of a stock item.
    async fn save_stock_item(&mut self, item: &StockItem) -> Result<(), StoreError>;

    // ========== Customers ==========

    /// Returns the customer keyed by `phone_digits`, creating it when absent.
    async fn find_or_create_customer(
        &mut self,
        phone_digits: &str,
        name: &str,
    ) -> Result<Customer, StoreError>;

    // ========== Cash ledger ==========

    /// Reads and locks a cash ledger entry.
    async fn ledger_entry_for_update(
        &mut self,
        id: LedgerEntryId,
    ) -> Result<Option<LedgerEntry>, StoreError>;

    /// Inserts a cash ledger entry.
    async fn insert_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError>;

    /// Overwrites a cash ledger entry.
    async fn update_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError>;

    /// Deletes a cash ledger entry.
    async fn delete_ledger_entry(&mut self, id: LedgerEntryId) -> Result<(), StoreError>;

    /// Cash entries linked to an origin document.
    async fn ledger_entries_by_origin(
        &mut self,
        origin: &OriginRef,
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Locks the invoice key and returns its consolidated entry, if any.
    ///
    /// The lock is taken even when no entry exists yet, so concurrent
    /// reconciliations of the same key queue behind each other.
    async fn consolidated_invoice_for_update(
        &mut self,
        key: &InvoiceKey,
    ) -> Result<Option<LedgerEntry>, StoreError>;

    // ========== Card ledger ==========

    /// Inserts card ledger entries.
    async fn insert_card_entries(&mut self, entries: &[CardLedgerEntry])
    -> Result<(), StoreError>;

    /// Reads a card ledger entry.
    async fn card_entry(&mut self, id: CardEntryId)
    -> Result<Option<CardLedgerEntry>, StoreError>;

    /// Card entries produced by one spending event.
    async fn card_entries_by_source(
        &mut self,
        source: &CardSource,
    ) -> Result<Vec<CardLedgerEntry>, StoreError>;

    /// Deletes card ledger entries.
    async fn delete_card_entries(&mut self, ids: &[CardEntryId]) -> Result<(), StoreError>;

    /// Sum of card entry amounts falling into the invoice.
    async fn card_invoice_total(&mut self, key: &InvoiceKey) -> Result<Decimal, StoreError>;

    // ========== Purchase orders ==========

    /// Reads and locks a purchase order.
    async fn purchase_order_for_update(
        &mut self,
        id: PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, StoreError>;

    /// Inserts a purchase order.
    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> Result<(), StoreError>;

    /// Overwrites a purchase order.
    async fn save_purchase_order(&mut self, order: &PurchaseOrder) -> Result<(), StoreError>;

    /// Deletes a purchase order.
    async fn delete_purchase_order(&mut self, id: PurchaseOrderId) -> Result<(), StoreError>;

    // ========== Service orders ==========

    /// Reads and locks a service order.
    async fn service_order_for_update(
        &mut self,
        id: ServiceOrderId,
    ) -> Result<Option<ServiceOrder>, StoreError>;

    /// Service orders generated by an e-commerce order delivery.
    async fn service_orders_by_origin_order(
        &mut self,
        order: EcommerceOrderId,
    ) -> Result<Vec<ServiceOrder>, StoreError>;

    /// Inserts a service order.
    async fn insert_service_order(&mut self, order: &ServiceOrder) -> Result<(), StoreError>;

    /// Overwrites a service order.
    async fn save_service_order(&mut self, order: &ServiceOrder) -> Result<(), StoreError>;

    /// Deletes a service order.
    async fn delete_service_order(&mut self, id: ServiceOrderId) -> Result<(), StoreError>;

    // ========== E-commerce orders ==========

    /// Reads and locks an e-commerce order.
    async fn ecommerce_order_for_update(
        &mut self,
        id: EcommerceOrderId,
    ) -> Result<Option<EcommerceOrder>, StoreError>;

    /// Inserts an e-commerce order.
    async fn insert_ecommerce_order(&mut self, order: &EcommerceOrder) -> Result<(), StoreError>;

    /// Overwrites an e-commerce order.
    async fn save_ecommerce_order(&mut self, order: &EcommerceOrder) -> Result<(), StoreError>;

    /// Deletes an e-commerce order.
    async fn delete_ecommerce_order(&mut self, id: EcommerceOrderId) -> Result<(), StoreError>;

    // ========== Sales ==========

    /// Inserts a sale record.
    async fn insert_sale(&mut self, sale: &Sale) -> Result<(), StoreError>;

    /// The sale generated by delivering an e-commerce order.
    async fn sale_by_order(&mut self, order: EcommerceOrderId) -> Result<Option<Sale>, StoreError>;

    /// Deletes a sale record.
    async fn delete_sale(&mut self, id: SaleId) -> Result<(), StoreError>;
}
