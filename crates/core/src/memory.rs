//! In-memory unit of work.
//!
//! Every unit holds one process-wide lock from `begin` until it is committed
//! or dropped, and works on a copy of the tenant's records. Commit swaps the
//! copy in; dropping the store throws it away.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use storeledger_shared::types::{
    CardEntryId, CustomerId, EcommerceOrderId, FinancialAccountId, LedgerEntryId, PurchaseOrderId,
    SaleId, ServiceOrderId, StockItemId, TenantId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::accounts::FinancialAccount;
use crate::documents::ecommerce::EcommerceOrder;
use crate::documents::purchase::PurchaseOrder;
use crate::documents::service_order::ServiceOrder;
use crate::documents::types::{Customer, Sale, StockItem};
use crate::ledger::types::{CardLedgerEntry, CardSource, InvoiceKey, LedgerEntry, OriginRef};
use crate::store::{LedgerStore, StoreError, UnitOfWork};

/// All records of one tenant.
#[derive(Debug, Clone, Default)]
pub struct TenantBook {
    /// Financial accounts.
    pub accounts: BTreeMap<FinancialAccountId, FinancialAccount>,
    /// Catalog items.
    pub stock_items: BTreeMap<StockItemId, StockItem>,
    /// Customers.
    pub customers: BTreeMap<CustomerId, Customer>,
    /// Cash ledger.
    pub ledger_entries: BTreeMap<LedgerEntryId, LedgerEntry>,
    /// Card ledger.
    pub card_entries: BTreeMap<CardEntryId, CardLedgerEntry>,
    /// Purchase orders.
    pub purchase_orders: BTreeMap<PurchaseOrderId, PurchaseOrder>,
    /// Service orders.
    pub service_orders: BTreeMap<ServiceOrderId, ServiceOrder>,
    /// E-commerce orders.
    pub ecommerce_orders: BTreeMap<EcommerceOrderId, EcommerceOrder>,
    /// Sales.
    pub sales: BTreeMap<SaleId, Sale>,
}

type Books = HashMap<TenantId, TenantBook>;

/// Unit-of-work factory over process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryUnitOfWork {
    books: Arc<Mutex<Books>>,
}

impl MemoryUnitOfWork {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutates a tenant's records outside any unit of work.
    pub async fn seed<F>(&self, tenant: TenantId, f: F)
    where
        F: FnOnce(&mut TenantBook),
    {
        let mut books = self.books.lock().await;
        f(books.entry(tenant).or_default());
    }

    /// Copy of a tenant's committed records.
    pub async fn snapshot(&self, tenant: TenantId) -> TenantBook {
        self.books
            .lock()
            .await
            .get(&tenant)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    type Store = MemoryStore;

    async fn begin(&self, tenant: TenantId) -> Result<MemoryStore, StoreError> {
        let guard = Arc::clone(&self.books).lock_owned().await;
        let book = guard.get(&tenant).cloned().unwrap_or_default();
        Ok(MemoryStore {
            guard,
            tenant,
            book,
        })
    }
}

/// A unit of work over process memory.
pub struct MemoryStore {
    guard: OwnedMutexGuard<Books>,
    tenant: TenantId,
    book: TenantBook,
}

fn missing(what: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("{what} {id} does not exist"))
}

#[async_trait]
impl LedgerStore for MemoryStore {
    fn tenant(&self) -> TenantId {
        self.tenant
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        self.guard.insert(self.tenant, self.book);
        Ok(())
    }

    async fn financial_account(
        &mut self,
        id: FinancialAccountId,
    ) -> Result<Option<FinancialAccount>, StoreError> {
        Ok(self.book.accounts.get(&id).cloned())
    }

    async fn stock_item(&mut self, id: StockItemId) -> Result<Option<StockItem>, StoreError> {
        Ok(self.book.stock_items.get(&id).cloned())
    }

    async fn stock_item_for_update(
        &mut self,
        id: StockItemId,
    ) -> Result<Option<StockItem>, StoreError> {
        Ok(self.book.stock_items.get(&id).cloned())
    }

    async fn save_stock_item(&mut self, item: &StockItem) -> Result<(), StoreError> {
        let slot = self
            .book
            .stock_items
            .get_mut(&item.id)
            .ok_or_else(|| missing("stock item", item.id))?;
        *slot = item.clone();
        Ok(())
    }

    async fn find_or_create_customer(
        &mut self,
        phone_digits: &str,
        name: &str,
    ) -> Result<Customer, StoreError> {
        if let Some(customer) = self
            .book
            .customers
            .values()
            .find(|customer| customer.phone_digits == phone_digits)
        {
            return Ok(customer.clone());
        }
        let customer = Customer {
            id: CustomerId::new(),
            name: name.to_string(),
            phone_digits: phone_digits.to_string(),
        };
        self.book.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn ledger_entry_for_update(
        &mut self,
        id: LedgerEntryId,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        Ok(self.book.ledger_entries.get(&id).cloned())
    }

    async fn insert_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError> {
        if let Some(key) = entry.invoice_key()
            && self
                .book
                .ledger_entries
                .values()
                .any(|other| other.invoice_key() == Some(key))
        {
            return Err(StoreError::Backend(format!(
                "consolidated invoice {key} already exists"
            )));
        }
        self.book.ledger_entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn update_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError> {
        let slot = self
            .book
            .ledger_entries
            .get_mut(&entry.id)
            .ok_or_else(|| missing("ledger entry", entry.id))?;
        *slot = entry.clone();
        Ok(())
    }

    async fn delete_ledger_entry(&mut self, id: LedgerEntryId) -> Result<(), StoreError> {
        self.book.ledger_entries.remove(&id);
        Ok(())
    }

    async fn ledger_entries_by_origin(
        &mut self,
        origin: &OriginRef,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .book
            .ledger_entries
            .values()
            .filter(|entry| entry.origin.as_ref() == Some(origin))
            .cloned()
            .collect())
    }

    async fn consolidated_invoice_for_update(
        &mut self,
        key: &InvoiceKey,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        Ok(self
            .book
            .ledger_entries
            .values()
            .find(|entry| entry.invoice_key().as_ref() == Some(key))
            .cloned())
    }

    async fn insert_card_entries(
        &mut self,
        entries: &[CardLedgerEntry],
    ) -> Result<(), StoreError> {
        for entry in entries {
            self.book.card_entries.insert(entry.id, entry.clone());
        }
        Ok(())
    }

    async fn card_entry(&mut self, id: CardEntryId) -> Result<Option<CardLedgerEntry>, StoreError> {
        Ok(self.book.card_entries.get(&id).cloned())
    }

    async fn card_entries_by_source(
        &mut self,
        source: &CardSource,
    ) -> Result<Vec<CardLedgerEntry>, StoreError> {
        Ok(self
            .book
            .card_entries
            .values()
            .filter(|entry| &entry.source == source)
            .cloned()
            .collect())
    }

    async fn delete_card_entries(&mut self, ids: &[CardEntryId]) -> Result<(), StoreError> {
        for id in ids {
            self.book.card_entries.remove(id);
        }
        Ok(())
    }

    async fn card_invoice_total(&mut self, key: &InvoiceKey) -> Result<Decimal, StoreError> {
        Ok(self
            .book
            .card_entries
            .values()
            .filter(|entry| &entry.invoice_key() == key)
            .map(|entry| entry.amount)
            .sum())
    }

    async fn purchase_order_for_update(
        &mut self,
        id: PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, StoreError> {
        Ok(self.book.purchase_orders.get(&id).cloned())
    }

    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> Result<(), StoreError> {
        self.book.purchase_orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn save_purchase_order(&mut self, order: &PurchaseOrder) -> Result<(), StoreError> {
        let slot = self
            .book
            .purchase_orders
            .get_mut(&order.id)
            .ok_or_else(|| missing("purchase order", order.id))?;
        *slot = order.clone();
        Ok(())
    }

    async fn delete_purchase_order(&mut self, id: PurchaseOrderId) -> Result<(), StoreError> {
        self.book.purchase_orders.remove(&id);
        Ok(())
    }

    async fn service_order_for_update(
        &mut self,
        id: ServiceOrderId,
    ) -> Result<Option<ServiceOrder>, StoreError> {
        Ok(self.book.service_orders.get(&id).cloned())
    }

    async fn service_orders_by_origin_order(
        &mut self,
        order: EcommerceOrderId,
    ) -> Result<Vec<ServiceOrder>, StoreError> {
        Ok(self
            .book
            .service_orders
            .values()
            .filter(|service_order| service_order.origin_order_id == Some(order))
            .cloned()
            .collect())
    }

    async fn insert_service_order(&mut self, order: &ServiceOrder) -> Result<(), StoreError> {
        self.book.service_orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn save_service_order(&mut self, order: &ServiceOrder) -> Result<(), StoreError> {
        let slot = self
            .book
            .service_orders
            .get_mut(&order.id)
            .ok_or_else(|| missing("service order", order.id))?;
        *slot = order.clone();
        Ok(())
    }

    async fn delete_service_order(&mut self, id: ServiceOrderId) -> Result<(), StoreError> {
        self.book.service_orders.remove(&id);
        Ok(())
    }

    async fn ecommerce_order_for_update(
        &mut self,
        id: EcommerceOrderId,
    ) -> Result<Option<EcommerceOrder>, StoreError> {
        Ok(self.book.ecommerce_orders.get(&id).cloned())
    }

    async fn insert_ecommerce_order(&mut self, order: &EcommerceOrder) -> Result<(), StoreError> {
        self.book.ecommerce_orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn save_ecommerce_order(&mut self, order: &EcommerceOrder) -> Result<(), StoreError> {
        let slot = self
            .book
            .ecommerce_orders
            .get_mut(&order.id)
            .ok_or_else(|| missing("e-commerce order", order.id))?;
        *slot = order.clone();
        Ok(())
    }

    async fn delete_ecommerce_order(&mut self, id: EcommerceOrderId) -> Result<(), StoreError> {
        self.book.ecommerce_orders.remove(&id);
        Ok(())
    }

    async fn insert_sale(&mut self, sale: &Sale) -> Result<(), StoreError> {
        self.book.sales.insert(sale.id, sale.clone());
        Ok(())
    }

    async fn sale_by_order(&mut self, order: EcommerceOrderId) -> Result<Option<Sale>, StoreError> {
        Ok(self
            .book
            .sales
            .values()
            .find(|sale| sale.order_id == order)
            .cloned())
    }

    async fn delete_sale(&mut self, id: SaleId) -> Result<(), StoreError> {
        self.book.sales.remove(&id);
        Ok(())
    }
}

/// Seed data shared by tests.
pub mod fixtures {
    use rust_decimal::Decimal;
    use storeledger_shared::types::{FinancialAccountId, InstrumentId, StockItemId, TenantId};

    use super::MemoryUnitOfWork;
    use crate::accounts::{FinancialAccount, InstrumentKind, PaymentInstrument, ReceivingRules};
    use crate::billing::BillingCycle;
    use crate::documents::types::{ItemKind, StockItem};

    /// Ids of the seeded account and its instruments.
    #[derive(Debug, Clone, Copy)]
    pub struct Directory {
        /// The account.
        pub account_id: FinancialAccountId,
        /// "Visa": credit, closing day 10, due day 20.
        pub credit_id: InstrumentId,
        /// "Pix": no fee, same-day settlement.
        pub pix_id: InstrumentId,
        /// "Boleto": no fee, same-day settlement, up to 12 installments.
        pub boleto_id: InstrumentId,
        /// "Debit": 2% fee, settles the next day.
        pub debit_id: InstrumentId,
    }

    /// Seeds one account with a credit, pix, boleto and debit instrument.
    pub async fn directory(uow: &MemoryUnitOfWork, tenant: TenantId) -> Directory {
        let directory = Directory {
            account_id: FinancialAccountId::new(),
            credit_id: InstrumentId::new(),
            pix_id: InstrumentId::new(),
            boleto_id: InstrumentId::new(),
            debit_id: InstrumentId::new(),
        };
        let account = FinancialAccount {
            id: directory.account_id,
            name: "Main account".to_string(),
            instruments: vec![
                PaymentInstrument {
                    id: directory.credit_id,
                    name: "Visa".to_string(),
                    kind: InstrumentKind::Credit(BillingCycle {
                        closing_day: 10,
                        due_day: 20,
                    }),
                },
                PaymentInstrument {
                    id: directory.pix_id,
                    name: "Pix".to_string(),
                    kind: InstrumentKind::Pix(ReceivingRules::default()),
                },
                PaymentInstrument {
                    id: directory.boleto_id,
                    name: "Boleto".to_string(),
                    kind: InstrumentKind::Boleto(ReceivingRules {
                        max_installments: 12,
                        ..ReceivingRules::default()
                    }),
                },
                PaymentInstrument {
                    id: directory.debit_id,
                    name: "Debit".to_string(),
                    kind: InstrumentKind::Debit(ReceivingRules {
                        tax_rate: Decimal::TWO,
                        days_to_receive: 1,
                        ..ReceivingRules::default()
                    }),
                },
            ],
        };
        uow.seed(tenant, |book| {
            book.accounts.insert(account.id, account);
        })
        .await;
        directory
    }

    /// Seeds a catalog item and returns its id.
    pub async fn stock_item(
        uow: &MemoryUnitOfWork,
        tenant: TenantId,
        name: &str,
        kind: ItemKind,
        quantity: Decimal,
        average_cost: Decimal,
    ) -> StockItemId {
        let item = StockItem {
            id: StockItemId::new(),
            name: name.to_string(),
            kind,
            quantity,
            average_cost,
            sale_price: Decimal::ZERO,
            last_sold_at: None,
        };
        let id = item.id;
        uow.seed(tenant, |book| {
            book.stock_items.insert(id, item);
        })
        .await;
        id
    }
}
