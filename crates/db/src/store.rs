//! PostgreSQL implementation of the storage port.
//!
//! A unit of work is one database transaction scoped to one tenant through
//! the RLS setting. Every query still filters on `tenant_id` explicitly, and
//! reads that precede a write lock their rows with `SELECT ... FOR UPDATE`.
//! Consolidated invoices are additionally serialized per invoice key with a
//! transaction-scoped advisory lock, so two units never race to create the
//! same invoice row.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, Statement, TransactionTrait,
};
use storeledger_core::accounts::FinancialAccount;
use storeledger_core::documents::{
    Customer, EcommerceOrder, PurchaseOrder, Sale, ServiceOrder, StockItem,
};
use storeledger_core::ledger::types::{
    CardLedgerEntry, CardSource, InvoiceKey, LedgerEntry, OriginRef,
};
use storeledger_core::store::{LedgerStore, StoreError, UnitOfWork};
use storeledger_shared::types::{
    CardEntryId, CustomerId, EcommerceOrderId, FinancialAccountId, LedgerEntryId,
    PurchaseOrderId, SaleId, ServiceOrderId, StockItemId, TenantId,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{
    card_ledger_entries, customers, ecommerce_orders, financial_accounts, ledger_entries,
    payment_instruments, purchase_orders, sales, service_orders, stock_items,
};
use crate::mapping;
use crate::rls::set_tenant_context;

/// Maps a database error onto the storage port's error.
///
/// Serialization failures and deadlocks are reported as
/// [`StoreError::Serialization`]; the whole unit can be retried.
pub fn storage_error(err: DbErr) -> StoreError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return StoreError::Backend(format!("unique constraint violated: {detail}"));
    }
    let message = err.to_string();
    if message.contains("40001")
        || message.contains("40P01")
        || message.contains("could not serialize")
        || message.contains("deadlock detected")
    {
        return StoreError::Serialization(message);
    }
    StoreError::Backend(message)
}

fn ensure_affected(rows: u64, table: &str, id: Uuid) -> Result<(), StoreError> {
    if rows == 0 {
        return Err(StoreError::Backend(format!("{table} row {id} not found")));
    }
    Ok(())
}

/// Advisory-lock key of a consolidated invoice.
pub fn invoice_lock_key(tenant: TenantId, key: &InvoiceKey) -> String {
    format!("invoice:{tenant}:{key}")
}

/// Unit-of-work factory over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgUnitOfWork {
    db: DatabaseConnection,
}

impl PgUnitOfWork {
    /// Creates a factory over an open connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying pool.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    type Store = PgStore;

    async fn begin(&self, tenant: TenantId) -> Result<PgStore, StoreError> {
        let txn = self.db.begin().await.map_err(storage_error)?;
        set_tenant_context(&txn, tenant)
            .await
            .map_err(storage_error)?;
        Ok(PgStore { txn, tenant })
    }
}

/// A tenant-scoped transaction. Dropping it without [`LedgerStore::commit`]
/// rolls the transaction back.
pub struct PgStore {
    txn: DatabaseTransaction,
    tenant: TenantId,
}

impl PgStore {
    fn tenant_id(&self) -> Uuid {
        self.tenant.into_inner()
    }

    /// Registers a financial account and its instruments.
    ///
    /// The engine only reads the directory; this is used to provision tenants.
    ///
    /// # Errors
    ///
    /// Returns an error if any row cannot be inserted.
    pub async fn insert_financial_account(
        &mut self,
        account: &FinancialAccount,
    ) -> Result<(), StoreError> {
        let row = financial_accounts::ActiveModel {
            id: sea_orm::Set(account.id.into_inner()),
            tenant_id: sea_orm::Set(self.tenant_id()),
            name: sea_orm::Set(account.name.clone()),
            created_at: sea_orm::Set(Utc::now()),
        };
        financial_accounts::Entity::insert(row)
            .exec_without_returning(&self.txn)
            .await
            .map_err(storage_error)?;

        let instruments = account
            .instruments
            .iter()
            .map(|instrument| mapping::instrument_to_active(self.tenant, account.id, instrument))
            .collect::<Result<Vec<_>, _>>()?;
        if !instruments.is_empty() {
            payment_instruments::Entity::insert_many(instruments)
                .exec_without_returning(&self.txn)
                .await
                .map_err(storage_error)?;
        }
        Ok(())
    }

    /// Registers a stock item (product or service).
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be inserted.
    pub async fn insert_stock_item(&mut self, item: &StockItem) -> Result<(), StoreError> {
        stock_items::Entity::insert(mapping::stock_item_to_active(self.tenant, item))
            .exec_without_returning(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    fn tenant(&self) -> TenantId {
        self.tenant
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(storage_error)
    }

    // ========== Directory ==========

    async fn financial_account(
        &mut self,
        id: FinancialAccountId,
    ) -> Result<Option<FinancialAccount>, StoreError> {
        let Some(account) = financial_accounts::Entity::find_by_id(id.into_inner())
            .filter(financial_accounts::Column::TenantId.eq(self.tenant_id()))
            .one(&self.txn)
            .await
            .map_err(storage_error)?
        else {
            return Ok(None);
        };

        let instruments = payment_instruments::Entity::find()
            .filter(payment_instruments::Column::TenantId.eq(self.tenant_id()))
            .filter(payment_instruments::Column::AccountId.eq(account.id))
            .order_by_asc(payment_instruments::Column::Name)
            .all(&self.txn)
            .await
            .map_err(storage_error)?;

        mapping::account_to_domain(account, instruments).map(Some)
    }

    // ========== Stock ==========

    async fn stock_item(&mut self, id: StockItemId) -> Result<Option<StockItem>, StoreError> {
        stock_items::Entity::find_by_id(id.into_inner())
            .filter(stock_items::Column::TenantId.eq(self.tenant_id()))
            .one(&self.txn)
            .await
            .map_err(storage_error)?
            .map(mapping::stock_item_to_domain)
            .transpose()
    }

    async fn stock_item_for_update(
        &mut self,
        id: StockItemId,
    ) -> Result<Option<StockItem>, StoreError> {
        stock_items::Entity::find_by_id(id.into_inner())
            .filter(stock_items::Column::TenantId.eq(self.tenant_id()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(storage_error)?
            .map(mapping::stock_item_to_domain)
            .transpose()
    }

    async fn save_stock_item(&mut self, item: &StockItem) -> Result<(), StoreError> {
        let result = stock_items::Entity::update_many()
            .set(mapping::stock_item_to_active(self.tenant, item))
            .filter(stock_items::Column::Id.eq(item.id.into_inner()))
            .filter(stock_items::Column::TenantId.eq(self.tenant_id()))
            .exec(&self.txn)
            .await
            .map_err(storage_error)?;
        ensure_affected(result.rows_affected, "stock_items", item.id.into_inner())
    }

    // ========== Customers ==========

    async fn find_or_create_customer(
        &mut self,
        phone_digits: &str,
        name: &str,
    ) -> Result<Customer, StoreError> {
        let candidate = customers::ActiveModel {
            id: sea_orm::Set(CustomerId::new().into_inner()),
            tenant_id: sea_orm::Set(self.tenant_id()),
            name: sea_orm::Set(name.to_string()),
            phone_digits: sea_orm::Set(phone_digits.to_string()),
            created_at: sea_orm::Set(Utc::now()),
        };
        let inserted = customers::Entity::insert(candidate)
            .on_conflict(
                OnConflict::columns([customers::Column::TenantId, customers::Column::PhoneDigits])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(storage_error)?;
        if inserted > 0 {
            debug!(tenant_id = %self.tenant, "Customer created");
        }

        customers::Entity::find()
            .filter(customers::Column::TenantId.eq(self.tenant_id()))
            .filter(customers::Column::PhoneDigits.eq(phone_digits))
            .one(&self.txn)
            .await
            .map_err(storage_error)?
            .map(mapping::customer_to_domain)
            .ok_or_else(|| StoreError::Backend("customer vanished after upsert".to_string()))
    }

    // ========== Cash ledger ==========

    async fn ledger_entry_for_update(
        &mut self,
        id: LedgerEntryId,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        ledger_entries::Entity::find_by_id(id.into_inner())
            .filter(ledger_entries::Column::TenantId.eq(self.tenant_id()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(storage_error)?
            .map(mapping::ledger_entry_to_domain)
            .transpose()
    }

    async fn insert_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError> {
        ledger_entries::Entity::insert(mapping::ledger_entry_to_active(self.tenant, entry)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn update_ledger_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError> {
        let result = ledger_entries::Entity::update_many()
            .set(mapping::ledger_entry_to_active(self.tenant, entry)?)
            .filter(ledger_entries::Column::Id.eq(entry.id.into_inner()))
            .filter(ledger_entries::Column::TenantId.eq(self.tenant_id()))
            .exec(&self.txn)
            .await
            .map_err(storage_error)?;
        ensure_affected(result.rows_affected, "ledger_entries", entry.id.into_inner())
    }

    async fn delete_ledger_entry(&mut self, id: LedgerEntryId) -> Result<(), StoreError> {
        ledger_entries::Entity::delete_many()
            .filter(ledger_entries::Column::Id.eq(id.into_inner()))
            .filter(ledger_entries::Column::TenantId.eq(self.tenant_id()))
            .exec(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn ledger_entries_by_origin(
        &mut self,
        origin: &OriginRef,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TenantId.eq(self.tenant_id()))
            .filter(ledger_entries::Column::OriginType.eq(origin.kind()))
            .filter(ledger_entries::Column::OriginId.eq(origin.id()))
            .order_by_asc(ledger_entries::Column::CompetenceAt)
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(mapping::ledger_entry_to_domain)
            .collect()
    }

    async fn consolidated_invoice_for_update(
        &mut self,
        key: &InvoiceKey,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let lock = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "SELECT pg_advisory_xact_lock(hashtext($1))",
            [invoice_lock_key(self.tenant, key).into()],
        );
        self.txn.execute(lock).await.map_err(storage_error)?;

        ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TenantId.eq(self.tenant_id()))
            .filter(ledger_entries::Column::IsConsolidatedInvoice.eq(true))
            .filter(ledger_entries::Column::AccountId.eq(key.account_id.into_inner()))
            .filter(ledger_entries::Column::InstrumentId.eq(key.instrument_id.into_inner()))
            .filter(ledger_entries::Column::DueDate.eq(key.due_day))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(storage_error)?
            .map(mapping::ledger_entry_to_domain)
            .transpose()
    }

    // ========== Card ledger ==========

    async fn insert_card_entries(
        &mut self,
        entries: &[CardLedgerEntry],
    ) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let rows = entries
            .iter()
            .map(|entry| mapping::card_entry_to_active(self.tenant, entry))
            .collect::<Result<Vec<_>, _>>()?;
        card_ledger_entries::Entity::insert_many(rows)
            .exec_without_returning(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn card_entry(
        &mut self,
        id: CardEntryId,
    ) -> Result<Option<CardLedgerEntry>, StoreError> {
        card_ledger_entries::Entity::find_by_id(id.into_inner())
            .filter(card_ledger_entries::Column::TenantId.eq(self.tenant_id()))
            .one(&self.txn)
            .await
            .map_err(storage_error)?
            .map(mapping::card_entry_to_domain)
            .transpose()
    }

    async fn card_entries_by_source(
        &mut self,
        source: &CardSource,
    ) -> Result<Vec<CardLedgerEntry>, StoreError> {
        card_ledger_entries::Entity::find()
            .filter(card_ledger_entries::Column::TenantId.eq(self.tenant_id()))
            .filter(card_ledger_entries::Column::SourceType.eq(source.kind()))
            .filter(card_ledger_entries::Column::SourceId.eq(source.id()))
            .order_by_asc(card_ledger_entries::Column::Installment)
            .all(&self.txn)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(mapping::card_entry_to_domain)
            .collect()
    }

    async fn delete_card_entries(&mut self, ids: &[CardEntryId]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        card_ledger_entries::Entity::delete_many()
            .filter(card_ledger_entries::Column::TenantId.eq(self.tenant_id()))
            .filter(card_ledger_entries::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .exec(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn card_invoice_total(&mut self, key: &InvoiceKey) -> Result<Decimal, StoreError> {
        let total = card_ledger_entries::Entity::find()
            .select_only()
            .column_as(Expr::col(card_ledger_entries::Column::Amount).sum(), "total")
            .filter(card_ledger_entries::Column::TenantId.eq(self.tenant_id()))
            .filter(card_ledger_entries::Column::AccountId.eq(key.account_id.into_inner()))
            .filter(card_ledger_entries::Column::InstrumentId.eq(key.instrument_id.into_inner()))
            .filter(card_ledger_entries::Column::DueDate.eq(key.due_day))
            .into_tuple::<Option<Decimal>>()
            .one(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(mapping::sum_or_zero(total))
    }

    // ========== Purchase orders ==========

    async fn purchase_order_for_update(
        &mut self,
        id: PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, StoreError> {
        purchase_orders::Entity::find_by_id(id.into_inner())
            .filter(purchase_orders::Column::TenantId.eq(self.tenant_id()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(storage_error)?
            .map(mapping::purchase_to_domain)
            .transpose()
    }

    async fn insert_purchase_order(&mut self, order: &PurchaseOrder) -> Result<(), StoreError> {
        purchase_orders::Entity::insert(mapping::purchase_to_active(self.tenant, order)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn save_purchase_order(&mut self, order: &PurchaseOrder) -> Result<(), StoreError> {
        let result = purchase_orders::Entity::update_many()
            .set(mapping::purchase_to_active(self.tenant, order)?)
            .filter(purchase_orders::Column::Id.eq(order.id.into_inner()))
            .filter(purchase_orders::Column::TenantId.eq(self.tenant_id()))
            .exec(&self.txn)
            .await
            .map_err(storage_error)?;
        ensure_affected(result.rows_affected, "purchase_orders", order.id.into_inner())
    }

    async fn delete_purchase_order(&mut self, id: PurchaseOrderId) -> Result<(), StoreError> {
        purchase_orders::Entity::delete_many()
            .filter(purchase_orders::Column::Id.eq(id.into_inner()))
            .filter(purchase_orders::Column::TenantId.eq(self.tenant_id()))
            .exec(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    // ========== Service orders ==========

    async fn service_order_for_update(
        &mut self,
        id: ServiceOrderId,
    ) -> Result<Option<ServiceOrder>, StoreError> {
        service_orders::Entity::find_by_id(id.into_inner())
            .filter(service_orders::Column::TenantId.eq(self.tenant_id()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(storage_error)?
            .map(mapping::service_order_to_domain)
            .transpose()
    }

    async fn service_orders_by_origin_order(
        &mut self,
        order: EcommerceOrderId,
    ) -> Result<Vec<ServiceOrder>, StoreError> {
        service_orders::Entity::find()
            .filter(service_orders::Column::TenantId.eq(self.tenant_id()))
            .filter(service_orders::Column::OriginOrderId.eq(order.into_inner()))
            .order_by_asc(service_orders::Column::OpenedAt)
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(mapping::service_order_to_domain)
            .collect()
    }

    async fn insert_service_order(&mut self, order: &ServiceOrder) -> Result<(), StoreError> {
        service_orders::Entity::insert(mapping::service_order_to_active(self.tenant, order)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn save_service_order(&mut self, order: &ServiceOrder) -> Result<(), StoreError> {
        let result = service_orders::Entity::update_many()
            .set(mapping::service_order_to_active(self.tenant, order)?)
            .filter(service_orders::Column::Id.eq(order.id.into_inner()))
            .filter(service_orders::Column::TenantId.eq(self.tenant_id()))
            .exec(&self.txn)
            .await
            .map_err(storage_error)?;
        ensure_affected(result.rows_affected, "service_orders", order.id.into_inner())
    }

    async fn delete_service_order(&mut self, id: ServiceOrderId) -> Result<(), StoreError> {
        service_orders::Entity::delete_many()
            .filter(service_orders::Column::Id.eq(id.into_inner()))
            .filter(service_orders::Column::TenantId.eq(self.tenant_id()))
            .exec(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    // ========== E-commerce orders ==========

    async fn ecommerce_order_for_update(
        &mut self,
        id: EcommerceOrderId,
    ) -> Result<Option<EcommerceOrder>, StoreError> {
        ecommerce_orders::Entity::find_by_id(id.into_inner())
            .filter(ecommerce_orders::Column::TenantId.eq(self.tenant_id()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(storage_error)?
            .map(mapping::ecommerce_to_domain)
            .transpose()
    }

    async fn insert_ecommerce_order(&mut self, order: &EcommerceOrder) -> Result<(), StoreError> {
        ecommerce_orders::Entity::insert(mapping::ecommerce_to_active(self.tenant, order)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn save_ecommerce_order(&mut self, order: &EcommerceOrder) -> Result<(), StoreError> {
        let result = ecommerce_orders::Entity::update_many()
            .set(mapping::ecommerce_to_active(self.tenant, order)?)
            .filter(ecommerce_orders::Column::Id.eq(order.id.into_inner()))
            .filter(ecommerce_orders::Column::TenantId.eq(self.tenant_id()))
            .exec(&self.txn)
            .await
            .map_err(storage_error)?;
        ensure_affected(result.rows_affected, "ecommerce_orders", order.id.into_inner())
    }

    async fn delete_ecommerce_order(&mut self, id: EcommerceOrderId) -> Result<(), StoreError> {
        ecommerce_orders::Entity::delete_many()
            .filter(ecommerce_orders::Column::Id.eq(id.into_inner()))
            .filter(ecommerce_orders::Column::TenantId.eq(self.tenant_id()))
            .exec(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    // ========== Sales ==========

    async fn insert_sale(&mut self, sale: &Sale) -> Result<(), StoreError> {
        sales::Entity::insert(mapping::sale_to_active(self.tenant, sale)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn sale_by_order(&mut self, order: EcommerceOrderId) -> Result<Option<Sale>, StoreError> {
        sales::Entity::find()
            .filter(sales::Column::TenantId.eq(self.tenant_id()))
            .filter(sales::Column::OrderId.eq(order.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(storage_error)?
            .map(mapping::sale_to_domain)
            .transpose()
    }

    async fn delete_sale(&mut self, id: SaleId) -> Result<(), StoreError> {
        sales::Entity::delete_many()
            .filter(sales::Column::Id.eq(id.into_inner()))
            .filter(sales::Column::TenantId.eq(self.tenant_id()))
            .exec(&self.txn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}
