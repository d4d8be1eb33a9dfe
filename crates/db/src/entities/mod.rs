//! `SeaORM` entities.
//!
//! Every table carries `tenant_id`; row-level security policies filter on it
//! and the ledger store adds an explicit filter to each query as well.

pub mod card_ledger_entries;
pub mod customers;
pub mod ecommerce_orders;
pub mod financial_accounts;
pub mod ledger_entries;
pub mod payment_instruments;
pub mod purchase_orders;
pub mod sales;
pub mod service_orders;
pub mod stock_items;
