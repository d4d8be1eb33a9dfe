//! Enables FORCE ROW LEVEL SECURITY on every tenant table so the policies
//! also bind the table owner the service connects as.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const TENANT_TABLES: [&str; 10] = [
    "financial_accounts",
    "payment_instruments",
    "stock_items",
    "customers",
    "ledger_entries",
    "card_ledger_entries",
    "purchase_orders",
    "service_orders",
    "ecommerce_orders",
    "sales",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for table in TENANT_TABLES {
            db.execute_unprepared(&format!("ALTER TABLE {table} FORCE ROW LEVEL SECURITY"))
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for table in TENANT_TABLES {
            db.execute_unprepared(&format!("ALTER TABLE {table} NO FORCE ROW LEVEL SECURITY"))
                .await?;
        }
        Ok(())
    }
}
