//! Row-Level Security (RLS) context management.
//!
//! Every tenant table carries a `tenant_isolation` policy comparing
//! `tenant_id` with the `app.current_tenant_id` setting. The setting is
//! transaction-local, so it has to be set right after `BEGIN` and is gone
//! again once the transaction ends.

use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseTransaction, DbErr, Statement};
use storeledger_shared::types::TenantId;

/// Name of the session setting the policies read.
pub const TENANT_SETTING: &str = "app.current_tenant_id";

/// Statement that scopes the current transaction to `tenant`.
///
/// Uses `set_config(..., true)`, the parameterised form of `SET LOCAL`.
#[must_use]
pub fn tenant_context_statement(tenant: TenantId) -> Statement {
    Statement::from_sql_and_values(
        DatabaseBackend::Postgres,
        "SELECT set_config($1, $2, true)",
        [TENANT_SETTING.into(), tenant.to_string().into()],
    )
}

/// Sets the RLS context on an open transaction.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub async fn set_tenant_context(txn: &DatabaseTransaction, tenant: TenantId) -> Result<(), DbErr> {
    txn.execute(tenant_context_statement(tenant)).await?;
    Ok(())
}
