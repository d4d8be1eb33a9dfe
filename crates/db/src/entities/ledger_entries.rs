//! `SeaORM` Entity for ledger_entries table (the cash ledger).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Short external reference derived from `id`.
    pub public_id: String,
    pub description: String,
    pub amount: Decimal,
    pub flow: String,
    pub category: String,
    pub status: String,
    pub competence_at: DateTimeUtc,
    pub due_date: Date,
    pub paid_at: Option<DateTimeUtc>,
    pub origin_type: Option<String>,
    pub origin_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub instrument_id: Option<Uuid>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub installment_plan: Option<Json>,
    pub is_consolidated_invoice: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
