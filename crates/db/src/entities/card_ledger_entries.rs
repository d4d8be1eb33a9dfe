//! `SeaORM` Entity for card_ledger_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "card_ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub category: String,
    pub competence_at: DateTimeUtc,
    pub due_date: Date,
    pub account_id: Uuid,
    pub instrument_id: Uuid,
    pub installment: i32,
    pub installment_count: i32,
    pub source_type: String,
    pub source_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
