//! `SeaORM` Entity for financial_accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "financial_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payment_instruments::Entity")]
    PaymentInstruments,
}

impl Related<super::payment_instruments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentInstruments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
