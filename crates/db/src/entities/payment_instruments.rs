//! `SeaORM` Entity for payment_instruments table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_instruments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    /// One of `pix`, `debit`, `boleto`, `credit`.
    pub kind: String,
    /// Credit only.
    pub closing_day: Option<i32>,
    /// Credit only.
    pub due_day: Option<i32>,
    pub tax_rate: Decimal,
    pub days_to_receive: i32,
    pub min_installments: i32,
    pub max_installments: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::financial_accounts::Entity",
        from = "Column::AccountId",
        to = "super::financial_accounts::Column::Id"
    )]
    FinancialAccounts,
}

impl Related<super::financial_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FinancialAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
