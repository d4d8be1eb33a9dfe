//! `SeaORM` Entity for service_orders table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "service_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub status: String,
    pub description: String,
    pub customer_name: String,
    pub customer_id: Option<Uuid>,
    #[sea_orm(column_type = "JsonBinary")]
    pub parts: Json,
    pub price: Decimal,
    pub cost: Decimal,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub receipt: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub cost_payment: Option<Json>,
    /// Set when generated by an e-commerce delivery.
    pub origin_order_id: Option<Uuid>,
    pub opened_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
