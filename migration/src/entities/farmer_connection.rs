//! Farmer/consumer connection entity (owned by the connection-request service, read-only here)

use sea_orm::entity::prelude::*;

/// 连接处于生效状态时的 status 值
pub const STATUS_ACTIVE: &str = "active";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "connections")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub consumer_id: i64,
    pub farmer_id: i64,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
