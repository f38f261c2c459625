//! 消费者活跃度汇总实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "consumer_activity_summary")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub consumer_id: i64,
    pub total_requests_sent: i64,
    pub accepted_requests: i64,
    pub rejected_requests: i64,
    pub pending_requests: i64,
    pub active_connections: i64,
    pub total_farmers_connected: i64,
    pub request_success_rate: Option<f64>,
    pub total_orders_placed: i64,
    pub total_spent: f64,
    pub average_orders_per_connection: Option<f64>,
    pub total_reviews_given: i64,
    pub user_tier: String,
    pub days_since_last_activity: i64,
    pub is_active_user: bool,
    pub last_request_sent_at: Option<DateTimeUtc>,
    pub last_order_placed_at: Option<DateTimeUtc>,
    pub last_review_given_at: Option<DateTimeUtc>,
    pub last_activity_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
