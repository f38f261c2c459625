//! 单个消费者的分析视图（只读）

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::UserTier;
use migration::entities::consumer_activity_summary;

/// 汇总行的完整投影，供外部报表使用
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumerAnalytics {
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
    pub user_tier: UserTier,
    pub days_since_last_activity: i64,
    pub is_active_user: bool,
    pub last_request_sent_at: Option<DateTime<Utc>>,
    pub last_order_placed_at: Option<DateTime<Utc>>,
    pub last_review_given_at: Option<DateTime<Utc>>,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<consumer_activity_summary::Model> for ConsumerAnalytics {
    fn from(row: consumer_activity_summary::Model) -> Self {
        let user_tier = UserTier::from_str(&row.user_tier).unwrap_or_else(|_| {
            warn!(
                "Unknown user tier '{}' for consumer {}, reporting as regular",
                row.user_tier, row.consumer_id
            );
            UserTier::Regular
        });

        Self {
            consumer_id: row.consumer_id,
            total_requests_sent: row.total_requests_sent,
            accepted_requests: row.accepted_requests,
            rejected_requests: row.rejected_requests,
            pending_requests: row.pending_requests,
            active_connections: row.active_connections,
            total_farmers_connected: row.total_farmers_connected,
            request_success_rate: row.request_success_rate,
            total_orders_placed: row.total_orders_placed,
            total_spent: row.total_spent,
            average_orders_per_connection: row.average_orders_per_connection,
            total_reviews_given: row.total_reviews_given,
            user_tier,
            days_since_last_activity: row.days_since_last_activity,
            is_active_user: row.is_active_user,
            last_request_sent_at: row.last_request_sent_at,
            last_order_placed_at: row.last_order_placed_at,
            last_review_given_at: row.last_review_given_at,
            last_activity_at: row.last_activity_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
