//! 派生指标计算
//!
//! `request_success_rate` 和 `average_orders_per_connection` 只在这里计算，
//! 每次计数器变更后都从最新计数重算，保证派生字段不会与计数脱节。

use migration::entities::consumer_activity_summary;

/// 计算派生指标所需的计数器快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub total_requests_sent: i64,
    pub accepted_requests: i64,
    pub total_orders_placed: i64,
    pub active_connections: i64,
}

impl From<&consumer_activity_summary::Model> for CounterSnapshot {
    fn from(row: &consumer_activity_summary::Model) -> Self {
        Self {
            total_requests_sent: row.total_requests_sent,
            accepted_requests: row.accepted_requests,
            total_orders_placed: row.total_orders_placed,
            active_connections: row.active_connections,
        }
    }
}

/// 派生指标
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedMetrics {
    /// accepted / sent * 100，保留两位小数；sent 为 0 时为 None
    pub request_success_rate: Option<f64>,
    /// orders / active_connections，保留两位小数；连接数为 0 时为 None
    pub average_orders_per_connection: Option<f64>,
}

pub fn recompute_derived(counters: CounterSnapshot) -> DerivedMetrics {
    DerivedMetrics {
        request_success_rate: ratio(counters.accepted_requests, counters.total_requests_sent)
            .map(|r| round2(r * 100.0)),
        average_orders_per_connection: ratio(
            counters.total_orders_placed,
            counters.active_connections,
        )
        .map(round2),
    }
}

fn ratio(numerator: i64, denominator: i64) -> Option<f64> {
    if denominator <= 0 {
        return None;
    }
    Some(numerator as f64 / denominator as f64)
}

/// 四舍五入到两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
