//! 消费者活跃度聚合
//!
//! 每个消费者在 `consumer_activity_summary` 中有一行汇总，
//! 业务事件（请求发送/接受/拒绝、下单、评价）提交后由调用方同步触发增量更新。
//!
//! 所有写操作都是尽力而为的旁路：失败只记录日志并以 [`ActivityOutcome::Failed`]
//! 返回，调用方不应因此阻塞或回滚自己的主事务。

pub mod analytics;
pub mod derived;
pub mod sweep;
pub mod tier;
pub mod tracker;

use std::fmt;
use std::sync::Arc;

pub use analytics::ConsumerAnalytics;
pub use derived::{CounterSnapshot, DerivedMetrics, recompute_derived};
pub use sweep::{StalenessSweepTask, SweepReport};
pub use tier::{UserTier, classify_tier};
pub use tracker::ActivityTracker;

use crate::config::ActivityConfig;
use crate::storage::SeaOrmStorage;

/// 单次活跃度写入的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityOutcome {
    /// 已写入汇总行
    Recorded,
    /// 未写入，但不是错误
    Skipped(SkipReason),
    /// 存储错误（已记录日志）
    Failed(String),
}

impl ActivityOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, ActivityOutcome::Recorded)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ActivityOutcome::Failed(_))
    }
}

impl fmt::Display for ActivityOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityOutcome::Recorded => write!(f, "recorded"),
            ActivityOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            ActivityOutcome::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 该消费者还没有汇总行（未调用 initialize_activity / track_request_sent）
    SummaryMissing,
    /// 活跃度追踪已在配置中关闭
    TrackingDisabled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SummaryMissing => write!(f, "no summary row"),
            SkipReason::TrackingDisabled => write!(f, "tracking disabled"),
        }
    }
}

/// 业务事件生产方依赖的记录接口
#[async_trait::async_trait]
pub trait ActivityRecorder: Send + Sync {
    async fn initialize_activity(&self, consumer_id: i64) -> ActivityOutcome;

    async fn track_request_sent(&self, consumer_id: i64, farmer_id: i64) -> ActivityOutcome;

    async fn track_request_accepted(&self, consumer_id: i64, farmer_id: i64) -> ActivityOutcome;

    async fn track_request_rejected(&self, consumer_id: i64, farmer_id: i64) -> ActivityOutcome;

    async fn track_order_placed(&self, consumer_id: i64, order_amount: Option<f64>)
    -> ActivityOutcome;

    async fn track_review_given(&self, consumer_id: i64) -> ActivityOutcome;
}

/// 关闭追踪时使用的空实现
pub struct NoopRecorder;

#[async_trait::async_trait]
impl ActivityRecorder for NoopRecorder {
    async fn initialize_activity(&self, _consumer_id: i64) -> ActivityOutcome {
        ActivityOutcome::Skipped(SkipReason::TrackingDisabled)
    }

    async fn track_request_sent(&self, _consumer_id: i64, _farmer_id: i64) -> ActivityOutcome {
        ActivityOutcome::Skipped(SkipReason::TrackingDisabled)
    }

    async fn track_request_accepted(&self, _consumer_id: i64, _farmer_id: i64) -> ActivityOutcome {
        ActivityOutcome::Skipped(SkipReason::TrackingDisabled)
    }

    async fn track_request_rejected(&self, _consumer_id: i64, _farmer_id: i64) -> ActivityOutcome {
        ActivityOutcome::Skipped(SkipReason::TrackingDisabled)
    }

    async fn track_order_placed(
        &self,
        _consumer_id: i64,
        _order_amount: Option<f64>,
    ) -> ActivityOutcome {
        ActivityOutcome::Skipped(SkipReason::TrackingDisabled)
    }

    async fn track_review_given(&self, _consumer_id: i64) -> ActivityOutcome {
        ActivityOutcome::Skipped(SkipReason::TrackingDisabled)
    }
}

/// 根据配置选择记录器：`activity.enabled = false` 时返回 [`NoopRecorder`]
pub fn build_recorder(
    storage: Arc<SeaOrmStorage>,
    settings: ActivityConfig,
) -> Arc<dyn ActivityRecorder> {
    if settings.enabled {
        Arc::new(ActivityTracker::new(storage, settings))
    } else {
        tracing::info!("Consumer activity tracking is disabled");
        Arc::new(NoopRecorder)
    }
}
