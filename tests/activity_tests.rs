//! 活跃度聚合集成测试
//!
//! 使用临时 SQLite 数据库覆盖 ActivityTracker 的全部写操作、
//! 等级计算、分析读取以及活跃状态清扫。

use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::{NotSet, Set}, ConnectionTrait, EntityTrait};
use tempfile::TempDir;

use milkeyway::activity::{
    ActivityOutcome, ActivityRecorder, ActivityTracker, SkipReason, StalenessSweepTask, UserTier,
    build_recorder,
};
use milkeyway::config::{ActivityConfig, DatabaseConfig};
use milkeyway::storage::SeaOrmStorage;
use migration::entities::{consumer_activity_summary, farmer_connection};

// =============================================================================
// 辅助函数
// =============================================================================

async fn create_temp_storage(config: DatabaseConfig) -> (Arc<SeaOrmStorage>, TempDir) {
    let td = TempDir::new().unwrap();
    let p = td.path().join("activity.db");
    let u = format!("sqlite://{}?mode=rwc", p.display());
    let s = SeaOrmStorage::new(&u, "sqlite", &config).await.unwrap();
    (Arc::new(s), td)
}

async fn create_tracker() -> (ActivityTracker, Arc<SeaOrmStorage>, TempDir) {
    create_tracker_with(ActivityConfig::default()).await
}

async fn create_tracker_with(
    settings: ActivityConfig,
) -> (ActivityTracker, Arc<SeaOrmStorage>, TempDir) {
    let (storage, td) = create_temp_storage(DatabaseConfig::default()).await;
    (ActivityTracker::new(storage.clone(), settings), storage, td)
}

async fn load_row(storage: &SeaOrmStorage, consumer_id: i64) -> consumer_activity_summary::Model {
    consumer_activity_summary::Entity::find_by_id(consumer_id)
        .one(storage.get_db())
        .await
        .unwrap()
        .expect("summary row should exist")
}

async fn insert_connection(storage: &SeaOrmStorage, consumer_id: i64, farmer_id: i64, status: &str) {
    farmer_connection::ActiveModel {
        id: NotSet,
        consumer_id: Set(consumer_id),
        farmer_id: Set(farmer_id),
        status: Set(status.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(storage.get_db())
    .await
    .unwrap();
}

// =============================================================================
// 初始化
// =============================================================================

#[tokio::test]
async fn test_initialize_activity_creates_zeroed_row() {
    let (tracker, storage, _td) = create_tracker().await;

    assert_eq!(tracker.initialize_activity(1).await, ActivityOutcome::Recorded);

    let row = load_row(&storage, 1).await;
    assert_eq!(row.total_requests_sent, 0);
    assert_eq!(row.pending_requests, 0);
    assert_eq!(row.total_spent, 0.0);
    assert_eq!(row.request_success_rate, None);
    assert_eq!(row.average_orders_per_connection, None);
    assert_eq!(row.user_tier, "regular");
    assert!(row.is_active_user);
    assert_eq!(row.days_since_last_activity, 0);
    assert!(row.last_request_sent_at.is_none());
}

#[tokio::test]
async fn test_initialize_activity_is_idempotent() {
    let (tracker, storage, _td) = create_tracker().await;

    tracker.initialize_activity(2).await;
    tracker.track_request_sent(2, 100).await;
    let before = load_row(&storage, 2).await;

    assert_eq!(tracker.initialize_activity(2).await, ActivityOutcome::Recorded);

    let after = load_row(&storage, 2).await;
    assert_eq!(before, after);
    assert_eq!(after.total_requests_sent, 1);
}

// =============================================================================
// 连接请求
// =============================================================================

#[tokio::test]
async fn test_request_sent_creates_row_on_first_event() {
    let (tracker, storage, _td) = create_tracker().await;

    assert_eq!(tracker.track_request_sent(3, 100).await, ActivityOutcome::Recorded);

    let row = load_row(&storage, 3).await;
    assert_eq!(row.total_requests_sent, 1);
    assert_eq!(row.pending_requests, 1);
    assert!(row.last_request_sent_at.is_some());
    assert_eq!(row.last_request_sent_at, Some(row.last_activity_at));
}

#[tokio::test]
async fn test_n_requests_sent_equal_pending() {
    let (tracker, storage, _td) = create_tracker().await;

    for farmer_id in 0..5 {
        tracker.track_request_sent(4, farmer_id).await;
    }

    let row = load_row(&storage, 4).await;
    assert_eq!(row.total_requests_sent, 5);
    assert_eq!(row.pending_requests, 5);
    // 发送过请求但尚无接受
    assert_eq!(row.request_success_rate, Some(0.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_sent_do_not_lose_updates() {
    let (storage, _td) = create_temp_storage(DatabaseConfig::default()).await;
    let tracker = Arc::new(ActivityTracker::new(storage.clone(), ActivityConfig::default()));
    tracker.initialize_activity(5).await;

    let mut handles = Vec::new();
    for farmer_id in 0..10 {
        let tracker = tracker.clone();
        handles.push(tokio::spawn(async move {
            tracker.track_request_sent(5, farmer_id).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), ActivityOutcome::Recorded);
    }

    let row = load_row(&storage, 5).await;
    assert_eq!(row.total_requests_sent, 10);
    assert_eq!(row.pending_requests, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_and_rejects_do_not_lose_updates() {
    let (storage, _td) = create_temp_storage(DatabaseConfig::default()).await;
    let tracker = Arc::new(ActivityTracker::new(storage.clone(), ActivityConfig::default()));

    for farmer_id in 0..20 {
        tracker.track_request_sent(23, farmer_id).await;
    }

    let mut handles = Vec::new();
    for farmer_id in 0..20 {
        let tracker = tracker.clone();
        handles.push(tokio::spawn(async move {
            if farmer_id % 2 == 0 {
                tracker.track_request_accepted(23, farmer_id).await
            } else {
                tracker.track_request_rejected(23, farmer_id).await
            }
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), ActivityOutcome::Recorded);
    }

    let row = load_row(&storage, 23).await;
    assert_eq!(row.accepted_requests, 10);
    assert_eq!(row.rejected_requests, 10);
    assert_eq!(row.active_connections, 10);
    assert_eq!(row.pending_requests, 0);
    assert_eq!(row.request_success_rate, Some(50.0));
}

#[tokio::test]
async fn test_send_then_accept() {
    let (tracker, storage, _td) = create_tracker().await;

    tracker.track_request_sent(6, 100).await;
    assert_eq!(
        tracker.track_request_accepted(6, 100).await,
        ActivityOutcome::Recorded
    );

    let row = load_row(&storage, 6).await;
    assert_eq!(row.pending_requests, 0);
    assert_eq!(row.accepted_requests, 1);
    assert_eq!(row.active_connections, 1);
    assert_eq!(row.request_success_rate, Some(100.0));
    assert_eq!(row.average_orders_per_connection, Some(0.0));
}

#[tokio::test]
async fn test_send_then_reject() {
    let (tracker, storage, _td) = create_tracker().await;

    tracker.track_request_sent(7, 100).await;
    tracker.track_request_rejected(7, 100).await;

    let row = load_row(&storage, 7).await;
    assert_eq!(row.pending_requests, 0);
    assert_eq!(row.rejected_requests, 1);
    assert_eq!(row.active_connections, 0);
    assert_eq!(row.request_success_rate, Some(0.0));
}

#[tokio::test]
async fn test_accept_without_summary_is_skipped() {
    let (tracker, storage, _td) = create_tracker().await;

    assert_eq!(
        tracker.track_request_accepted(8, 100).await,
        ActivityOutcome::Skipped(SkipReason::SummaryMissing)
    );
    assert_eq!(
        tracker.track_request_rejected(8, 100).await,
        ActivityOutcome::Skipped(SkipReason::SummaryMissing)
    );

    let missing = consumer_activity_summary::Entity::find_by_id(8)
        .one(storage.get_db())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_pending_is_clamped_at_zero_by_default() {
    let (tracker, storage, _td) = create_tracker().await;

    tracker.initialize_activity(9).await;
    tracker.track_request_accepted(9, 100).await;
    tracker.track_request_rejected(9, 101).await;

    let row = load_row(&storage, 9).await;
    assert_eq!(row.pending_requests, 0);
    assert_eq!(row.accepted_requests, 1);
    assert_eq!(row.rejected_requests, 1);
    // sent 为 0 时成功率未定义
    assert_eq!(row.request_success_rate, None);
}

#[tokio::test]
async fn test_pending_goes_negative_when_clamp_disabled() {
    let settings = ActivityConfig {
        clamp_pending: false,
        ..Default::default()
    };
    let (tracker, storage, _td) = create_tracker_with(settings).await;

    tracker.initialize_activity(10).await;
    tracker.track_request_rejected(10, 100).await;

    let row = load_row(&storage, 10).await;
    assert_eq!(row.pending_requests, -1);
}

#[tokio::test]
async fn test_accept_counts_distinct_active_farmers() {
    let (tracker, storage, _td) = create_tracker().await;

    insert_connection(&storage, 11, 100, "active").await;
    insert_connection(&storage, 11, 100, "active").await;
    insert_connection(&storage, 11, 101, "active").await;
    insert_connection(&storage, 11, 102, "pending").await;
    insert_connection(&storage, 12, 103, "active").await;

    tracker.track_request_sent(11, 101).await;
    tracker.track_request_accepted(11, 101).await;

    let row = load_row(&storage, 11).await;
    assert_eq!(row.total_farmers_connected, 2);
}

// =============================================================================
// 订单与评价
// =============================================================================

#[tokio::test]
async fn test_order_placed_accumulates_spend() {
    let (tracker, storage, _td) = create_tracker().await;

    tracker.initialize_activity(13).await;
    tracker.track_order_placed(13, Some(120.5)).await;
    tracker.track_order_placed(13, None).await;
    tracker.track_order_placed(13, Some(f64::NAN)).await;
    tracker.track_order_placed(13, Some(-40.0)).await;

    let row = load_row(&storage, 13).await;
    assert_eq!(row.total_orders_placed, 4);
    // 负数金额照常累加
    assert!((row.total_spent - 80.5).abs() < 1e-9);
    assert!(row.last_order_placed_at.is_some());
    // 没有活跃连接
    assert_eq!(row.average_orders_per_connection, None);
}

#[tokio::test]
async fn test_order_and_review_without_summary_are_skipped() {
    let (tracker, _storage, _td) = create_tracker().await;

    assert_eq!(
        tracker.track_order_placed(14, Some(10.0)).await,
        ActivityOutcome::Skipped(SkipReason::SummaryMissing)
    );
    assert_eq!(
        tracker.track_review_given(14).await,
        ActivityOutcome::Skipped(SkipReason::SummaryMissing)
    );
    assert!(tracker.get_consumer_analytics(14).await.is_none());
}

#[tokio::test]
async fn test_review_given() {
    let (tracker, storage, _td) = create_tracker().await;

    tracker.initialize_activity(15).await;
    tracker.track_review_given(15).await;
    tracker.track_review_given(15).await;

    let row = load_row(&storage, 15).await;
    assert_eq!(row.total_reviews_given, 2);
    assert_eq!(row.last_review_given_at, Some(row.last_activity_at));
}

#[tokio::test]
async fn test_consumer_lifecycle_scenario() {
    let (tracker, storage, _td) = create_tracker().await;
    let c1 = 16;

    for farmer_id in [100, 101, 102] {
        tracker.track_request_sent(c1, farmer_id).await;
    }
    let row = load_row(&storage, c1).await;
    assert_eq!(row.total_requests_sent, 3);
    assert_eq!(row.pending_requests, 3);

    tracker.track_request_accepted(c1, 100).await;
    let row = load_row(&storage, c1).await;
    assert_eq!(row.accepted_requests, 1);
    assert_eq!(row.pending_requests, 2);
    assert_eq!(row.request_success_rate, Some(33.33));

    tracker.track_request_rejected(c1, 101).await;
    let row = load_row(&storage, c1).await;
    assert_eq!(row.rejected_requests, 1);
    assert_eq!(row.pending_requests, 1);
    assert_eq!(row.request_success_rate, Some(33.33));

    tracker.track_order_placed(c1, Some(500.0)).await;
    let row = load_row(&storage, c1).await;
    assert_eq!(row.total_orders_placed, 1);
    assert_eq!(row.total_spent, 500.0);
    assert_eq!(row.average_orders_per_connection, Some(1.0));
}

// =============================================================================
// 等级
// =============================================================================

/// 5 次发送、4 次接受（成功率 80），再下 orders 笔订单
async fn build_history(tracker: &ActivityTracker, consumer_id: i64, amounts: &[f64]) {
    for farmer_id in 0..5 {
        tracker.track_request_sent(consumer_id, farmer_id).await;
    }
    for farmer_id in 0..4 {
        tracker.track_request_accepted(consumer_id, farmer_id).await;
    }
    tracker.track_request_rejected(consumer_id, 4).await;
    for amount in amounts {
        tracker.track_order_placed(consumer_id, Some(*amount)).await;
    }
}

#[tokio::test]
async fn test_update_user_tier_vip() {
    let (tracker, _storage, _td) = create_tracker().await;

    build_history(&tracker, 17, &[100.0; 50]).await;
    assert_eq!(tracker.update_user_tier(17).await, ActivityOutcome::Recorded);

    let analytics = tracker.get_consumer_analytics(17).await.unwrap();
    assert_eq!(analytics.request_success_rate, Some(80.0));
    assert_eq!(analytics.total_orders_placed, 50);
    assert_eq!(analytics.user_tier, UserTier::Vip);
}

#[tokio::test]
async fn test_update_user_tier_just_below_vip_is_premium() {
    let (tracker, _storage, _td) = create_tracker().await;

    let mut amounts = vec![100.0; 49];
    amounts.push(99.0);
    build_history(&tracker, 18, &amounts).await;
    tracker.update_user_tier(18).await;

    let analytics = tracker.get_consumer_analytics(18).await.unwrap();
    assert!((analytics.total_spent - 4999.0).abs() < 1e-9);
    assert_eq!(analytics.user_tier, UserTier::Premium);
}

#[tokio::test]
async fn test_update_user_tier_stays_regular_and_skips_missing() {
    let (tracker, _storage, _td) = create_tracker().await;

    tracker.initialize_activity(19).await;
    tracker.update_user_tier(19).await;
    let analytics = tracker.get_consumer_analytics(19).await.unwrap();
    assert_eq!(analytics.user_tier, UserTier::Regular);

    assert_eq!(
        tracker.update_user_tier(20).await,
        ActivityOutcome::Skipped(SkipReason::SummaryMissing)
    );
}

#[tokio::test]
async fn test_tier_is_not_recomputed_by_events() {
    let (tracker, _storage, _td) = create_tracker().await;

    build_history(&tracker, 21, &[100.0; 50]).await;

    let analytics = tracker.get_consumer_analytics(21).await.unwrap();
    assert_eq!(analytics.user_tier, UserTier::Regular);
}

// =============================================================================
// 清扫
// =============================================================================

#[tokio::test]
async fn test_sweep_marks_inactive_after_threshold() {
    let (tracker, storage, _td) = create_tracker().await;

    tracker.initialize_activity(22).await;
    let before = load_row(&storage, 22).await;

    let report = tracker
        .update_activity_status_at(Utc::now() + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.active, 1);
    let row = load_row(&storage, 22).await;
    assert_eq!(row.days_since_last_activity, 30);
    assert!(row.is_active_user);

    let report = tracker
        .update_activity_status_at(Utc::now() + Duration::days(31))
        .await
        .unwrap();
    assert_eq!(report.inactive, 1);
    let row = load_row(&storage, 22).await;
    assert_eq!(row.days_since_last_activity, 31);
    assert!(!row.is_active_user);

    // 清扫不修改 updated_at 和计数
    assert_eq!(row.updated_at, before.updated_at);
    assert_eq!(row.total_requests_sent, before.total_requests_sent);
}

#[tokio::test]
async fn test_sweep_groups_multiple_consumers() {
    let (tracker, storage, _td) = create_tracker().await;

    for consumer_id in 30..35 {
        tracker.initialize_activity(consumer_id).await;
    }

    let report = tracker.update_activity_status().await.unwrap();
    assert_eq!(report.scanned, 5);
    assert_eq!(report.active, 5);
    assert_eq!(report.inactive, 0);
    assert!(load_row(&storage, 33).await.is_active_user);
}

#[tokio::test]
async fn test_activity_after_sweep_reactivates_on_next_sweep() {
    let (tracker, storage, _td) = create_tracker().await;

    tracker.initialize_activity(40).await;
    tracker
        .update_activity_status_at(Utc::now() + Duration::days(45))
        .await
        .unwrap();
    assert!(!load_row(&storage, 40).await.is_active_user);

    tracker.track_review_given(40).await;
    tracker.update_activity_status().await.unwrap();
    let row = load_row(&storage, 40).await;
    assert!(row.is_active_user);
    assert_eq!(row.days_since_last_activity, 0);
}

#[tokio::test]
async fn test_sweep_task_run_once() {
    let (storage, _td) = create_temp_storage(DatabaseConfig::default()).await;
    let tracker = Arc::new(ActivityTracker::new(storage.clone(), ActivityConfig::default()));
    tracker.initialize_activity(50).await;

    let task = StalenessSweepTask::new(tracker);
    let report = task.run_once().await.unwrap();
    assert_eq!(report.scanned, 1);
}

// =============================================================================
// 存储故障
// =============================================================================

#[tokio::test]
async fn test_store_failure_is_reported_not_propagated() {
    let (tracker, storage, _td) = create_tracker().await;

    tracker.initialize_activity(80).await;
    storage
        .get_db()
        .execute_unprepared("DROP TABLE consumer_activity_summary")
        .await
        .unwrap();

    assert!(tracker.track_order_placed(80, Some(10.0)).await.is_failure());
    assert!(tracker.track_request_sent(80, 1).await.is_failure());
    assert!(tracker.update_user_tier(80).await.is_failure());
    assert!(tracker.get_consumer_analytics(80).await.is_none());
    assert!(tracker.update_activity_status().await.is_none());
}

// =============================================================================
// 读取与记录器
// =============================================================================

#[tokio::test]
async fn test_get_consumer_analytics_untracked_is_none() {
    let (tracker, _storage, _td) = create_tracker().await;
    assert!(tracker.get_consumer_analytics(999).await.is_none());
}

#[tokio::test]
async fn test_analytics_serializes_tier_lowercase() {
    let (tracker, _storage, _td) = create_tracker().await;

    tracker.track_request_sent(60, 1).await;
    let analytics = tracker.get_consumer_analytics(60).await.unwrap();
    let json = serde_json::to_value(&analytics).unwrap();
    assert_eq!(json["user_tier"], "regular");
    assert_eq!(json["total_requests_sent"], 1);
}

#[tokio::test]
async fn test_build_recorder_respects_enabled_flag() {
    let (storage, _td) = create_temp_storage(DatabaseConfig::default()).await;

    let disabled = build_recorder(
        storage.clone(),
        ActivityConfig {
            enabled: false,
            ..Default::default()
        },
    );
    assert_eq!(
        disabled.track_request_sent(70, 1).await,
        ActivityOutcome::Skipped(SkipReason::TrackingDisabled)
    );

    let enabled: Arc<dyn ActivityRecorder> = build_recorder(storage.clone(), ActivityConfig::default());
    assert_eq!(enabled.track_request_sent(70, 1).await, ActivityOutcome::Recorded);
    assert_eq!(load_row(&storage, 70).await.total_requests_sent, 1);
}
