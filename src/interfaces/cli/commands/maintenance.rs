//! Schema and sweep commands

use std::sync::Arc;

use colored::Colorize;
use tracing::info;

use crate::activity::{ActivityTracker, StalenessSweepTask, SweepReport};
use crate::config::ActivityConfig;
use crate::interfaces::cli::CliError;
use crate::storage::SeaOrmStorage;

/// 迁移已在建立连接时执行，这里只报告结果
pub async fn run_migrate(storage: Arc<SeaOrmStorage>) -> Result<(), CliError> {
    println!(
        "{} {} schema is up to date",
        "✓".bold().green(),
        storage.backend_name().to_uppercase().cyan()
    );
    Ok(())
}

pub async fn run_sweep_once(
    storage: Arc<SeaOrmStorage>,
    settings: ActivityConfig,
) -> Result<(), CliError> {
    let tracker = ActivityTracker::new(storage, settings);
    let report = tracker
        .update_activity_status()
        .await
        .ok_or_else(|| CliError::CommandError("Activity sweep failed, see logs".to_string()))?;
    print_report(&report);
    Ok(())
}

/// 前台运行周期清扫，直到收到 Ctrl+C
pub async fn run_sweep_daemon(
    storage: Arc<SeaOrmStorage>,
    settings: ActivityConfig,
) -> Result<(), CliError> {
    let tracker = Arc::new(ActivityTracker::new(storage, settings));
    let task = Arc::new(StalenessSweepTask::new(tracker));
    let handle = task.spawn_background_task();

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| CliError::CommandError(format!("Failed to listen for Ctrl+C: {}", e)))?;

    info!("Shutdown signal received, stopping activity sweep");
    handle.abort();
    Ok(())
}

fn print_report(report: &SweepReport) {
    println!("{}", "Activity sweep completed".bold().green());
    println!("  scanned:  {}", report.scanned.to_string().cyan());
    println!("  active:   {}", report.active.to_string().green());
    println!("  inactive: {}", report.inactive.to_string().yellow());
}
