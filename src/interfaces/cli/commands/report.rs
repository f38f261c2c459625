//! Analytics read and tier commands

use std::sync::Arc;

use colored::Colorize;

use crate::activity::{ActivityOutcome, ActivityTracker, ConsumerAnalytics};
use crate::config::ActivityConfig;
use crate::interfaces::cli::CliError;
use crate::storage::SeaOrmStorage;

pub async fn show_consumer(
    storage: Arc<SeaOrmStorage>,
    settings: ActivityConfig,
    consumer_id: i64,
    json: bool,
) -> Result<(), CliError> {
    let tracker = ActivityTracker::new(storage, settings);
    let Some(analytics) = tracker.get_consumer_analytics(consumer_id).await else {
        println!(
            "{} No activity recorded for consumer {}",
            "ℹ".bold().blue(),
            consumer_id.to_string().cyan()
        );
        return Ok(());
    };

    if json {
        let output = serde_json::to_string_pretty(&analytics)
            .map_err(|e| CliError::ParseError(e.to_string()))?;
        println!("{}", output);
    } else {
        print_analytics(&analytics);
    }
    Ok(())
}

pub async fn update_tier(
    storage: Arc<SeaOrmStorage>,
    settings: ActivityConfig,
    consumer_id: i64,
) -> Result<(), CliError> {
    let tracker = ActivityTracker::new(storage, settings);
    match tracker.update_user_tier(consumer_id).await {
        ActivityOutcome::Failed(msg) => Err(CliError::CommandError(msg)),
        outcome => {
            let tier = tracker
                .get_consumer_analytics(consumer_id)
                .await
                .map(|a| a.user_tier.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{} consumer {}: {} (tier: {})",
                "✓".bold().green(),
                consumer_id.to_string().cyan(),
                outcome,
                tier.magenta()
            );
            Ok(())
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string())
}

fn print_analytics(a: &ConsumerAnalytics) {
    println!(
        "{} {}",
        "Consumer".bold().green(),
        a.consumer_id.to_string().cyan()
    );
    println!();
    println!(
        "  requests:     sent {}, accepted {}, rejected {}, pending {}",
        a.total_requests_sent, a.accepted_requests, a.rejected_requests, a.pending_requests
    );
    println!("  success rate: {}", fmt_opt(a.request_success_rate));
    println!(
        "  connections:  active {}, farmers {}",
        a.active_connections, a.total_farmers_connected
    );
    println!(
        "  orders:       {} (spent {:.2}, per connection {})",
        a.total_orders_placed,
        a.total_spent,
        fmt_opt(a.average_orders_per_connection)
    );
    println!("  reviews:      {}", a.total_reviews_given);
    println!("  tier:         {}", a.user_tier.to_string().magenta());

    let status = if a.is_active_user {
        "active".green()
    } else {
        "inactive".yellow()
    };
    println!(
        "  status:       {} ({} days since last activity)",
        status, a.days_since_last_activity
    );
    println!(
        "  last activity: {}",
        a.last_activity_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
            .dimmed()
    );
}
