//! Track event command

use std::sync::Arc;

use colored::Colorize;

use crate::activity::{ActivityOutcome, build_recorder};
use crate::cli::TrackCommands;
use crate::config::ActivityConfig;
use crate::interfaces::cli::CliError;
use crate::storage::SeaOrmStorage;

pub async fn run_track(
    storage: Arc<SeaOrmStorage>,
    settings: ActivityConfig,
    event: TrackCommands,
) -> Result<(), CliError> {
    let recorder = build_recorder(storage, settings);

    let (label, consumer_id, outcome) = match event {
        TrackCommands::Init { consumer_id } => (
            "init",
            consumer_id,
            recorder.initialize_activity(consumer_id).await,
        ),
        TrackCommands::Sent {
            consumer_id,
            farmer_id,
        } => (
            "request sent",
            consumer_id,
            recorder.track_request_sent(consumer_id, farmer_id).await,
        ),
        TrackCommands::Accepted {
            consumer_id,
            farmer_id,
        } => (
            "request accepted",
            consumer_id,
            recorder.track_request_accepted(consumer_id, farmer_id).await,
        ),
        TrackCommands::Rejected {
            consumer_id,
            farmer_id,
        } => (
            "request rejected",
            consumer_id,
            recorder.track_request_rejected(consumer_id, farmer_id).await,
        ),
        TrackCommands::Order {
            consumer_id,
            amount,
        } => (
            "order placed",
            consumer_id,
            recorder.track_order_placed(consumer_id, amount).await,
        ),
        TrackCommands::Review { consumer_id } => (
            "review given",
            consumer_id,
            recorder.track_review_given(consumer_id).await,
        ),
    };

    match outcome {
        ActivityOutcome::Recorded => {
            println!(
                "{} {} for consumer {}",
                "✓".bold().green(),
                label,
                consumer_id.to_string().cyan()
            );
            Ok(())
        }
        ActivityOutcome::Skipped(reason) => {
            println!(
                "{} {} for consumer {} skipped: {}",
                "ℹ".bold().blue(),
                label,
                consumer_id.to_string().cyan(),
                reason.to_string().yellow()
            );
            Ok(())
        }
        ActivityOutcome::Failed(msg) => Err(CliError::StorageError(msg)),
    }
}
