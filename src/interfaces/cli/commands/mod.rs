//! CLI command implementations

mod config_gen;
mod maintenance;
mod report;
mod track;

pub use config_gen::config_generate;
pub use maintenance::{run_migrate, run_sweep_daemon, run_sweep_once};
pub use report::{show_consumer, update_tier};
pub use track::run_track;
