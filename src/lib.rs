//! Milkeyway - consumer activity aggregator
//!
//! Maintains one denormalized summary row per consumer, updated
//! incrementally as connection requests, orders and reviews happen.
//!
//! # Architecture
//! - `activity`: counter updates, derived metrics, tiers and the staleness sweep
//! - `storage`: SeaORM connection management, migrations and retry
//! - `interfaces`: command-line front end
//! - `config`: static TOML/env configuration
//! - `system`: logging

pub mod activity;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod storage;
pub mod system;
