pub mod api;
pub mod cli;
pub mod config;
pub mod database;
pub mod errors;
pub mod ranking;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use log::info;
use serde::Serialize;

use crate::cli::Command;
use crate::config::settings::AppConfig;
use crate::database::DbPool;
use crate::ranking::types::PreferredDifficulty;
use crate::services::server::ServerService;
use crate::services::settlement::MatchSubmission;
use crate::services::statistics::system_statistics;
use crate::services::{
    AdaptiveConfigTuner, DeferredTuningQueue, MatchSettlementCoordinator, SeedRecommendationAdvisor,
    SeedStatisticsService,
};

const CLI_POOL_SIZE: u32 = 2;

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

fn open_pool(config: &AppConfig) -> Result<DbPool> {
    let pool = database::create_pool_with_size(&config.database_path, CLI_POOL_SIZE)?;
    let conn = database::get_connection(&pool)?;
    database::setup::initialize_database(&conn)?;
    Ok(pool)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{}", rendered);
    Ok(())
}

/// Accepts either a single submission or an array of them.
pub fn parse_submissions(raw: &str) -> Result<Vec<MatchSubmission>> {
    if raw.trim_start().starts_with('[') {
        serde_json::from_str(raw).context("Failed to parse match submissions")
    } else {
        let single: MatchSubmission = serde_json::from_str(raw).context("Failed to parse match submission")?;
        Ok(vec![single])
    }
}

pub fn handle_serve(port: u16) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::new();
        let service = ServerService::new(port, config);
        service.run().await
    })
}

pub fn handle_init_db(reset: bool) -> Result<()> {
    let config = AppConfig::new();
    let pool = database::create_pool_with_size(&config.database_path, 1)?;
    let conn = database::get_connection(&pool)?;

    if reset {
        database::setup::reset_database(&conn)
    } else {
        database::setup::initialize_database(&conn)
    }
}

pub fn handle_settle(file: &Path) -> Result<()> {
    let config = AppConfig::new();
    let pool = open_pool(&config)?;
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let submissions = parse_submissions(&raw)?;

    let queue = Arc::new(DeferredTuningQueue::new());
    let coordinator = MatchSettlementCoordinator::new(pool.clone(), config.clone(), queue.clone());

    for submission in &submissions {
        let placements = coordinator.settle_match(submission)?;
        print_json(&placements)?;
    }

    let tuner = AdaptiveConfigTuner::new(pool, config);
    for uid in queue.drain()? {
        let outcome = tuner.apply(&uid);
        info!("Tuning {}: {}", uid, outcome.reason);
    }

    Ok(())
}

pub fn handle_tune(uid: Option<&str>) -> Result<()> {
    let config = AppConfig::new();
    let tuner = AdaptiveConfigTuner::new(open_pool(&config)?, config);

    match uid {
        Some(uid) => print_json(&tuner.apply(uid)),
        None => print_json(&tuner.apply_all()?),
    }
}

pub fn handle_refresh_seeds(seed: Option<&str>) -> Result<()> {
    let config = AppConfig::new();
    let service = SeedStatisticsService::new(open_pool(&config)?, config.seeds);

    match seed {
        Some(seed) => print_json(&service.update(seed)?),
        None => print_json(&service.refresh_all()?),
    }
}

pub fn handle_cleanup(days: Option<i64>) -> Result<()> {
    let config = AppConfig::new();
    let service = SeedStatisticsService::new(open_pool(&config)?, config.seeds);

    let removed = match days {
        Some(days) => service.cleanup_expired(days)?,
        None => service.cleanup_default()?,
    };
    println!("Removed {} seed statistics rows", removed);
    Ok(())
}

pub fn handle_recommend(uid: &str, difficulty: PreferredDifficulty, limit: usize) -> Result<()> {
    let config = AppConfig::new();
    let advisor = SeedRecommendationAdvisor::new(open_pool(&config)?, config);
    print_json(&advisor.recommend(uid, difficulty, limit)?)
}

pub fn handle_stats() -> Result<()> {
    let config = AppConfig::new();
    let pool = open_pool(&config)?;
    print_json(&system_statistics(&pool)?)
}
