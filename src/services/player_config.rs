use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use log::{debug, info, warn};
use rusqlite::{Connection, TransactionBehavior};

use crate::config::settings::{AppConfig, RankingSettings};
use crate::config::tiers::{DEFAULT_MAX_RANK, get_tier_defaults, get_tier_protection};
use crate::database::{self, DbPool, configs, metrics, protection};
use crate::errors::RankingError;
use crate::ranking::types::{
    ConfigPatch, PerformanceMetrics, PlayerRankingConfig, ProtectionStatus, SegmentTier,
};
use crate::ranking::validate_bands;

/// Tier default configuration for a brand new player.
pub fn default_config(uid: &str, tier: SegmentTier, now: NaiveDateTime) -> PlayerRankingConfig {
    let defaults = get_tier_defaults(tier);

    PlayerRankingConfig {
        uid: uid.to_string(),
        segment_tier: tier,
        score_thresholds: defaults.score_bands(),
        max_rank: DEFAULT_MAX_RANK,
        adaptive_mode: defaults.adaptive_mode,
        learning_rate: defaults.learning_rate,
        ranking_mode: defaults.ranking_mode,
        auto_adjust_learning_rate: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn default_protection(uid: &str, tier: SegmentTier) -> ProtectionStatus {
    let defaults = get_tier_protection(tier);

    ProtectionStatus {
        uid: uid.to_string(),
        protection_level: defaults.initial_level,
        grace_period: defaults.grace_period,
        protection_duration_days: defaults.duration_days,
        is_active: defaults.initial_level > 0,
        last_update_match: None,
    }
}

/// Loads the stored config, materializing the tier default when absent. A
/// stored row that no longer parses is overwritten with the default.
pub fn get_or_create(conn: &Connection, uid: &str, tier: SegmentTier) -> Result<PlayerRankingConfig> {
    match configs::find_config(conn, uid) {
        Ok(Some(existing)) => Ok(existing),
        Ok(None) => {
            debug!("No ranking config for {}, creating {} default", uid, tier);
            configs::insert_config_if_absent(conn, &default_config(uid, tier, Utc::now().naive_utc()))
        }
        Err(e) if matches!(e.downcast_ref::<RankingError>(), Some(RankingError::NotFound { .. })) => {
            warn!("Replacing unreadable ranking config for {} with {} default: {}", uid, tier, e);
            let fresh = default_config(uid, tier, Utc::now().naive_utc());
            configs::replace_config(conn, &fresh)?;
            Ok(fresh)
        }
        Err(e) => Err(e),
    }
}

pub fn validate_config(config: &PlayerRankingConfig, settings: &RankingSettings) -> Result<(), RankingError> {
    if config.max_rank == 0 {
        return Err(RankingError::InvalidConfig("maxRank must be at least 1".to_string()));
    }

    let rate = config.learning_rate;
    if !rate.is_finite() || rate < settings.min_learning_rate || rate > settings.max_learning_rate {
        return Err(RankingError::InvalidConfig(format!(
            "learningRate {} outside [{}, {}]",
            rate, settings.min_learning_rate, settings.max_learning_rate
        )));
    }

    validate_bands(&config.score_thresholds, settings.probability_tolerance)
        .map_err(RankingError::InvalidConfig)
}

pub struct PlayerConfigService {
    pool: DbPool,
    config: AppConfig,
}

impl PlayerConfigService {
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        Self { pool, config }
    }

    pub fn get_player_config(&self, uid: &str) -> Result<PlayerRankingConfig> {
        let conn = database::get_connection(&self.pool)?;
        get_or_create(&conn, uid, SegmentTier::default())
    }

    /// Applies an admin patch. Returns false when the player has no config or
    /// the patched config would be invalid; an unreadable stored config is a
    /// `NotFound` error.
    pub fn update_player_config(&self, uid: &str, patch: &ConfigPatch) -> Result<bool> {
        if patch.is_empty() {
            return Ok(false);
        }

        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut config) = configs::find_config(&tx, uid)? else {
            info!("Config update skipped: no config for {}", uid);
            return Ok(false);
        };

        patch.apply_to(&mut config);
        if let Err(e) = validate_config(&config, &self.config.ranking) {
            warn!("Rejected config update for {}: {}", uid, e);
            return Ok(false);
        }

        config.updated_at = Utc::now().naive_utc();
        let updated = configs::update_config(&tx, &config)?;
        tx.commit()?;

        info!("Updated ranking config for {}", uid);
        Ok(updated)
    }

    /// Restores tier defaults while keeping the player's tier and creation time.
    pub fn reset_player_config(&self, uid: &str) -> Result<bool> {
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(existing) = configs::find_config(&tx, uid)? else {
            return Ok(false);
        };

        let mut fresh = default_config(uid, existing.segment_tier, Utc::now().naive_utc());
        fresh.created_at = existing.created_at;
        let updated = configs::update_config(&tx, &fresh)?;
        tx.commit()?;

        info!("Reset ranking config for {} to {} defaults", uid, existing.segment_tier);
        Ok(updated)
    }

    pub fn get_performance_metrics(&self, uid: &str) -> Result<PerformanceMetrics> {
        let conn = database::get_connection(&self.pool)?;
        Ok(metrics::find_metrics(&conn, uid)?.unwrap_or_else(|| PerformanceMetrics::empty(uid)))
    }

    pub fn get_protection_status(&self, uid: &str) -> Result<Option<ProtectionStatus>> {
        let conn = database::get_connection(&self.pool)?;
        protection::find_protection(&conn, uid)
    }
}
