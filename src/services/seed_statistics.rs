use anyhow::Result;
use chrono::{Duration, Utc};
use log::{info, warn};
use rusqlite::TransactionBehavior;
use serde::Serialize;

use crate::config::settings::SeedStatsSettings;
use crate::database::{self, DbPool, SeedStatistics, match_results, seed_stats};
use crate::errors::RankingError;
use crate::ranking::types::DifficultyLevel;

/// Result of folding new match records into a seed's aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUpdate {
    pub seed: String,
    pub updated: bool,
    pub new_records: usize,
    pub stats: Option<SeedStatistics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedDifficulty {
    pub seed: String,
    pub coefficient: f64,
    pub level: DifficultyLevel,
    pub sample_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub seeds: usize,
    pub updated: usize,
    pub failed: usize,
}

/// `reference / mean` clamped and rounded to two decimals, or an
/// InsufficientData error when the aggregate cannot support it.
pub fn compute_coefficient(
    stats: Option<&SeedStatistics>,
    settings: &SeedStatsSettings,
) -> Result<f64, RankingError> {
    let available = stats.map_or(0, |s| s.score_count);
    if available < settings.min_samples {
        return Err(RankingError::InsufficientData {
            required: settings.min_samples.max(0) as usize,
            available: available.max(0) as usize,
        });
    }

    let mean = stats.map_or(0.0, |s| s.average_score());
    if !mean.is_finite() || mean <= 0.0 {
        return Err(RankingError::InsufficientData {
            required: settings.min_samples.max(0) as usize,
            available: 0,
        });
    }

    let raw = (settings.reference_score / mean).clamp(settings.min_coefficient, settings.max_coefficient);
    Ok((raw * 100.0).round() / 100.0)
}

/// Neutral 1.0 whenever the aggregate is too thin.
pub fn coefficient_or_neutral(stats: Option<&SeedStatistics>, settings: &SeedStatsSettings) -> f64 {
    compute_coefficient(stats, settings).unwrap_or(1.0)
}

pub struct SeedStatisticsService {
    pool: DbPool,
    settings: SeedStatsSettings,
}

impl SeedStatisticsService {
    pub fn new(pool: DbPool, settings: SeedStatsSettings) -> Self {
        Self { pool, settings }
    }

    /// Reads only records newer than the stored watermark and merges them.
    /// Running it again with nothing new is a no-op.
    pub fn update(&self, seed: &str) -> Result<SeedUpdate> {
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = seed_stats::find_seed_stats(&tx, seed)?;
        let watermark = existing.as_ref().and_then(|s| s.last_processed_at);
        let records = match_results::list_by_seed_after(&tx, seed, watermark)?;

        if records.is_empty() {
            return Ok(SeedUpdate {
                seed: seed.to_string(),
                updated: false,
                new_records: 0,
                stats: existing,
            });
        }

        let now = Utc::now().naive_utc();
        let mut stats = existing.unwrap_or_else(|| SeedStatistics::empty(seed, now));
        stats.merge(&records, now);
        seed_stats::upsert_seed_stats(&tx, &stats)?;
        tx.commit()?;

        info!(
            "Seed {}: merged {} records ({} observed, avg {:.1})",
            seed,
            records.len(),
            stats.total_matches_observed,
            stats.average_score()
        );

        Ok(SeedUpdate {
            seed: seed.to_string(),
            updated: true,
            new_records: records.len(),
            stats: Some(stats),
        })
    }

    pub fn get_statistics(&self, seed: &str) -> Result<Option<SeedStatistics>> {
        let conn = database::get_connection(&self.pool)?;
        seed_stats::find_seed_stats(&conn, seed)
    }

    pub fn difficulty_coefficient(&self, seed: &str) -> Result<f64> {
        let stats = self.get_statistics(seed)?;
        Ok(coefficient_or_neutral(stats.as_ref(), &self.settings))
    }

    pub fn difficulty(&self, seed: &str) -> Result<SeedDifficulty> {
        let stats = self.get_statistics(seed)?;
        let coefficient = coefficient_or_neutral(stats.as_ref(), &self.settings);

        Ok(SeedDifficulty {
            seed: seed.to_string(),
            coefficient,
            level: DifficultyLevel::from_coefficient(coefficient),
            sample_count: stats.map_or(0, |s| s.score_count),
        })
    }

    /// Seeds with enough samples whose coefficient lands in `level`, most
    /// observed first.
    pub fn seeds_by_level(&self, level: DifficultyLevel) -> Result<Vec<SeedStatistics>> {
        let conn = database::get_connection(&self.pool)?;
        let rows = seed_stats::list_with_min_samples(&conn, self.settings.min_samples)?;

        Ok(rows
            .into_iter()
            .filter(|stats| {
                compute_coefficient(Some(stats), &self.settings)
                    .is_ok_and(|c| DifficultyLevel::from_coefficient(c) == level)
            })
            .collect())
    }

    pub fn refresh_all(&self) -> Result<RefreshSummary> {
        let seeds = {
            let conn = database::get_connection(&self.pool)?;
            match_results::list_distinct_seeds(&conn)?
        };

        let mut summary = RefreshSummary {
            seeds: seeds.len(),
            ..Default::default()
        };

        for seed in &seeds {
            match self.update(seed) {
                Ok(result) if result.updated => summary.updated += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!("Failed to refresh seed {}: {:#}", seed, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Refreshed {} seeds: {} updated, {} failed",
            summary.seeds, summary.updated, summary.failed
        );
        Ok(summary)
    }

    /// Drops aggregates not analyzed within `days_to_keep` days.
    pub fn cleanup_expired(&self, days_to_keep: i64) -> Result<usize> {
        let cutoff = Utc::now().naive_utc() - Duration::days(days_to_keep.max(0));
        let conn = database::get_connection(&self.pool)?;
        let removed = seed_stats::delete_analyzed_before(&conn, cutoff)?;

        info!("Removed {} expired seed statistics (older than {} days)", removed, days_to_keep);
        Ok(removed)
    }

    pub fn cleanup_default(&self) -> Result<usize> {
        self.cleanup_expired(self.settings.cache_days_to_keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MatchResultRecord;
    use crate::database::test_support::open_test_pool;
    use crate::ranking::types::SegmentTier;
    use chrono::NaiveDateTime;

    fn insert(pool: &DbPool, match_id: &str, seed: &str, score: f64, created_at: NaiveDateTime) {
        let conn = database::get_connection(pool).unwrap();
        match_results::insert_match_result(
            &conn,
            &MatchResultRecord {
                id: None,
                match_id: match_id.to_string(),
                seed: seed.to_string(),
                uid: "p1".to_string(),
                score,
                rank: 1,
                points: 100,
                segment_tier: SegmentTier::Gold,
                created_at,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_update_is_idempotent_without_new_records() {
        let pool = open_test_pool("seed_stats_idempotent");
        let service = SeedStatisticsService::new(pool.clone(), SeedStatsSettings::default());
        let start = Utc::now().naive_utc();
        insert(&pool, "m1", "abc", 1200.0, start);
        insert(&pool, "m2", "abc", 800.0, start + Duration::seconds(1));

        let first = service.update("abc").unwrap();
        assert!(first.updated);
        assert_eq!(first.new_records, 2);

        let second = service.update("abc").unwrap();
        assert!(!second.updated);
        assert_eq!(second.new_records, 0);
        let before = first.stats.unwrap();
        let after = second.stats.unwrap();
        assert_eq!(before.score_sum, after.score_sum);
        assert_eq!(before.score_count, after.score_count);
        assert_eq!(before.score_min, after.score_min);
        assert_eq!(before.score_max, after.score_max);

        insert(&pool, "m3", "abc", 1000.0, start + Duration::seconds(2));
        let third = service.update("abc").unwrap();
        assert_eq!(third.new_records, 1);
        assert_eq!(third.stats.unwrap().total_matches_observed, 3);
    }

    #[test]
    fn test_hard_seed_coefficient() {
        let pool = open_test_pool("seed_stats_hard");
        let service = SeedStatisticsService::new(pool.clone(), SeedStatsSettings::default());
        let start = Utc::now().naive_utc();
        for i in 0..12 {
            insert(&pool, &format!("m{}", i), "abc", 2000.0, start + Duration::seconds(i));
        }
        service.update("abc").unwrap();

        let difficulty = service.difficulty("abc").unwrap();
        assert_eq!(difficulty.coefficient, 0.5);
        assert_eq!(difficulty.level, DifficultyLevel::VeryHard);
        assert_eq!(difficulty.sample_count, 12);

        let very_hard = service.seeds_by_level(DifficultyLevel::VeryHard).unwrap();
        assert_eq!(very_hard.len(), 1);
        assert!(service.seeds_by_level(DifficultyLevel::Normal).unwrap().is_empty());
    }

    #[test]
    fn test_coefficient_bounds() {
        let settings = SeedStatsSettings::default();
        let now = Utc::now().naive_utc();
        assert_eq!(coefficient_or_neutral(None, &settings), 1.0);

        let mut stats = SeedStatistics::empty("s", now);
        stats.score_count = 9;
        stats.score_sum = 9.0;
        assert_eq!(coefficient_or_neutral(Some(&stats), &settings), 1.0);

        for mean in [1.0, 250.0, 800.0, 1000.0, 1600.0, 50_000.0] {
            stats.score_count = 20;
            stats.score_sum = mean * 20.0;
            let c = coefficient_or_neutral(Some(&stats), &settings);
            assert!((0.5..=2.0).contains(&c), "mean {} gave {}", mean, c);
        }

        stats.score_sum = 20.0 * 800.0;
        assert_eq!(coefficient_or_neutral(Some(&stats), &settings), 1.25);
    }

    #[test]
    fn test_refresh_all_and_cleanup() {
        let pool = open_test_pool("seed_stats_refresh_all");
        let service = SeedStatisticsService::new(pool.clone(), SeedStatsSettings::default());
        let now = Utc::now().naive_utc();
        insert(&pool, "m1", "abc", 900.0, now);
        insert(&pool, "m2", "xyz", 1100.0, now);

        let summary = service.refresh_all().unwrap();
        assert_eq!(summary.seeds, 2);
        assert_eq!(summary.updated, 2);
        assert_eq!(service.refresh_all().unwrap().updated, 0);

        assert_eq!(service.cleanup_expired(30).unwrap(), 0);
        assert_eq!(service.cleanup_expired(0).unwrap(), 2);
    }
}
