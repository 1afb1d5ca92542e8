use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};
use rusqlite::TransactionBehavior;
use serde::Serialize;

use crate::config::settings::{AppConfig, RankingSettings, TuningSettings};
use crate::database::{self, DbPool, MatchResultRecord, configs, match_results, metrics};
use crate::errors::RankingError;
use crate::ranking::types::{AdaptiveMode, PerformanceMetrics, PlayerRankingConfig, RankingMode, ScoreBand};

use super::player_config::get_or_create;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stability {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionShape {
    TopHeavy,
    Balanced,
    BottomHeavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningSpeed {
    Fast,
    Medium,
    Slow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceAnalysis {
    pub history_length: usize,
    pub overall_win_rate: f64,
    pub recent_win_rate: f64,
    pub win_rate_trend: Trend,
    pub coefficient_of_variation: f64,
    pub score_stability: Stability,
    pub top3_percentage: f64,
    pub average_rank: f64,
    pub rank_distribution: DistributionShape,
    pub improvement_rate: f64,
    pub learning_speed: LearningSpeed,
    pub plateau_detected: bool,
}

/// Proposed deltas against the current config. Categorical fields are only
/// set when they differ from what is stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigAdjustments {
    pub learning_rate_adjustment: f64,
    pub ranking_mode: Option<RankingMode>,
    pub adaptive_mode: Option<AdaptiveMode>,
    pub threshold_scale: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningAnalysis {
    pub uid: String,
    pub performance: Option<PerformanceAnalysis>,
    pub adjustments: ConfigAdjustments,
    pub confidence: f64,
}

impl TuningAnalysis {
    pub fn neutral(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            performance: None,
            adjustments: ConfigAdjustments::default(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningOutcome {
    pub uid: String,
    pub updated: bool,
    pub changes: Vec<String>,
    pub confidence: f64,
    pub reason: String,
}

impl TuningOutcome {
    fn skipped(uid: &str, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            uid: uid.to_string(),
            updated: false,
            changes: Vec::new(),
            confidence,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTuningSummary {
    pub total: usize,
    pub updated: usize,
    pub failed: usize,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

fn win_rate(records: &[MatchResultRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().filter(|r| r.rank == 1).count() as f64 / records.len() as f64
}

/// Analyzes a chronological (oldest first) history.
pub fn analyze_performance(
    history: &[MatchResultRecord],
    metrics: Option<&PerformanceMetrics>,
    settings: &TuningSettings,
) -> Result<PerformanceAnalysis, RankingError> {
    let n = history.len();
    if n < settings.min_history {
        return Err(RankingError::InsufficientData {
            required: settings.min_history,
            available: n,
        });
    }

    let recent_len = settings.recent_window.min(n - n / 2).max(1);
    let recent_win_rate = win_rate(&history[n - recent_len..]);
    let overall_win_rate = metrics
        .and_then(|m| m.win_rate())
        .unwrap_or_else(|| win_rate(history));
    let win_rate_trend = if recent_win_rate - overall_win_rate > settings.win_rate_gap {
        Trend::Improving
    } else if overall_win_rate - recent_win_rate > settings.win_rate_gap {
        Trend::Declining
    } else {
        Trend::Stable
    };

    let scores: Vec<f64> = history.iter().map(|r| r.score).collect();
    let score_mean = mean(&scores);
    let (coefficient_of_variation, score_stability) = if score_mean <= 0.0 {
        (0.0, Stability::Medium)
    } else {
        let cv = variance(&scores).sqrt() / score_mean;
        let stability = if cv < 0.2 {
            Stability::High
        } else if cv < 0.4 {
            Stability::Medium
        } else {
            Stability::Low
        };
        (cv, stability)
    };

    let top3_percentage = history.iter().filter(|r| r.rank <= 3).count() as f64 / n as f64;
    let average_rank = history.iter().map(|r| r.rank as f64).sum::<f64>() / n as f64;
    let rank_distribution = if average_rank < 2.5 {
        DistributionShape::TopHeavy
    } else if average_rank < 3.5 {
        DistributionShape::Balanced
    } else {
        DistributionShape::BottomHeavy
    };

    let (first_half, second_half) = scores.split_at(n / 2);
    let first_avg = mean(first_half);
    let improvement_rate = if first_avg > 0.0 {
        (mean(second_half) - first_avg) / first_avg
    } else {
        0.0
    };
    let learning_speed = if improvement_rate > 0.2 {
        LearningSpeed::Fast
    } else if improvement_rate > 0.05 {
        LearningSpeed::Medium
    } else {
        LearningSpeed::Slow
    };

    let tail = &scores[n.saturating_sub(settings.plateau_window)..];
    let plateau_detected = tail.len() >= settings.plateau_window && variance(tail) < settings.plateau_variance;

    Ok(PerformanceAnalysis {
        history_length: n,
        overall_win_rate,
        recent_win_rate,
        win_rate_trend,
        coefficient_of_variation,
        score_stability,
        top3_percentage,
        average_rank,
        rank_distribution,
        improvement_rate,
        learning_speed,
        plateau_detected,
    })
}

pub fn propose_adjustments(
    analysis: &PerformanceAnalysis,
    config: &PlayerRankingConfig,
    tuning: &TuningSettings,
    ranking: &RankingSettings,
) -> ConfigAdjustments {
    let improving = analysis.win_rate_trend == Trend::Improving;

    let step = if improving && analysis.learning_speed == LearningSpeed::Fast {
        tuning.learning_rate_step_up
    } else if analysis.win_rate_trend == Trend::Declining || analysis.plateau_detected {
        -tuning.learning_rate_step_down
    } else {
        0.0
    };
    let target = (config.learning_rate + step).clamp(ranking.min_learning_rate, ranking.max_learning_rate);
    let learning_rate_adjustment = target - config.learning_rate;

    let ranking_mode = match (analysis.score_stability, analysis.rank_distribution) {
        (Stability::High, DistributionShape::TopHeavy) => RankingMode::TierBased,
        (Stability::Low, _) => RankingMode::ScoreBased,
        _ => RankingMode::Hybrid,
    };

    let adaptive_mode = if analysis.learning_speed == LearningSpeed::Fast && improving {
        AdaptiveMode::Learning
    } else if analysis.plateau_detected {
        AdaptiveMode::Dynamic
    } else if analysis.score_stability == Stability::High {
        AdaptiveMode::Static
    } else {
        AdaptiveMode::Learning
    };

    let mut scale = 1.0;
    if analysis.score_stability == Stability::Low {
        scale *= 1.0 + tuning.expand_range;
    }
    if analysis.rank_distribution == DistributionShape::BottomHeavy {
        scale *= 1.0 - tuning.lower_thresholds;
    }

    ConfigAdjustments {
        learning_rate_adjustment,
        ranking_mode: (ranking_mode != config.ranking_mode).then_some(ranking_mode),
        adaptive_mode: (adaptive_mode != config.adaptive_mode).then_some(adaptive_mode),
        threshold_scale: ((scale - 1.0).abs() > f64::EPSILON && !config.score_thresholds.is_empty())
            .then_some(scale),
    }
}

/// Multiplies every band boundary by `scale`; a positive factor keeps the
/// bands sorted and non-overlapping.
pub fn scale_bands(bands: &[ScoreBand], scale: f64, max_score: f64) -> Vec<ScoreBand> {
    bands
        .iter()
        .map(|band| ScoreBand {
            min_score: (band.min_score * scale).min(max_score),
            max_score: (band.max_score * scale).min(max_score),
            rank_probabilities: band.rank_probabilities.clone(),
        })
        .collect()
}

pub fn confidence_for(history_length: usize, settings: &TuningSettings) -> f64 {
    if settings.full_confidence_history == 0 {
        return 1.0;
    }
    (history_length as f64 / settings.full_confidence_history as f64).min(1.0)
}

/// Full analysis for an already loaded history; thin histories yield the
/// neutral result.
pub fn analyze_history(
    config: &PlayerRankingConfig,
    history: &[MatchResultRecord],
    metrics: Option<&PerformanceMetrics>,
    settings: &AppConfig,
) -> TuningAnalysis {
    match analyze_performance(history, metrics, &settings.tuning) {
        Ok(performance) => {
            let adjustments = propose_adjustments(&performance, config, &settings.tuning, &settings.ranking);
            TuningAnalysis {
                uid: config.uid.clone(),
                confidence: confidence_for(performance.history_length, &settings.tuning),
                performance: Some(performance),
                adjustments,
            }
        }
        Err(e) => {
            debug!("Neutral analysis for {}: {}", config.uid, e);
            TuningAnalysis::neutral(&config.uid)
        }
    }
}

/// Writes the non-negligible parts of `adjustments` into `config` and
/// describes each change.
pub fn apply_adjustments(
    config: &mut PlayerRankingConfig,
    adjustments: &ConfigAdjustments,
    settings: &AppConfig,
) -> Vec<String> {
    let mut changes = Vec::new();

    if config.auto_adjust_learning_rate
        && adjustments.learning_rate_adjustment.abs() > settings.tuning.negligible_learning_rate_change
    {
        let next = (config.learning_rate + adjustments.learning_rate_adjustment)
            .clamp(settings.ranking.min_learning_rate, settings.ranking.max_learning_rate);
        changes.push(format!("learningRate: {:.2} -> {:.2}", config.learning_rate, next));
        config.learning_rate = next;
    }

    if let Some(mode) = adjustments.ranking_mode.filter(|mode| *mode != config.ranking_mode) {
        changes.push(format!("rankingMode: {} -> {}", config.ranking_mode.as_str(), mode.as_str()));
        config.ranking_mode = mode;
    }

    if let Some(mode) = adjustments.adaptive_mode.filter(|mode| *mode != config.adaptive_mode) {
        changes.push(format!("adaptiveMode: {} -> {}", config.adaptive_mode.as_str(), mode.as_str()));
        config.adaptive_mode = mode;
    }

    if let Some(scale) = adjustments.threshold_scale.filter(|s| *s > 0.0) {
        config.score_thresholds = scale_bands(&config.score_thresholds, scale, settings.ranking.max_score);
        changes.push(format!("scoreThresholds: scaled by {:.2}", scale));
    }

    changes
}

pub struct AdaptiveConfigTuner {
    pool: DbPool,
    config: AppConfig,
}

impl AdaptiveConfigTuner {
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        Self { pool, config }
    }

    fn load_history(&self, conn: &rusqlite::Connection, uid: &str) -> Result<Vec<MatchResultRecord>> {
        let mut history = match_results::list_by_uid(conn, uid, self.config.tuning.history_limit)?;
        history.reverse();
        Ok(history)
    }

    pub fn analyze(&self, uid: &str) -> Result<TuningAnalysis> {
        let conn = database::get_connection(&self.pool)?;
        let config = get_or_create(&conn, uid, Default::default())?;
        let history = self.load_history(&conn, uid)?;
        let player_metrics = metrics::find_metrics(&conn, uid)?;

        Ok(analyze_history(&config, &history, player_metrics.as_ref(), &self.config))
    }

    /// Analyzes and commits in one immediate transaction. Never fails: store
    /// errors come back as an `update failed` outcome.
    pub fn apply(&self, uid: &str) -> TuningOutcome {
        match self.try_apply(uid) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Tuning failed for {}: {:#}", uid, e);
                TuningOutcome::skipped(uid, 0.0, format!("update failed: {:#}", e))
            }
        }
    }

    fn try_apply(&self, uid: &str) -> Result<TuningOutcome> {
        let mut conn = database::get_connection(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut config = get_or_create(&tx, uid, Default::default())?;
        let history = self.load_history(&tx, uid)?;
        let player_metrics = metrics::find_metrics(&tx, uid)?;
        let analysis = analyze_history(&config, &history, player_metrics.as_ref(), &self.config);

        let outcome = if analysis.performance.is_none() {
            TuningOutcome::skipped(
                uid,
                analysis.confidence,
                format!(
                    "insufficient history: {} of {} matches",
                    history.len(),
                    self.config.tuning.min_history
                ),
            )
        } else if analysis.confidence < self.config.tuning.min_confidence {
            TuningOutcome::skipped(
                uid,
                analysis.confidence,
                format!("confidence {:.2} below threshold", analysis.confidence),
            )
        } else {
            let changes = apply_adjustments(&mut config, &analysis.adjustments, &self.config);
            if changes.is_empty() {
                TuningOutcome::skipped(uid, analysis.confidence, "no significant changes")
            } else {
                config.updated_at = Utc::now().naive_utc();
                configs::update_config(&tx, &config)?;
                TuningOutcome {
                    uid: uid.to_string(),
                    updated: true,
                    changes,
                    confidence: analysis.confidence,
                    reason: "config updated".to_string(),
                }
            }
        };

        // commits a freshly materialized default config even when nothing was tuned
        tx.commit()?;

        if outcome.updated {
            info!("Tuned ranking config for {}: {}", uid, outcome.changes.join(", "));
        }
        Ok(outcome)
    }

    pub fn apply_all(&self) -> Result<BatchTuningSummary> {
        let uids = {
            let conn = database::get_connection(&self.pool)?;
            configs::list_uids(&conn)?
        };

        let mut summary = BatchTuningSummary {
            total: uids.len(),
            ..Default::default()
        };

        for uid in &uids {
            match self.try_apply(uid) {
                Ok(outcome) if outcome.updated => summary.updated += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!("Tuning failed for {}: {:#}", uid, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Batch tuning finished: {} players, {} updated, {} failed",
            summary.total, summary.updated, summary.failed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::open_test_pool;
    use crate::ranking::types::SegmentTier;
    use crate::services::player_config::default_config;
    use chrono::{Duration, NaiveDateTime};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn history(entries: &[(i64, f64)]) -> Vec<MatchResultRecord> {
        let start = Utc::now().naive_utc();
        entries
            .iter()
            .enumerate()
            .map(|(i, &(rank, score))| MatchResultRecord {
                id: None,
                match_id: format!("m{}", i),
                seed: "abc".to_string(),
                uid: "p1".to_string(),
                score,
                rank,
                points: 0,
                segment_tier: SegmentTier::Gold,
                created_at: start + Duration::seconds(i as i64),
            })
            .collect()
    }

    fn gold_config() -> PlayerRankingConfig {
        let mut config = default_config("p1", SegmentTier::Gold, Utc::now().naive_utc());
        config.learning_rate = 0.1;
        config
    }

    #[test]
    fn test_win_rate_rising_over_five_matches_raises_learning_rate() {
        // 20% over the first two matches and 80% over the last three, rounded
        // to whole matches: no wins in 0.4 of a match, then two wins in 2.4.
        let records = history(&[(3, 1000.0), (2, 1100.0), (1, 3000.0), (2, 2500.0), (1, 3400.0)]);
        let settings = AppConfig::new();

        let analysis = analyze_history(&gold_config(), &records, None, &settings);
        let performance = analysis.performance.clone().unwrap();
        assert!((performance.recent_win_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((performance.overall_win_rate - 0.4).abs() < 1e-9);
        assert_eq!(performance.win_rate_trend, Trend::Improving);
        assert_eq!(performance.learning_speed, LearningSpeed::Fast);
        assert!(!performance.plateau_detected);
        assert!((analysis.adjustments.learning_rate_adjustment - 0.05).abs() < 1e-9);
        assert!((analysis.confidence - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_lifetime_metrics_drive_the_overall_win_rate() {
        let records = history(&[(3, 1000.0), (2, 1100.0), (1, 3000.0), (1, 3200.0), (1, 3400.0)]);
        let mut metrics = PerformanceMetrics::empty("p1");
        metrics.total_matches = 15;
        metrics.total_wins = 3;

        let analysis = analyze_history(&gold_config(), &records, Some(&metrics), &AppConfig::new());
        let performance = analysis.performance.unwrap();
        assert!((performance.overall_win_rate - 0.2).abs() < 1e-9);
        assert_eq!(performance.win_rate_trend, Trend::Improving);
    }

    #[test]
    fn test_volatile_scores_expand_thresholds() {
        let records = history(&[(2, 100.0), (2, 3000.0), (1, 200.0), (2, 2800.0), (2, 150.0), (1, 2900.0)]);
        let analysis = analyze_history(&gold_config(), &records, None, &AppConfig::new());
        let performance = analysis.performance.unwrap();
        assert_eq!(performance.score_stability, Stability::Low);
        assert_eq!(performance.rank_distribution, DistributionShape::TopHeavy);

        let scale = analysis.adjustments.threshold_scale.unwrap();
        assert!((scale - 1.2).abs() < 1e-9);
        assert_eq!(analysis.adjustments.ranking_mode, Some(RankingMode::ScoreBased));
    }

    #[test]
    fn test_bottom_heavy_ranks_lower_thresholds() {
        let records = history(&[(5, 2000.0), (6, 2010.0), (5, 1990.0), (5, 2005.0), (6, 1995.0)]);
        let analysis = analyze_history(&gold_config(), &records, None, &AppConfig::new());
        let performance = analysis.performance.unwrap();
        assert_eq!(performance.score_stability, Stability::High);
        assert_eq!(performance.rank_distribution, DistributionShape::BottomHeavy);

        let scale = analysis.adjustments.threshold_scale.unwrap();
        assert!((scale - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_volatile_and_bottom_heavy_scales_multiply() {
        let records = history(&[(5, 100.0), (6, 3000.0), (5, 200.0), (6, 2800.0), (5, 150.0), (6, 2900.0)]);
        let mut config = gold_config();
        let settings = AppConfig::new();
        let analysis = analyze_history(&config, &records, None, &settings);
        let performance = analysis.performance.clone().unwrap();
        assert_eq!(performance.score_stability, Stability::Low);
        assert_eq!(performance.rank_distribution, DistributionShape::BottomHeavy);

        let scale = analysis.adjustments.threshold_scale.unwrap();
        assert!((scale - 1.02).abs() < 1e-9);

        let top_before = config.score_thresholds.last().unwrap().max_score;
        let changes = apply_adjustments(&mut config, &analysis.adjustments, &settings);
        assert!(changes.iter().any(|c| c.starts_with("scoreThresholds")));
        let top_after = config.score_thresholds.last().unwrap().max_score;
        assert!((top_after - top_before * 1.02).abs() < 1e-6);
    }

    #[test]
    fn test_store_failure_is_reported_not_raised() {
        let pool = open_test_pool("tuning_store_failure");
        {
            let conn = database::get_connection(&pool).unwrap();
            conn.execute("DROP TABLE player_configs", []).unwrap();
        }
        let tuner = AdaptiveConfigTuner::new(pool, AppConfig::new());

        let outcome = tuner.apply("p1");
        assert!(!outcome.updated);
        assert!(outcome.reason.starts_with("update failed: "), "{}", outcome.reason);
        assert_eq!(outcome.confidence, 0.0);
        assert!(outcome.changes.is_empty());
    }

    #[test]
    fn test_short_history_is_neutral() {
        let records = history(&[(1, 1000.0), (2, 900.0), (3, 800.0), (4, 700.0)]);
        let analysis = analyze_history(&gold_config(), &records, None, &AppConfig::new());
        assert!(analysis.performance.is_none());
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analysis.adjustments, ConfigAdjustments::default());
    }

    #[test]
    fn test_plateau_lowers_learning_rate() {
        let records = history(&[(2, 2000.0), (2, 2010.0), (2, 1995.0), (2, 2005.0), (2, 2000.0), (2, 2002.0)]);
        let analysis = analyze_history(&gold_config(), &records, None, &AppConfig::new());
        let performance = analysis.performance.unwrap();
        assert!(performance.plateau_detected);
        assert_eq!(performance.score_stability, Stability::High);
        assert!((analysis.adjustments.learning_rate_adjustment + 0.03).abs() < 1e-9);
        assert_eq!(analysis.adjustments.adaptive_mode, Some(AdaptiveMode::Dynamic));
        assert_eq!(analysis.adjustments.ranking_mode, Some(RankingMode::TierBased));
    }

    #[test]
    fn test_adjustment_is_reported_post_clamp() {
        let records = history(&[(3, 1000.0), (2, 1100.0), (1, 3000.0), (1, 3200.0), (1, 3400.0)]);
        let mut config = gold_config();
        config.learning_rate = 0.28;
        let analysis = analyze_history(&config, &records, None, &AppConfig::new());
        assert!((analysis.adjustments.learning_rate_adjustment - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_learning_rate_never_leaves_bounds() {
        let settings = AppConfig::new();
        let mut rng = StdRng::seed_from_u64(17);

        for _ in 0..300 {
            let len = rng.gen_range(5..40usize);
            let entries: Vec<(i64, f64)> = (0..len)
                .map(|_| (rng.gen_range(1..=6i64), rng.gen_range(0.0..6000.0)))
                .collect();
            let mut config = gold_config();
            config.learning_rate = rng.gen_range(0.01..=0.3);

            let analysis = analyze_history(&config, &history(&entries), None, &settings);
            apply_adjustments(&mut config, &analysis.adjustments, &settings);
            assert!((0.01..=0.3).contains(&config.learning_rate), "rate {}", config.learning_rate);
        }
    }

    #[test]
    fn test_scaling_keeps_bands_ordered() {
        let bands = gold_config().score_thresholds;
        for scale in [1.2, 0.85, 1.2 * 0.85] {
            let scaled = scale_bands(&bands, scale, 1_000_000.0);
            for pair in scaled.windows(2) {
                assert!(pair[0].max_score <= pair[1].min_score);
            }
            assert!(scaled.iter().all(|b| b.min_score < b.max_score));
        }
    }

    fn seed_history(pool: &DbPool, uid: &str, entries: &[(i64, f64)], start: NaiveDateTime) {
        let conn = database::get_connection(pool).unwrap();
        for (i, &(rank, score)) in entries.iter().enumerate() {
            match_results::insert_match_result(
                &conn,
                &MatchResultRecord {
                    id: None,
                    match_id: format!("{}-m{}", uid, i),
                    seed: "abc".to_string(),
                    uid: uid.to_string(),
                    score,
                    rank,
                    points: 0,
                    segment_tier: SegmentTier::Gold,
                    created_at: start + Duration::seconds(i as i64),
                },
            )
            .unwrap();
        }
    }

    #[test]
    fn test_apply_commits_confident_changes() {
        let pool = open_test_pool("tuning_apply");
        let tuner = AdaptiveConfigTuner::new(pool.clone(), AppConfig::new());
        let start = Utc::now().naive_utc();

        let entries: Vec<(i64, f64)> = (0..8).map(|i| (2, 2000.0 + i as f64)).collect();
        seed_history(&pool, "steady", &entries, start);

        let outcome = tuner.apply("steady");
        assert!(outcome.updated, "{}", outcome.reason);
        assert!((outcome.confidence - 0.4).abs() < 1e-9);
        assert!(outcome.changes.iter().any(|c| c.starts_with("adaptiveMode")));

        let conn = database::get_connection(&pool).unwrap();
        let stored = configs::find_config(&conn, "steady").unwrap().unwrap();
        assert_eq!(stored.adaptive_mode, AdaptiveMode::Dynamic);
    }

    #[test]
    fn test_apply_skips_low_confidence_and_short_history() {
        let pool = open_test_pool("tuning_skip");
        let tuner = AdaptiveConfigTuner::new(pool.clone(), AppConfig::new());
        let start = Utc::now().naive_utc();

        seed_history(&pool, "short", &[(1, 100.0), (2, 90.0)], start);
        let outcome = tuner.apply("short");
        assert!(!outcome.updated);
        assert!(outcome.reason.starts_with("insufficient history"));

        let entries: Vec<(i64, f64)> = (0..5).map(|i| (2, 2000.0 + i as f64)).collect();
        seed_history(&pool, "fresh", &entries, start);
        let outcome = tuner.apply("fresh");
        assert!(!outcome.updated);
        assert!(outcome.reason.contains("below threshold"));

        let summary = tuner.apply_all().unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.failed, 0);
    }
}
