use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use rand::Rng;
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};

use crate::config::settings::AppConfig;
use crate::database::{self, DbPool, MatchResultRecord, match_results, metrics, protection};
use crate::errors::RankingError;
use crate::ranking::types::{PerformanceMetrics, Placement, Score, SegmentTier};
use crate::ranking::{ProposedRank, assign_rank, merge_by_rank, points_for_rank, reconcile_ranks, synthesize_ai_scores};

use super::player_config::{default_protection, get_or_create};
use super::queue::TuningQueue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanScore {
    pub uid: String,
    pub score: Score,
    /// Only used when the player has no config yet.
    #[serde(default)]
    pub segment_tier: Option<SegmentTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSubmission {
    pub match_id: String,
    pub seed: String,
    pub human_scores: Vec<HumanScore>,
    #[serde(default)]
    pub ai_count: usize,
}

/// Non-finite scores become 0; everything else is held inside [0, max].
pub fn clamp_score(score: Score, max_score: Score) -> Score {
    if score.is_finite() {
        score.clamp(0.0, max_score)
    } else {
        0.0
    }
}

fn validate_submission(submission: &MatchSubmission) -> Result<(), RankingError> {
    if submission.match_id.trim().is_empty() {
        return Err(RankingError::InvalidRequest("matchId must not be empty".to_string()));
    }
    if submission.seed.trim().is_empty() {
        return Err(RankingError::InvalidRequest("seed must not be empty".to_string()));
    }
    if submission.human_scores.is_empty() && submission.ai_count == 0 {
        return Err(RankingError::InvalidRequest("match has no participants".to_string()));
    }

    let mut seen = HashSet::new();
    for human in &submission.human_scores {
        if human.uid.trim().is_empty() {
            return Err(RankingError::InvalidRequest("uid must not be empty".to_string()));
        }
        if !seen.insert(human.uid.as_str()) {
            return Err(RankingError::InvalidRequest(format!("duplicate uid in match: {}", human.uid)));
        }
    }

    Ok(())
}

pub struct MatchSettlementCoordinator {
    pool: DbPool,
    config: AppConfig,
    queue: Arc<dyn TuningQueue>,
}

impl MatchSettlementCoordinator {
    pub fn new(pool: DbPool, config: AppConfig, queue: Arc<dyn TuningQueue>) -> Self {
        Self { pool, config, queue }
    }

    pub fn settle_match(&self, submission: &MatchSubmission) -> Result<Vec<Placement>> {
        let mut rng = rand::thread_rng();
        self.settle_match_with_rng(submission, &mut rng)
    }

    /// Ranks the humans, fills the remaining slots with AI and persists the
    /// human results. Returns the full field, rank ascending.
    pub fn settle_match_with_rng<R: Rng + ?Sized>(
        &self,
        submission: &MatchSubmission,
        rng: &mut R,
    ) -> Result<Vec<Placement>> {
        validate_submission(submission)?;

        let total = submission.human_scores.len() + submission.ai_count;
        let mut conn = database::get_connection(&self.pool)?;

        let mut proposals = Vec::with_capacity(submission.human_scores.len());
        let mut tiers = Vec::with_capacity(submission.human_scores.len());
        for human in &submission.human_scores {
            let tier = human.segment_tier.unwrap_or_default();
            let config = get_or_create(&conn, &human.uid, tier)?;
            let score = clamp_score(human.score, self.config.ranking.max_score);
            let rank = assign_rank(score, &config, total, &self.config.ranking, rng);

            tiers.push((human.uid.clone(), config.segment_tier));
            proposals.push(ProposedRank {
                uid: human.uid.clone(),
                score,
                rank,
            });
        }

        let humans = reconcile_ranks(proposals, total);
        let ai = synthesize_ai_scores(&humans, submission.ai_count, &self.config.synthesis, rng);

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // stamped under the write lock so created_at follows commit order
        let now = Utc::now().naive_utc();

        if match_results::match_exists(&tx, &submission.match_id)? {
            return Err(RankingError::InvalidRequest(format!(
                "match {} already settled",
                submission.match_id
            ))
            .into());
        }

        let mut match_counts = Vec::with_capacity(humans.len());
        for placement in &humans {
            let Some(uid) = placement.uid.as_deref() else { continue };
            let tier = tiers
                .iter()
                .find(|(candidate, _)| candidate == uid)
                .map(|(_, tier)| *tier)
                .unwrap_or_default();

            match_results::insert_match_result(
                &tx,
                &MatchResultRecord {
                    id: None,
                    match_id: submission.match_id.clone(),
                    seed: submission.seed.clone(),
                    uid: uid.to_string(),
                    score: placement.score,
                    rank: placement.rank as i64,
                    points: points_for_rank(placement.rank, total),
                    segment_tier: tier,
                    created_at: now,
                },
            )?;

            let mut player_metrics =
                metrics::find_metrics(&tx, uid)?.unwrap_or_else(|| PerformanceMetrics::empty(uid));
            player_metrics.record(placement.score, placement.rank);
            player_metrics.updated_at = Some(now);
            metrics::upsert_metrics(&tx, &player_metrics)?;

            let mut status =
                protection::find_protection(&tx, uid)?.unwrap_or_else(|| default_protection(uid, tier));
            status.record(placement.rank, &submission.match_id);
            protection::upsert_protection(&tx, &status)?;

            match_counts.push((uid.to_string(), player_metrics.total_matches));
        }

        tx.commit()?;

        info!(
            "Settled match {} on seed {}: {} humans, {} AI",
            submission.match_id,
            submission.seed,
            humans.len(),
            submission.ai_count
        );

        let min_history = self.config.tuning.min_history as i64;
        for (uid, total_matches) in match_counts {
            if total_matches >= min_history {
                if let Err(e) = self.queue.enqueue(&uid) {
                    warn!("Failed to enqueue tuning for {}: {:#}", uid, e);
                }
            }
        }

        Ok(merge_by_rank(humans, ai))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::open_test_pool;
    use crate::services::queue::DeferredTuningQueue;
    use crate::services::seed_statistics::SeedStatisticsService;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn submission(match_id: &str, humans: &[(&str, f64)], ai_count: usize) -> MatchSubmission {
        MatchSubmission {
            match_id: match_id.to_string(),
            seed: "abc".to_string(),
            human_scores: humans
                .iter()
                .map(|(uid, score)| HumanScore {
                    uid: uid.to_string(),
                    score: *score,
                    segment_tier: Some(SegmentTier::Gold),
                })
                .collect(),
            ai_count,
        }
    }

    fn coordinator(name: &str) -> (MatchSettlementCoordinator, Arc<DeferredTuningQueue>, DbPool) {
        let pool = open_test_pool(name);
        let queue = Arc::new(DeferredTuningQueue::new());
        let coordinator = MatchSettlementCoordinator::new(pool.clone(), AppConfig::new(), queue.clone());
        (coordinator, queue, pool)
    }

    #[test]
    fn test_settlement_persists_humans_only() {
        let (coordinator, _, pool) = coordinator("settlement_persist");
        let mut rng = StdRng::seed_from_u64(1);

        let field = coordinator
            .settle_match_with_rng(&submission("m1", &[("p1", 2500.0), ("p2", 900.0)], 2), &mut rng)
            .unwrap();
        assert_eq!(field.len(), 4);
        assert_eq!(field.iter().filter(|p| p.is_ai()).count(), 2);

        let conn = database::get_connection(&pool).unwrap();
        assert_eq!(match_results::count_match_results(&conn).unwrap(), 2);
        let metrics = metrics::find_metrics(&conn, "p1").unwrap().unwrap();
        assert_eq!(metrics.total_matches, 1);
        assert!(protection::find_protection(&conn, "p2").unwrap().is_some());
    }

    #[test]
    fn test_duplicate_uids_and_replays_are_rejected() {
        let (coordinator, _, _) = coordinator("settlement_reject");
        let mut rng = StdRng::seed_from_u64(2);

        let err = coordinator
            .settle_match_with_rng(&submission("m1", &[("p1", 10.0), ("p1", 20.0)], 1), &mut rng)
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<RankingError>(), Some(RankingError::InvalidRequest(_))));

        coordinator
            .settle_match_with_rng(&submission("m2", &[("p1", 10.0)], 1), &mut rng)
            .unwrap();
        let replay = coordinator
            .settle_match_with_rng(&submission("m2", &[("p1", 10.0)], 1), &mut rng)
            .unwrap_err();
        assert!(replay.to_string().contains("already settled"));
    }

    #[test]
    fn test_tuning_enqueued_after_five_matches() {
        let (coordinator, queue, _) = coordinator("settlement_queue");
        let mut rng = StdRng::seed_from_u64(3);

        for i in 0..4 {
            coordinator
                .settle_match_with_rng(&submission(&format!("m{}", i), &[("p1", 1500.0)], 3), &mut rng)
                .unwrap();
        }
        assert!(queue.drain().unwrap().is_empty());

        coordinator
            .settle_match_with_rng(&submission("m4", &[("p1", 1500.0)], 3), &mut rng)
            .unwrap();
        assert_eq!(queue.drain().unwrap(), vec!["p1".to_string()]);
    }

    #[test]
    fn test_unreadable_config_does_not_block_settlement() {
        let (coordinator, _, pool) = coordinator("settlement_unreadable_config");
        let mut rng = StdRng::seed_from_u64(4);
        {
            let conn = database::get_connection(&pool).unwrap();
            get_or_create(&conn, "p1", SegmentTier::Silver).unwrap();
            conn.execute("UPDATE player_configs SET score_thresholds = 'not json' WHERE uid = 'p1'", [])
                .unwrap();
        }

        let field = coordinator
            .settle_match_with_rng(&submission("m1", &[("p1", 2500.0)], 3), &mut rng)
            .unwrap();
        assert_eq!(field.len(), 4);

        let conn = database::get_connection(&pool).unwrap();
        let repaired = crate::database::configs::find_config(&conn, "p1").unwrap().unwrap();
        assert_eq!(repaired.segment_tier, SegmentTier::Gold);
        assert!(!repaired.score_thresholds.is_empty());
        assert_eq!(match_results::count_match_results(&conn).unwrap(), 1);
    }

    #[test]
    fn test_matches_settled_after_a_seed_update_are_counted() {
        let (coordinator, _, pool) = coordinator("settlement_watermark");
        let seeds = SeedStatisticsService::new(pool.clone(), AppConfig::new().seeds);
        let mut rng = StdRng::seed_from_u64(6);

        coordinator
            .settle_match_with_rng(&submission("m1", &[("p1", 1800.0)], 2), &mut rng)
            .unwrap();
        let first = seeds.update("abc").unwrap();
        assert_eq!(first.new_records, 1);

        for i in 2..5 {
            coordinator
                .settle_match_with_rng(&submission(&format!("m{}", i), &[("p1", 1800.0), ("p2", 900.0)], 2), &mut rng)
                .unwrap();
        }
        let second = seeds.update("abc").unwrap();
        assert!(second.updated);
        assert_eq!(second.new_records, 6);

        let stats = second.stats.unwrap();
        assert_eq!(stats.score_count, 7);
        let watermark = stats.last_processed_at.unwrap();

        let conn = database::get_connection(&pool).unwrap();
        let unseen = match_results::list_by_seed_after(&conn, "abc", Some(watermark)).unwrap();
        assert!(unseen.is_empty());
    }

    #[test]
    fn test_scores_are_clamped() {
        assert_eq!(clamp_score(f64::NAN, 1_000_000.0), 0.0);
        assert_eq!(clamp_score(-5.0, 1_000_000.0), 0.0);
        assert_eq!(clamp_score(f64::INFINITY, 1_000_000.0), 0.0);
        assert_eq!(clamp_score(2e6, 1_000_000.0), 1_000_000.0);
    }
}
