use anyhow::Result;
use log::debug;
use serde::Serialize;

use crate::config::settings::AppConfig;
use crate::config::tiers::target_difficulty;
use crate::database::{self, DbPool, SeedStatistics, match_results};
use crate::ranking::types::{DifficultyLevel, PreferredDifficulty};

use super::player_config::get_or_create;
use super::seed_statistics::SeedStatisticsService;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRecommendation {
    pub uid: String,
    pub seeds: Vec<String>,
    pub difficulty_level: DifficultyLevel,
    pub reasoning: String,
}

/// Unplayed seeds first; within each group the incoming (most observed
/// first) order is kept.
fn order_candidates(
    candidates: Vec<SeedStatistics>,
    played: &std::collections::HashSet<String>,
    limit: usize,
) -> Vec<String> {
    let (fresh, repeat): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .map(|stats| stats.seed)
        .partition(|seed| !played.contains(seed));

    fresh.into_iter().chain(repeat).take(limit).collect()
}

pub struct SeedRecommendationAdvisor {
    pool: DbPool,
    seeds: SeedStatisticsService,
}

impl SeedRecommendationAdvisor {
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        let seeds = SeedStatisticsService::new(pool.clone(), config.seeds);
        Self { pool, seeds }
    }

    pub fn recommend(
        &self,
        uid: &str,
        preference: PreferredDifficulty,
        limit: usize,
    ) -> Result<SeedRecommendation> {
        let (tier, played) = {
            let conn = database::get_connection(&self.pool)?;
            let config = get_or_create(&conn, uid, Default::default())?;
            (config.segment_tier, match_results::played_seeds(&conn, uid)?)
        };

        let target = target_difficulty(tier, preference);
        let mut level = target;
        let mut reasoning = format!(
            "{} player prefers {} play: targeting {} seeds",
            tier,
            preference.as_str(),
            target
        );

        let mut candidates = self.seeds.seeds_by_level(target)?;
        if candidates.is_empty() {
            level = target.fallback();
            candidates = self.seeds.seeds_by_level(level)?;
            reasoning.push_str(&format!("; no {} seeds available, fell back to {}", target, level));
        }

        let seeds = order_candidates(candidates, &played, limit);
        if seeds.is_empty() {
            reasoning.push_str("; no seeds have enough samples yet");
        }

        debug!("Recommended {} seeds for {} at {}", seeds.len(), uid, level);
        Ok(SeedRecommendation {
            uid: uid.to_string(),
            seeds,
            difficulty_level: level,
            reasoning,
        })
    }
}
