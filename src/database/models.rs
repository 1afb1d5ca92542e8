use chrono::NaiveDateTime;
use serde::Serialize;

use crate::ranking::types::{Score, SegmentTier};

/// One human's result in a settled match. Rows are never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResultRecord {
    pub id: Option<i64>,
    pub match_id: String,
    pub seed: String,
    pub uid: String,
    pub score: Score,
    pub rank: i64,
    pub points: i64,
    pub segment_tier: SegmentTier,
    pub created_at: NaiveDateTime,
}

/// Running aggregate for a deal seed, advanced by a created_at watermark.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedStatistics {
    pub seed: String,
    pub total_matches_observed: i64,
    pub last_processed_at: Option<NaiveDateTime>,
    pub score_sum: f64,
    pub score_count: i64,
    pub score_min: Option<Score>,
    pub score_max: Option<Score>,
    pub last_analyzed_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl SeedStatistics {
    pub fn empty(seed: &str, now: NaiveDateTime) -> Self {
        Self {
            seed: seed.to_string(),
            total_matches_observed: 0,
            last_processed_at: None,
            score_sum: 0.0,
            score_count: 0,
            score_min: None,
            score_max: None,
            last_analyzed_at: now,
            created_at: now,
        }
    }

    pub fn average_score(&self) -> f64 {
        if self.score_count > 0 {
            self.score_sum / self.score_count as f64
        } else {
            0.0
        }
    }

    /// Folds a batch of newer records in. Only positive scores feed the score
    /// aggregate; every record counts as an observation.
    pub fn merge(&mut self, records: &[MatchResultRecord], now: NaiveDateTime) {
        for record in records {
            self.total_matches_observed += 1;

            if record.score > 0.0 && record.score.is_finite() {
                self.score_sum += record.score;
                self.score_count += 1;
                self.score_min = Some(self.score_min.map_or(record.score, |min| min.min(record.score)));
                self.score_max = Some(self.score_max.map_or(record.score, |max| max.max(record.score)));
            }

            if self.last_processed_at.is_none_or(|mark| record.created_at > mark) {
                self.last_processed_at = Some(record.created_at);
            }
        }
        self.last_analyzed_at = now;
    }
}

/// Row counts reported by the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatistics {
    pub total_players: i64,
    pub total_match_records: i64,
    pub tracked_seeds: i64,
}
