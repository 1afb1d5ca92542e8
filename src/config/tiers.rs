use std::collections::BTreeMap;

use crate::ranking::probability::resample;
use crate::ranking::types::{AdaptiveMode, DifficultyLevel, PreferredDifficulty, RankingMode, ScoreBand, SegmentTier};

/// Participant counts that get a precomputed table in default configs.
pub const DEFAULT_PARTICIPANT_COUNTS: [usize; 7] = [2, 3, 4, 5, 6, 7, 8];

pub const DEFAULT_MAX_RANK: usize = 8;

/// Default band layout for a segment tier
#[derive(Debug, Clone)]
pub struct TierDefaults {
    pub tier: SegmentTier,
    /// Band boundaries, ascending; band i covers [edges[i], edges[i + 1]).
    pub band_edges: [f64; 4],
    /// Four-place distribution per band.
    pub band_probabilities: [[f64; 4]; 3],
    pub learning_rate: f64,
    pub adaptive_mode: AdaptiveMode,
    pub ranking_mode: RankingMode,
}

impl TierDefaults {
    pub fn score_bands(&self) -> Vec<ScoreBand> {
        self.band_probabilities
            .iter()
            .enumerate()
            .map(|(idx, base)| ScoreBand {
                min_score: self.band_edges[idx],
                max_score: self.band_edges[idx + 1],
                rank_probabilities: expand_tables(base),
            })
            .collect()
    }
}

fn expand_tables(base: &[f64; 4]) -> BTreeMap<usize, Vec<f64>> {
    DEFAULT_PARTICIPANT_COUNTS
        .iter()
        .map(|&count| (count, resample(base, count)))
        .collect()
}

pub fn get_tier_defaults(tier: SegmentTier) -> TierDefaults {
    use AdaptiveMode::*;
    use RankingMode::*;

    let (band_edges, band_probabilities, learning_rate, adaptive_mode, ranking_mode) = match tier {
        SegmentTier::Bronze => (
            [0.0, 1000.0, 2000.0, 3000.0],
            [[0.15, 0.25, 0.35, 0.25], [0.20, 0.30, 0.30, 0.20], [0.25, 0.35, 0.25, 0.15]],
            0.15,
            Static,
            ScoreBased,
        ),
        SegmentTier::Silver => (
            [0.0, 1500.0, 2500.0, 3500.0],
            [[0.20, 0.30, 0.30, 0.20], [0.25, 0.35, 0.25, 0.15], [0.30, 0.35, 0.20, 0.15]],
            0.12,
            Dynamic,
            Hybrid,
        ),
        SegmentTier::Gold => (
            [0.0, 2000.0, 3000.0, 4000.0],
            [[0.25, 0.35, 0.25, 0.15], [0.30, 0.35, 0.20, 0.15], [0.35, 0.30, 0.20, 0.15]],
            0.10,
            Learning,
            Hybrid,
        ),
        SegmentTier::Platinum => (
            [0.0, 2500.0, 3500.0, 4500.0],
            [[0.30, 0.35, 0.20, 0.15], [0.35, 0.30, 0.20, 0.15], [0.40, 0.30, 0.20, 0.10]],
            0.08,
            Learning,
            TierBased,
        ),
        SegmentTier::Diamond => (
            [0.0, 3000.0, 4000.0, 5000.0],
            [[0.35, 0.35, 0.20, 0.10], [0.40, 0.30, 0.20, 0.10], [0.45, 0.30, 0.15, 0.10]],
            0.06,
            Learning,
            TierBased,
        ),
        SegmentTier::Master => (
            [0.0, 4000.0, 6000.0, 8000.0],
            [[0.40, 0.35, 0.15, 0.10], [0.45, 0.30, 0.15, 0.10], [0.50, 0.30, 0.15, 0.05]],
            0.04,
            Learning,
            TierBased,
        ),
        SegmentTier::Grandmaster => (
            [0.0, 5000.0, 8000.0, 10000.0],
            [[0.45, 0.35, 0.15, 0.05], [0.50, 0.30, 0.15, 0.05], [0.55, 0.30, 0.10, 0.05]],
            0.02,
            Learning,
            TierBased,
        ),
    };

    TierDefaults {
        tier,
        band_edges,
        band_probabilities,
        learning_rate,
        adaptive_mode,
        ranking_mode,
    }
}

/// Initial protection values handed to a player on first settlement
#[derive(Debug, Clone, Copy)]
pub struct TierProtection {
    pub initial_level: i64,
    pub grace_period: i64,
    pub duration_days: i64,
}

pub fn get_tier_protection(tier: SegmentTier) -> TierProtection {
    let (initial_level, grace_period, duration_days) = match tier {
        SegmentTier::Bronze => (2, 5, 3),
        SegmentTier::Silver => (2, 4, 4),
        SegmentTier::Gold => (1, 3, 5),
        SegmentTier::Platinum => (1, 2, 6),
        SegmentTier::Diamond => (3, 3, 7),
        SegmentTier::Master => (2, 2, 8),
        SegmentTier::Grandmaster => (1, 1, 10),
    };

    TierProtection {
        initial_level,
        grace_period,
        duration_days,
    }
}

/// Seed difficulty a player of `tier` should face for a given preference.
pub fn target_difficulty(tier: SegmentTier, preference: PreferredDifficulty) -> DifficultyLevel {
    use DifficultyLevel::*;
    use PreferredDifficulty::*;

    match (tier, preference) {
        (SegmentTier::Bronze, Practice) => VeryEasy,
        (SegmentTier::Bronze, Balanced) => Easy,
        (SegmentTier::Bronze, Challenge) => Normal,
        (SegmentTier::Silver, Practice) => Easy,
        (SegmentTier::Silver, Balanced) => Normal,
        (SegmentTier::Silver, Challenge) => Hard,
        (SegmentTier::Gold | SegmentTier::Platinum, Practice) => Normal,
        (SegmentTier::Gold | SegmentTier::Platinum, Balanced) => Hard,
        (SegmentTier::Gold | SegmentTier::Platinum, Challenge) => VeryHard,
        (_, Practice) => Hard,
        (_, Balanced | Challenge) => VeryHard,
    }
}
