use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::RankingError;

pub type Uid = String;
pub type Score = f64;
pub type Rank = usize;

/// Coarse skill bracket selecting default configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentTier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
    Grandmaster,
}

impl SegmentTier {
    pub const ALL: [SegmentTier; 7] = [
        SegmentTier::Bronze,
        SegmentTier::Silver,
        SegmentTier::Gold,
        SegmentTier::Platinum,
        SegmentTier::Diamond,
        SegmentTier::Master,
        SegmentTier::Grandmaster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentTier::Bronze => "bronze",
            SegmentTier::Silver => "silver",
            SegmentTier::Gold => "gold",
            SegmentTier::Platinum => "platinum",
            SegmentTier::Diamond => "diamond",
            SegmentTier::Master => "master",
            SegmentTier::Grandmaster => "grandmaster",
        }
    }
}

impl fmt::Display for SegmentTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentTier {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SegmentTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| RankingError::InvalidRequest(format!("unknown segment tier: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdaptiveMode {
    Static,
    Dynamic,
    Learning,
}

impl AdaptiveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdaptiveMode::Static => "static",
            AdaptiveMode::Dynamic => "dynamic",
            AdaptiveMode::Learning => "learning",
        }
    }
}

impl FromStr for AdaptiveMode {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(AdaptiveMode::Static),
            "dynamic" => Ok(AdaptiveMode::Dynamic),
            "learning" => Ok(AdaptiveMode::Learning),
            other => Err(RankingError::InvalidConfig(format!("unknown adaptive mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankingMode {
    TierBased,
    ScoreBased,
    Hybrid,
}

impl RankingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingMode::TierBased => "tier-based",
            RankingMode::ScoreBased => "score-based",
            RankingMode::Hybrid => "hybrid",
        }
    }
}

impl FromStr for RankingMode {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tier-based" => Ok(RankingMode::TierBased),
            "score-based" => Ok(RankingMode::ScoreBased),
            "hybrid" => Ok(RankingMode::Hybrid),
            other => Err(RankingError::InvalidConfig(format!("unknown ranking mode: {}", other))),
        }
    }
}

/// A (minScore, maxScore) range carrying rank-probability tables keyed by
/// participant count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBand {
    pub min_score: Score,
    pub max_score: Score,
    pub rank_probabilities: BTreeMap<usize, Vec<f64>>,
}

impl ScoreBand {
    pub fn contains(&self, score: Score) -> bool {
        score >= self.min_score && score < self.max_score
    }

    pub fn width(&self) -> f64 {
        self.max_score - self.min_score
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRankingConfig {
    pub uid: Uid,
    pub segment_tier: SegmentTier,
    pub score_thresholds: Vec<ScoreBand>,
    pub max_rank: usize,
    pub adaptive_mode: AdaptiveMode,
    pub learning_rate: f64,
    pub ranking_mode: RankingMode,
    pub auto_adjust_learning_rate: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Partial admin update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    pub segment_tier: Option<SegmentTier>,
    pub score_thresholds: Option<Vec<ScoreBand>>,
    pub max_rank: Option<usize>,
    pub adaptive_mode: Option<AdaptiveMode>,
    pub learning_rate: Option<f64>,
    pub ranking_mode: Option<RankingMode>,
    pub auto_adjust_learning_rate: Option<bool>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == ConfigPatch::default()
    }

    pub fn apply_to(&self, config: &mut PlayerRankingConfig) {
        if let Some(tier) = self.segment_tier {
            config.segment_tier = tier;
        }
        if let Some(bands) = &self.score_thresholds {
            config.score_thresholds = bands.clone();
        }
        if let Some(max_rank) = self.max_rank {
            config.max_rank = max_rank;
        }
        if let Some(mode) = self.adaptive_mode {
            config.adaptive_mode = mode;
        }
        if let Some(rate) = self.learning_rate {
            config.learning_rate = rate;
        }
        if let Some(mode) = self.ranking_mode {
            config.ranking_mode = mode;
        }
        if let Some(flag) = self.auto_adjust_learning_rate {
            config.auto_adjust_learning_rate = flag;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub uid: Uid,
    pub total_matches: i64,
    pub total_wins: i64,
    pub total_score_sum: f64,
    pub last_match_score: Option<Score>,
    pub last_match_rank: Option<i64>,
    pub updated_at: Option<NaiveDateTime>,
}

impl PerformanceMetrics {
    pub fn empty(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            total_matches: 0,
            total_wins: 0,
            total_score_sum: 0.0,
            last_match_score: None,
            last_match_rank: None,
            updated_at: None,
        }
    }

    pub fn average_score(&self) -> f64 {
        if self.total_matches > 0 {
            self.total_score_sum / self.total_matches as f64
        } else {
            0.0
        }
    }

    pub fn win_rate(&self) -> Option<f64> {
        (self.total_matches > 0).then(|| self.total_wins as f64 / self.total_matches as f64)
    }

    pub fn record(&mut self, score: Score, rank: Rank) {
        self.total_matches += 1;
        if rank == 1 {
            self.total_wins += 1;
        }
        self.total_score_sum += score;
        self.last_match_score = Some(score);
        self.last_match_rank = Some(rank as i64);
    }
}

pub const MAX_PROTECTION_LEVEL: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionStatus {
    pub uid: Uid,
    pub protection_level: i64,
    pub grace_period: i64,
    pub protection_duration_days: i64,
    pub is_active: bool,
    pub last_update_match: Option<String>,
}

impl ProtectionStatus {
    /// A win raises protection, a placement worse than third lowers it.
    pub fn record(&mut self, rank: Rank, match_id: &str) {
        if rank == 1 {
            self.protection_level = (self.protection_level + 1).min(MAX_PROTECTION_LEVEL);
        } else if rank > 3 {
            self.protection_level = (self.protection_level - 1).max(0);
        }
        self.is_active = self.protection_level > 0;
        self.last_update_match = Some(match_id.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    VeryHard,
    Hard,
    Normal,
    Easy,
    VeryEasy,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 5] = [
        DifficultyLevel::VeryHard,
        DifficultyLevel::Hard,
        DifficultyLevel::Normal,
        DifficultyLevel::Easy,
        DifficultyLevel::VeryEasy,
    ];

    pub fn from_coefficient(coefficient: f64) -> Self {
        if coefficient < 0.7 {
            DifficultyLevel::VeryHard
        } else if coefficient < 0.9 {
            DifficultyLevel::Hard
        } else if coefficient < 1.1 {
            DifficultyLevel::Normal
        } else if coefficient < 1.3 {
            DifficultyLevel::Easy
        } else {
            DifficultyLevel::VeryEasy
        }
    }

    /// One step toward `Normal`; `Normal` itself steps to `Easy`.
    pub fn fallback(&self) -> Self {
        match self {
            DifficultyLevel::VeryHard => DifficultyLevel::Hard,
            DifficultyLevel::Hard => DifficultyLevel::Normal,
            DifficultyLevel::Normal => DifficultyLevel::Easy,
            DifficultyLevel::Easy => DifficultyLevel::Normal,
            DifficultyLevel::VeryEasy => DifficultyLevel::Easy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::VeryHard => "very_hard",
            DifficultyLevel::Hard => "hard",
            DifficultyLevel::Normal => "normal",
            DifficultyLevel::Easy => "easy",
            DifficultyLevel::VeryEasy => "very_easy",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredDifficulty {
    Challenge,
    #[default]
    Balanced,
    Practice,
}

impl PreferredDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferredDifficulty::Challenge => "challenge",
            PreferredDifficulty::Balanced => "balanced",
            PreferredDifficulty::Practice => "practice",
        }
    }
}

impl FromStr for PreferredDifficulty {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "challenge" => Ok(PreferredDifficulty::Challenge),
            "balanced" => Ok(PreferredDifficulty::Balanced),
            "practice" => Ok(PreferredDifficulty::Practice),
            other => Err(RankingError::InvalidRequest(format!(
                "unknown difficulty preference: {}",
                other
            ))),
        }
    }
}

/// One participant of a settled match; AI entries carry no uid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uid>,
    pub rank: Rank,
    pub score: Score,
}

impl Placement {
    pub fn human(uid: &str, rank: Rank, score: Score) -> Self {
        Self {
            uid: Some(uid.to_string()),
            rank,
            score,
        }
    }

    pub fn ai(rank: Rank, score: Score) -> Self {
        Self {
            uid: None,
            rank,
            score,
        }
    }

    pub fn is_ai(&self) -> bool {
        self.uid.is_none()
    }
}
