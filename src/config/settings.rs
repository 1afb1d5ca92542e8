#[derive(Debug, Clone)]
pub struct RankingSettings {
    pub probability_tolerance: f64,
    pub dynamic_noise: f64,
    pub min_learning_rate: f64,
    pub max_learning_rate: f64,
    pub max_score: f64,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            probability_tolerance: 0.01,
            dynamic_noise: 0.1, // ±10% of the band
            min_learning_rate: 0.01,
            max_learning_rate: 0.3,
            max_score: 1_000_000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub score_floor: f64,
    pub rank_gap: f64,
    pub jitter: f64,
    pub baseline_min: f64,
    pub baseline_max: f64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            score_floor: 100.0,
            rank_gap: 50.0,
            jitter: 20.0,
            baseline_min: 500.0,
            baseline_max: 700.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeedStatsSettings {
    pub min_samples: i64,
    pub reference_score: f64,
    pub min_coefficient: f64,
    pub max_coefficient: f64,
    pub cache_days_to_keep: i64,
}

impl Default for SeedStatsSettings {
    fn default() -> Self {
        Self {
            min_samples: 10,
            reference_score: 1000.0,
            min_coefficient: 0.5,
            max_coefficient: 2.0,
            cache_days_to_keep: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TuningSettings {
    pub min_history: usize,
    pub full_confidence_history: usize,
    pub min_confidence: f64,
    pub recent_window: usize,
    pub win_rate_gap: f64,
    pub learning_rate_step_up: f64,
    pub learning_rate_step_down: f64,
    pub negligible_learning_rate_change: f64,
    pub plateau_window: usize,
    pub plateau_variance: f64,
    pub expand_range: f64,
    pub lower_thresholds: f64,
    pub history_limit: usize,
}

impl Default for TuningSettings {
    fn default() -> Self {
        Self {
            min_history: 5,
            full_confidence_history: 20,
            min_confidence: 0.3,
            recent_window: 10,
            win_rate_gap: 0.1,
            learning_rate_step_up: 0.05,
            learning_rate_step_down: 0.03,
            negligible_learning_rate_change: 0.01,
            plateau_window: 5,
            plateau_variance: 1000.0,
            expand_range: 0.2,
            lower_thresholds: 0.15,
            history_limit: 200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ranking: RankingSettings,
    pub synthesis: SynthesisSettings,
    pub seeds: SeedStatsSettings,
    pub tuning: TuningSettings,
    pub database_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            ranking: RankingSettings::default(),
            synthesis: SynthesisSettings::default(),
            seeds: SeedStatsSettings::default(),
            tuning: TuningSettings::default(),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "placement_ranking.db".to_string()),
        }
    }

    pub fn with_database_path(mut self, path: &str) -> Self {
        self.database_path = path.to_string();
        self
    }
}
