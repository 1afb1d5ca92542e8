use rand::Rng;

use super::probability::{rank_for_value, select_vector, uniform};
use super::types::{AdaptiveMode, PlayerRankingConfig, Rank, Score, ScoreBand};
use crate::config::settings::RankingSettings;

/// Maps a raw score onto a final placement for a match of `participant_count`.
///
/// The score is located in the player's bands, normalized against the band top
/// (top → 0.0, bottom → 1.0), transformed by the adaptive mode and finally
/// mapped through the cumulative probability table.
pub fn assign_rank<R: Rng + ?Sized>(
    score: Score,
    config: &PlayerRankingConfig,
    participant_count: usize,
    settings: &RankingSettings,
    rng: &mut R,
) -> Rank {
    if participant_count <= 1 {
        return 1;
    }

    let fallback_band;
    let band = match locate_band(&config.score_thresholds, score) {
        Some(band) => band,
        None => {
            fallback_band = ScoreBand {
                min_score: 0.0,
                max_score: settings.max_score,
                rank_probabilities: Default::default(),
            };
            &fallback_band
        }
    };

    let probabilities = if band.rank_probabilities.is_empty() {
        uniform(participant_count)
    } else {
        select_vector(band, participant_count, settings.probability_tolerance)
    };

    let value = match config.adaptive_mode {
        AdaptiveMode::Static => normalize(score, band),
        AdaptiveMode::Dynamic => {
            let noise = rng.gen_range(-settings.dynamic_noise..=settings.dynamic_noise);
            (normalize(score, band) + noise).clamp(0.0, 1.0)
        }
        AdaptiveMode::Learning => {
            let rate = config
                .learning_rate
                .clamp(settings.min_learning_rate, settings.max_learning_rate);
            normalize(score * (1.0 + rate), band)
        }
    };

    rank_for_value(value, &probabilities).min(participant_count)
}

/// Band containing `score`, or the nearest one when it falls outside all of
/// them. `None` only for an empty band list.
pub fn locate_band(bands: &[ScoreBand], score: Score) -> Option<&ScoreBand> {
    if let Some(band) = bands.iter().find(|band| band.contains(score)) {
        return Some(band);
    }

    bands.iter().min_by(|a, b| {
        distance_to(a, score)
            .partial_cmp(&distance_to(b, score))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

fn distance_to(band: &ScoreBand, score: Score) -> f64 {
    if score < band.min_score {
        band.min_score - score
    } else if score >= band.max_score {
        score - band.max_score
    } else {
        0.0
    }
}

/// Distance from the top of the band, in [0, 1].
pub fn normalize(score: Score, band: &ScoreBand) -> f64 {
    let width = band.width();
    if width <= 0.0 || !width.is_finite() {
        return 0.5;
    }
    ((band.max_score - score) / width).clamp(0.0, 1.0)
}

/// Checks the invariants an admin-supplied band list must satisfy.
pub fn validate_bands(bands: &[ScoreBand], tolerance: f64) -> Result<(), String> {
    if bands.is_empty() {
        return Err("at least one score band is required".to_string());
    }

    for band in bands {
        if !band.min_score.is_finite() || !band.max_score.is_finite() {
            return Err("band boundaries must be finite".to_string());
        }
        if band.min_score >= band.max_score {
            return Err(format!(
                "band [{}, {}) is empty",
                band.min_score, band.max_score
            ));
        }
        for (count, probabilities) in &band.rank_probabilities {
            if probabilities.len() != *count {
                return Err(format!(
                    "table for {} participants has {} entries",
                    count,
                    probabilities.len()
                ));
            }
            if !super::probability::is_valid(probabilities, tolerance) {
                return Err(format!("table for {} participants does not sum to 1", count));
            }
        }
    }

    for pair in bands.windows(2) {
        if pair[1].min_score < pair[0].max_score {
            return Err("score bands must be sorted and non-overlapping".to_string());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::types::{RankingMode, SegmentTier};
    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;

    fn config_with(mode: AdaptiveMode, bands: Vec<ScoreBand>) -> PlayerRankingConfig {
        let now = Utc::now().naive_utc();
        PlayerRankingConfig {
            uid: "p1".to_string(),
            segment_tier: SegmentTier::Gold,
            score_thresholds: bands,
            max_rank: 8,
            adaptive_mode: mode,
            learning_rate: 0.1,
            ranking_mode: RankingMode::Hybrid,
            auto_adjust_learning_rate: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn single_band() -> Vec<ScoreBand> {
        let mut tables = BTreeMap::new();
        tables.insert(4, vec![0.4, 0.3, 0.2, 0.1]);
        vec![ScoreBand {
            min_score: 0.0,
            max_score: 1000.0,
            rank_probabilities: tables,
        }]
    }

    #[test]
    fn test_static_top_of_band_takes_first_place() {
        let config = config_with(AdaptiveMode::Static, single_band());
        let mut rng = StdRng::seed_from_u64(7);
        let settings = RankingSettings::default();

        assert!((normalize(950.0, &config.score_thresholds[0]) - 0.05).abs() < 1e-9);
        assert_eq!(assign_rank(950.0, &config, 4, &settings, &mut rng), 1);
        assert_eq!(assign_rank(500.0, &config, 4, &settings, &mut rng), 2);
        assert_eq!(assign_rank(50.0, &config, 4, &settings, &mut rng), 4);
    }

    #[test]
    fn test_scores_outside_bands_clamp_to_nearest() {
        let config = config_with(AdaptiveMode::Static, single_band());
        let mut rng = StdRng::seed_from_u64(7);
        let settings = RankingSettings::default();

        assert_eq!(assign_rank(5000.0, &config, 4, &settings, &mut rng), 1);
        assert_eq!(assign_rank(-20.0, &config, 4, &settings, &mut rng), 4);
    }

    #[test]
    fn test_single_participant_is_first() {
        let config = config_with(AdaptiveMode::Dynamic, single_band());
        let mut rng = StdRng::seed_from_u64(1);
        let settings = RankingSettings::default();
        assert_eq!(assign_rank(10.0, &config, 1, &settings, &mut rng), 1);
        assert_eq!(assign_rank(10.0, &config, 0, &settings, &mut rng), 1);
    }

    #[test]
    fn test_learning_mode_biases_toward_better_ranks() {
        let settings = RankingSettings::default();
        let mut rng = StdRng::seed_from_u64(3);
        let learning = config_with(AdaptiveMode::Learning, single_band());
        let fixed = config_with(AdaptiveMode::Static, single_band());

        for score in [100.0, 350.0, 620.0, 880.0] {
            let boosted = assign_rank(score, &learning, 4, &settings, &mut rng);
            let plain = assign_rank(score, &fixed, 4, &settings, &mut rng);
            assert!(boosted <= plain);
        }
    }

    #[test]
    fn test_dynamic_mode_stays_in_range() {
        let config = config_with(AdaptiveMode::Dynamic, single_band());
        let settings = RankingSettings::default();
        let mut rng = StdRng::seed_from_u64(42);
        for i in 0..200 {
            let rank = assign_rank(i as f64 * 5.0, &config, 6, &settings, &mut rng);
            assert!((1..=6).contains(&rank));
        }
    }

    #[test]
    fn test_empty_bands_use_uniform_table() {
        let config = config_with(AdaptiveMode::Static, Vec::new());
        let settings = RankingSettings::default();
        let mut rng = StdRng::seed_from_u64(42);
        let rank = assign_rank(settings.max_score, &config, 4, &settings, &mut rng);
        assert_eq!(rank, 1);
    }

    #[test]
    fn test_validate_bands_rejects_overlap() {
        let mut bands = single_band();
        bands.push(ScoreBand {
            min_score: 900.0,
            max_score: 2000.0,
            rank_probabilities: BTreeMap::new(),
        });
        assert!(validate_bands(&bands, 0.01).is_err());
        assert!(validate_bands(&single_band(), 0.01).is_ok());
        assert!(validate_bands(&[], 0.01).is_err());
    }
}
