use rand::Rng;

use super::types::{Placement, Rank, Score};
use crate::config::settings::SynthesisSettings;

/// Fills every rank not held by a human with a plausible AI score.
///
/// `humans` must already hold distinct ranks in 1..=humans.len() + ai_count.
/// The returned AI placements are rank-ascending and, merged with the humans,
/// keep scores non-increasing as rank grows.
pub fn synthesize_ai_scores<R: Rng + ?Sized>(
    humans: &[Placement],
    ai_count: usize,
    settings: &SynthesisSettings,
    rng: &mut R,
) -> Vec<Placement> {
    if ai_count == 0 {
        return Vec::new();
    }

    let total = humans.len() + ai_count;
    let mut anchors: Vec<&Placement> = humans.iter().collect();
    anchors.sort_by_key(|human| human.rank);

    let slots: Vec<Rank> = (1..=total)
        .filter(|rank| !anchors.iter().any(|human| human.rank == *rank))
        .take(ai_count)
        .collect();

    let ai = if anchors.is_empty() {
        baseline_scores(&slots, settings, rng)
    } else {
        slots
            .iter()
            .map(|&rank| Placement::ai(rank, anchored_score(rank, &anchors, settings, rng)))
            .collect()
    };

    repair(&anchors, ai, settings.score_floor)
}

fn anchored_score<R: Rng + ?Sized>(
    rank: Rank,
    anchors: &[&Placement],
    settings: &SynthesisSettings,
    rng: &mut R,
) -> Score {
    let better = anchors.iter().rev().find(|human| human.rank < rank);
    let worse = anchors.iter().find(|human| human.rank > rank);

    match (better, worse) {
        (Some(b), Some(l)) => {
            let span = (l.rank - b.rank) as f64;
            let offset = (rank - b.rank) as f64;
            let interpolated = b.score - (b.score - l.score) * offset / span;
            interpolated + signed_jitter(settings.jitter, rng)
        }
        (Some(b), None) => {
            let distance = (rank - b.rank) as f64;
            let score = b.score - settings.rank_gap * distance - jitter_magnitude(settings.jitter, rng);
            score.max(settings.score_floor)
        }
        (None, Some(l)) => {
            let distance = (l.rank - rank) as f64;
            l.score + settings.rank_gap * distance + jitter_magnitude(settings.jitter, rng)
        }
        (None, None) => settings.baseline_min,
    }
}

/// All-AI lobby: independent baseline draws, best score on rank 1.
fn baseline_scores<R: Rng + ?Sized>(
    slots: &[Rank],
    settings: &SynthesisSettings,
    rng: &mut R,
) -> Vec<Placement> {
    let mut scores: Vec<Score> = slots
        .iter()
        .map(|_| {
            let base = if settings.baseline_max > settings.baseline_min {
                rng.gen_range(settings.baseline_min..=settings.baseline_max)
            } else {
                settings.baseline_min
            };
            base + signed_jitter(settings.jitter, rng)
        })
        .collect();
    scores.sort_by(|a, b| b.total_cmp(a));

    slots
        .iter()
        .zip(scores)
        .map(|(&rank, score)| Placement::ai(rank, score))
        .collect()
}

fn signed_jitter<R: Rng + ?Sized>(jitter: f64, rng: &mut R) -> f64 {
    if jitter > 0.0 {
        rng.gen_range(-jitter..=jitter)
    } else {
        0.0
    }
}

/// Magnitude in (0, jitter], so offsets away from an anchor never collapse.
fn jitter_magnitude<R: Rng + ?Sized>(jitter: f64, rng: &mut R) -> f64 {
    if jitter > 0.0 {
        jitter * (1.0 - rng.gen_range(0.0..1.0))
    } else {
        0.0
    }
}

/// Walks the combined field in rank order and clamps each AI score between the
/// previous entry and the next human below. Human scores are never touched;
/// when a human above is already under the floor, ordering wins.
fn repair(anchors: &[&Placement], mut ai: Vec<Placement>, floor: Score) -> Vec<Placement> {
    ai.sort_by_key(|placement| placement.rank);

    let mut previous: Option<Score> = None;
    let mut ai_iter = ai.iter_mut().peekable();
    let mut human_iter = anchors.iter().peekable();

    loop {
        let next_ai_rank = ai_iter.peek().map(|p| p.rank);
        let next_human_rank = human_iter.peek().map(|h| h.rank);

        let ai_turn = match (next_ai_rank, next_human_rank) {
            (None, None) => break,
            (Some(ai_rank), Some(human_rank)) => ai_rank < human_rank,
            (Some(_), None) => true,
            (None, Some(_)) => false,
        };

        if ai_turn {
            let Some(placement) = ai_iter.next() else { break };
            let upper = previous.unwrap_or(f64::INFINITY);
            let below = anchors
                .iter()
                .find(|human| human.rank > placement.rank)
                .map(|human| human.score)
                .unwrap_or(floor);
            let lower = below.min(upper);

            let mut score = placement.score;
            if !score.is_finite() {
                score = lower;
            }
            placement.score = score.clamp(lower, upper);
            previous = Some(placement.score);
        } else if let Some(human) = human_iter.next() {
            previous = Some(human.score);
        }
    }

    ai
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::placement::merge_by_rank;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_consistent(field: &[Placement], total: usize) {
        let ranks: Vec<_> = field.iter().map(|p| p.rank).collect();
        assert_eq!(ranks, (1..=total).collect::<Vec<_>>());
        for pair in field.windows(2) {
            assert!(
                pair[0].score >= pair[1].score,
                "rank {} scored {} but rank {} scored {}",
                pair[0].rank,
                pair[0].score,
                pair[1].rank,
                pair[1].score
            );
        }
    }

    #[test]
    fn test_single_human_in_second_place() {
        let settings = SynthesisSettings::default();
        let humans = vec![Placement::human("p1", 2, 5000.0)];

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ai = synthesize_ai_scores(&humans, 3, &settings, &mut rng);
            let ranks: Vec<_> = ai.iter().map(|p| p.rank).collect();
            assert_eq!(ranks, vec![1, 3, 4]);
            assert!(ai[0].score > 5050.0);
            assert!(ai[1].score < 4950.0);
            assert!(ai[2].score < ai[1].score);

            let field = merge_by_rank(humans.clone(), ai);
            assert_consistent(&field, 4);
        }
    }

    #[test]
    fn test_ai_between_humans_is_interpolated() {
        let settings = SynthesisSettings::default();
        let humans = vec![Placement::human("a", 1, 3000.0), Placement::human("b", 3, 2000.0)];
        let mut rng = StdRng::seed_from_u64(9);

        let ai = synthesize_ai_scores(&humans, 1, &settings, &mut rng);
        assert_eq!(ai.len(), 1);
        assert_eq!(ai[0].rank, 2);
        assert!((ai[0].score - 2500.0).abs() <= 20.0);
    }

    #[test]
    fn test_floor_applies_below_humans() {
        let settings = SynthesisSettings::default();
        let humans = vec![Placement::human("a", 1, 180.0)];
        let mut rng = StdRng::seed_from_u64(5);

        let ai = synthesize_ai_scores(&humans, 4, &settings, &mut rng);
        assert!(ai.iter().all(|p| p.score >= 100.0));
        assert_consistent(&merge_by_rank(humans, ai), 5);
    }

    #[test]
    fn test_ordering_beats_floor() {
        let settings = SynthesisSettings::default();
        let humans = vec![Placement::human("a", 1, 40.0)];
        let mut rng = StdRng::seed_from_u64(5);

        let ai = synthesize_ai_scores(&humans, 2, &settings, &mut rng);
        assert!(ai.iter().all(|p| p.score <= 40.0));
        assert_consistent(&merge_by_rank(humans, ai), 3);
    }

    #[test]
    fn test_all_ai_lobby_uses_baseline() {
        let settings = SynthesisSettings::default();
        let mut rng = StdRng::seed_from_u64(11);

        let ai = synthesize_ai_scores(&[], 5, &settings, &mut rng);
        assert_consistent(&ai, 5);
        assert!(ai.iter().all(|p| (480.0..=720.0).contains(&p.score)));
    }

    #[test]
    fn test_random_fields_stay_consistent() {
        let settings = SynthesisSettings::default();
        for seed in 0..100u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let human_count = rng.gen_range(1..4usize);
            let ai_count = rng.gen_range(0..5usize);
            let total = human_count + ai_count;

            let mut ranks: Vec<Rank> = (1..=total).collect();
            for i in (1..ranks.len()).rev() {
                let j = rng.gen_range(0..=i);
                ranks.swap(i, j);
            }
            let mut chosen: Vec<Rank> = ranks.into_iter().take(human_count).collect();
            chosen.sort();

            let humans: Vec<Placement> = chosen
                .iter()
                .enumerate()
                .map(|(i, &rank)| Placement::human(&format!("p{}", i), rank, 4000.0 - 900.0 * i as f64))
                .collect();

            let ai = synthesize_ai_scores(&humans, ai_count, &settings, &mut rng);
            assert_eq!(ai.len(), ai_count);
            assert_consistent(&merge_by_rank(humans, ai), total);
        }
    }
}
