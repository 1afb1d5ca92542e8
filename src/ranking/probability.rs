use super::types::{Rank, ScoreBand};

pub fn uniform(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// A vector is usable when it has one finite, non-negative entry per rank and
/// sums to 1 within `tolerance`.
pub fn is_valid(probabilities: &[f64], tolerance: f64) -> bool {
    if probabilities.is_empty() {
        return false;
    }
    if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return false;
    }
    let sum: f64 = probabilities.iter().sum();
    (sum - 1.0).abs() <= tolerance
}

/// Stretches a distribution over `n` ranks by linear interpolation of its CDF.
pub fn resample(base: &[f64], n: usize) -> Vec<f64> {
    if n == 0 || base.is_empty() {
        return uniform(n);
    }
    if base.len() == n {
        return base.to_vec();
    }

    let cumulative = cumulative_sums(base);
    let total = *cumulative.last().unwrap_or(&1.0);
    if total <= 0.0 {
        return uniform(n);
    }

    let cdf = |x: f64| -> f64 {
        let position = x * base.len() as f64;
        let idx = position.floor() as usize;
        if idx >= base.len() {
            return total;
        }
        let below = if idx == 0 { 0.0 } else { cumulative[idx - 1] };
        below + base[idx] * (position - idx as f64)
    };

    (0..n)
        .map(|j| {
            let lo = cdf(j as f64 / n as f64);
            let hi = cdf((j + 1) as f64 / n as f64);
            (hi - lo) / total
        })
        .collect()
}

/// Picks the table for `participant_count`: the exact key, else the nearest
/// key (stretched to the right length), else uniform.
pub fn select_vector(band: &ScoreBand, participant_count: usize, tolerance: f64) -> Vec<f64> {
    let candidate = band
        .rank_probabilities
        .get(&participant_count)
        .or_else(|| nearest_key(band, participant_count));

    match candidate {
        Some(probabilities) if is_valid(probabilities, tolerance) => {
            resample(probabilities, participant_count)
        }
        _ => uniform(participant_count),
    }
}

fn nearest_key(band: &ScoreBand, participant_count: usize) -> Option<&Vec<f64>> {
    band.rank_probabilities
        .iter()
        .min_by_key(|(count, _)| (count.abs_diff(participant_count), usize::MAX - **count))
        .map(|(_, probabilities)| probabilities)
}

pub fn cumulative_sums(probabilities: &[f64]) -> Vec<f64> {
    probabilities
        .iter()
        .scan(0.0, |acc, p| {
            *acc += p;
            Some(*acc)
        })
        .collect()
}

/// 1 + number of cumulative buckets whose upper bound lies below `value`.
pub fn rank_for_value(value: f64, probabilities: &[f64]) -> Rank {
    let count = probabilities.len().max(1);
    let below = cumulative_sums(probabilities)
        .iter()
        .filter(|upper| **upper < value)
        .count();
    (1 + below).clamp(1, count)
}
