use std::collections::BTreeSet;

use super::types::{Placement, Rank, Score, Uid};

/// A human's engine-proposed rank before collisions are resolved.
#[derive(Debug, Clone)]
pub struct ProposedRank {
    pub uid: Uid,
    pub score: Score,
    pub rank: Rank,
}

/// Turns independently proposed human ranks into distinct slots in 1..=total.
///
/// Collisions move to the nearest free slot (later first, then earlier). The
/// resulting slot set is then handed out by score so that a higher human score
/// never sits below a lower one.
pub fn reconcile_ranks(mut proposed: Vec<ProposedRank>, total: usize) -> Vec<Placement> {
    let total = total.max(proposed.len());
    proposed.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then_with(|| b.score.total_cmp(&a.score))
            .then_with(|| a.uid.cmp(&b.uid))
    });

    let mut taken = BTreeSet::new();
    for entry in &proposed {
        let wanted = entry.rank.clamp(1, total);
        if let Some(slot) = nearest_free_slot(&taken, wanted, total) {
            taken.insert(slot);
        }
    }

    proposed.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.uid.cmp(&b.uid)));

    taken
        .into_iter()
        .zip(proposed)
        .map(|(slot, entry)| Placement::human(&entry.uid, slot, entry.score))
        .collect()
}

fn nearest_free_slot(taken: &BTreeSet<Rank>, wanted: Rank, total: usize) -> Option<Rank> {
    if !taken.contains(&wanted) {
        return Some(wanted);
    }
    (wanted + 1..=total)
        .find(|slot| !taken.contains(slot))
        .or_else(|| (1..wanted).rev().find(|slot| !taken.contains(slot)))
}

/// Season points for a placement; fields larger than four scale them up.
pub fn points_for_rank(rank: Rank, total: usize) -> i64 {
    let base = match rank {
        1 => 100.0,
        2 => 60.0,
        3 => 30.0,
        4 => 10.0,
        _ => 0.0,
    };
    let multiplier = (total as f64 / 4.0).max(1.0);
    (base * multiplier).floor() as i64
}

/// Merges humans and AI into one rank-ascending list.
pub fn merge_by_rank(humans: Vec<Placement>, ai: Vec<Placement>) -> Vec<Placement> {
    let mut merged: Vec<Placement> = humans.into_iter().chain(ai).collect();
    merged.sort_by_key(|placement| placement.rank);
    merged
}
