pub mod assignment;
pub mod placement;
pub mod probability;
pub mod synthesis;
pub mod types;

pub use assignment::{assign_rank, locate_band, normalize, validate_bands};
pub use placement::{ProposedRank, merge_by_rank, points_for_rank, reconcile_ranks};
pub use probability::rank_for_value;
pub use synthesis::synthesize_ai_scores;
pub use types::*;
