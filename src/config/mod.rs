pub mod settings;
pub mod tiers;

pub use settings::AppConfig;
pub use tiers::{get_tier_defaults, get_tier_protection, target_difficulty};
