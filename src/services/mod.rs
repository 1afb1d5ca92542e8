pub mod player_config;
pub mod queue;
pub mod recommendation;
pub mod seed_statistics;
pub mod server;
pub mod settlement;
pub mod statistics;
pub mod tuning;

pub use player_config::PlayerConfigService;
pub use queue::{DeferredTuningQueue, SpawnedTuningQueue, TuningQueue};
pub use recommendation::SeedRecommendationAdvisor;
pub use seed_statistics::SeedStatisticsService;
pub use server::ServerService;
pub use settlement::MatchSettlementCoordinator;
pub use tuning::AdaptiveConfigTuner;
