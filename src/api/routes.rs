use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use crate::api::handlers::{
    matches::settle_match,
    players::{get_player_config, get_recommendations, reset_player_config, tune_player, update_player_config},
    seeds::{get_seed_difficulty, get_system_statistics, refresh_seed},
    AppState,
};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/matches/settle", post(settle_match))
        .route("/api/players/:uid/config", get(get_player_config).patch(update_player_config))
        .route("/api/players/:uid/config/reset", post(reset_player_config))
        .route("/api/players/:uid/tune", post(tune_player))
        .route("/api/players/:uid/recommendations", get(get_recommendations))
        .route("/api/seeds/:seed/difficulty", get(get_seed_difficulty))
        .route("/api/seeds/:seed/refresh", post(refresh_seed))
        .route("/api/stats", get(get_system_statistics))
        .with_state(state)
}
