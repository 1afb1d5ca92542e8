use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use crate::services::SeedStatisticsService;
use crate::services::statistics::system_statistics;
use super::{AppState, error_response, run_blocking};

fn seed_service(state: &AppState) -> SeedStatisticsService {
    SeedStatisticsService::new(state.pool.clone(), state.config.seeds.clone())
}

pub async fn get_seed_difficulty(
    State(state): State<Arc<AppState>>,
    Path(seed): Path<String>,
) -> impl IntoResponse {
    let service = seed_service(&state);

    match run_blocking(move || service.difficulty(&seed)).await {
        Ok(difficulty) => Json(difficulty).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn refresh_seed(
    State(state): State<Arc<AppState>>,
    Path(seed): Path<String>,
) -> impl IntoResponse {
    let service = seed_service(&state);

    match run_blocking(move || service.update(&seed)).await {
        Ok(update) => Json(update).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_system_statistics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pool = state.pool.clone();

    match run_blocking(move || system_statistics(&pool)).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => error_response(e),
    }
}
