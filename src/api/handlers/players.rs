use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use crate::api::models::{ConfigUpdateResponse, RecommendationParams};
use crate::errors::RankingError;
use crate::ranking::types::{ConfigPatch, PreferredDifficulty};
use crate::services::{AdaptiveConfigTuner, PlayerConfigService, SeedRecommendationAdvisor};
use super::{AppState, error_response, run_blocking};

const DEFAULT_RECOMMENDATION_LIMIT: usize = 5;
const MAX_RECOMMENDATION_LIMIT: usize = 50;

fn config_service(state: &AppState) -> PlayerConfigService {
    PlayerConfigService::new(state.pool.clone(), state.config.clone())
}

pub async fn get_player_config(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> impl IntoResponse {
    let service = config_service(&state);

    match run_blocking(move || service.get_player_config(&uid)).await {
        Ok(config) => Json(config).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn update_player_config(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(patch): Json<ConfigPatch>,
) -> impl IntoResponse {
    let service = config_service(&state);
    let key = uid.clone();

    match run_blocking(move || service.update_player_config(&key, &patch)).await {
        Ok(updated) => Json(ConfigUpdateResponse { uid, updated }).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn reset_player_config(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> impl IntoResponse {
    let service = config_service(&state);
    let key = uid.clone();

    match run_blocking(move || service.reset_player_config(&key)).await {
        Ok(updated) => Json(ConfigUpdateResponse { uid, updated }).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn tune_player(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> impl IntoResponse {
    let tuner = AdaptiveConfigTuner::new(state.pool.clone(), state.config.clone());

    match run_blocking(move || Ok(tuner.apply(&uid))).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Query(params): Query<RecommendationParams>,
) -> impl IntoResponse {
    let preference = match params.difficulty.as_deref() {
        Some(raw) => match raw.parse::<PreferredDifficulty>() {
            Ok(preference) => preference,
            Err(e) => return error_response(e.into()),
        },
        None => PreferredDifficulty::default(),
    };

    let limit = params.limit.unwrap_or(DEFAULT_RECOMMENDATION_LIMIT);
    if limit == 0 || limit > MAX_RECOMMENDATION_LIMIT {
        let e = RankingError::InvalidRequest(format!("limit must be within 1..={}", MAX_RECOMMENDATION_LIMIT));
        return error_response(e.into());
    }

    let advisor = SeedRecommendationAdvisor::new(state.pool.clone(), state.config.clone());

    match run_blocking(move || advisor.recommend(&uid, preference, limit)).await {
        Ok(recommendation) => Json(recommendation).into_response(),
        Err(e) => error_response(e),
    }
}
