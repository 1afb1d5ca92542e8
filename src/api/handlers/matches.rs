use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use crate::api::models::SettleMatchResponse;
use crate::services::MatchSettlementCoordinator;
use crate::services::settlement::MatchSubmission;
use super::{AppState, error_response, run_blocking};

pub async fn settle_match(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<MatchSubmission>,
) -> impl IntoResponse {
    let coordinator = MatchSettlementCoordinator::new(
        state.pool.clone(),
        state.config.clone(),
        state.queue.clone(),
    );
    let match_id = submission.match_id.clone();

    match run_blocking(move || coordinator.settle_match(&submission)).await {
        Ok(placements) => Json(SettleMatchResponse { match_id, placements }).into_response(),
        Err(e) => error_response(e),
    }
}
