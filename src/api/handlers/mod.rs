use std::sync::Arc;

use anyhow::Context;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;

use crate::config::settings::AppConfig;
use crate::database::DbPool;
use crate::errors::RankingError;
use crate::services::TuningQueue;

pub mod matches;
pub mod players;
pub mod seeds;

pub struct AppState {
    pub pool: DbPool,
    pub config: AppConfig,
    pub queue: Arc<dyn TuningQueue>,
}

/// Runs store work on the blocking pool so SQLite never stalls the reactor.
pub(crate) async fn run_blocking<T, F>(work: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("Blocking task failed")?
}

pub(crate) fn error_response(e: anyhow::Error) -> Response {
    match e.downcast_ref::<RankingError>() {
        Some(RankingError::InvalidRequest(_) | RankingError::InvalidConfig(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Some(RankingError::NotFound { .. }) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
        _ => {
            error!("Request failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Query Error: {:#}", e)).into_response()
        }
    }
}
