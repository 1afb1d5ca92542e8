use serde::{Deserialize, Serialize};

use crate::ranking::types::Placement;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleMatchResponse {
    pub match_id: String,
    pub placements: Vec<Placement>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdateResponse {
    pub uid: String,
    pub updated: bool,
}

#[derive(Deserialize)]
pub struct RecommendationParams {
    pub difficulty: Option<String>,
    pub limit: Option<usize>,
}
