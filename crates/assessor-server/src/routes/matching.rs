//! Matching feed and interaction endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use assessor_core::error::AssessorError;
use assessor_core::types::UserId;
use assessor_core::{FeedCard, InteractionType};

use crate::error::ApiResult;
use crate::extract::{AppJson, AppQuery};
use crate::routes::require_user_id;
use crate::state::AppState;

pub const DEFAULT_FEED_LIMIT: usize = 10;
pub const MAX_FEED_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub user_id: UserId,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub items: Vec<FeedCard>,
}

/// GET /matching/feed?userId=&limit=
pub async fn feed(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<FeedQuery>,
) -> ApiResult<Json<FeedResponse>> {
    let user_id = require_user_id("userId", query.user_id)?;
    let limit = query.limit.unwrap_or(DEFAULT_FEED_LIMIT);
    if !(1..=MAX_FEED_LIMIT).contains(&limit) {
        return Err(AssessorError::out_of_range(
            "limit",
            format!("limit must be between 1 and {}", MAX_FEED_LIMIT),
            format!("Use a limit in 1..={}", MAX_FEED_LIMIT),
        )
        .into());
    }

    let items = state.matching.feed_cards(user_id, limit);
    debug!(user_id, limit, items = items.len(), "Feed served");
    Ok(Json(FeedResponse { items }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRequest {
    pub user_id: UserId,
    pub candidate_id: UserId,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub score: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct InteractionResponse {
    pub recorded: bool,
}

/// POST /matching/interactions
///
/// A user interacting with themselves is ignored rather than rejected.
pub async fn record_interaction(
    State(state): State<AppState>,
    AppJson(request): AppJson<InteractionRequest>,
) -> ApiResult<Json<InteractionResponse>> {
    let user_id = require_user_id("userId", request.user_id)?;
    let candidate_id = require_user_id("candidateId", request.candidate_id)?;
    if let Some(score) = request.score {
        if score > 100 {
            return Err(AssessorError::out_of_range(
                "score",
                "score must be between 0 and 100",
                "Send the compatibility score shown on the card",
            )
            .into());
        }
    }

    if user_id == candidate_id {
        return Ok(Json(InteractionResponse { recorded: false }));
    }

    let candidate = state.matching.build_profile(candidate_id);
    state
        .matching
        .record_interaction(user_id, &candidate, request.kind, request.score);
    Ok(Json(InteractionResponse { recorded: true }))
}
