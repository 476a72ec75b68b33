//! Timeline snapshot endpoint.

use axum::{extract::State, Json};
use serde::Deserialize;

use assessor_core::error::AssessorError;
use assessor_core::timeline::{DEFAULT_TIMELINE_LIMIT, MAX_TIMELINE_LIMIT, MIN_TIMELINE_LIMIT};
use assessor_core::types::UserId;
use assessor_core::TimelineSnapshot;

use crate::error::ApiResult;
use crate::extract::AppQuery;
use crate::routes::require_user_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineQuery {
    pub user_id: UserId,
    pub limit: Option<usize>,
}

/// GET /timeline?userId=&limit=
pub async fn snapshot(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TimelineQuery>,
) -> ApiResult<Json<TimelineSnapshot>> {
    let user_id = require_user_id("userId", query.user_id)?;
    let limit = query.limit.unwrap_or(DEFAULT_TIMELINE_LIMIT);
    if !(MIN_TIMELINE_LIMIT..=MAX_TIMELINE_LIMIT).contains(&limit) {
        return Err(AssessorError::out_of_range(
            "limit",
            format!(
                "limit must be between {} and {}",
                MIN_TIMELINE_LIMIT, MAX_TIMELINE_LIMIT
            ),
            format!("Use a limit in {}..={}", MIN_TIMELINE_LIMIT, MAX_TIMELINE_LIMIT),
        )
        .into());
    }

    Ok(Json(state.timeline.snapshot(user_id, limit)))
}
