//! Standalone check-in plan.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use assessor_core::engagement::CheckInPlan;
use assessor_core::types::UserId;

use crate::error::ApiResult;
use crate::extract::AppQuery;
use crate::routes::require_user_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInQuery {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub check_ins: Vec<CheckInPlan>,
}

/// GET /engagement/checkins?userId=
pub async fn check_ins(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CheckInQuery>,
) -> ApiResult<Json<CheckInResponse>> {
    let user_id = require_user_id("userId", query.user_id)?;
    Ok(Json(CheckInResponse {
        check_ins: state.chat.plan_standalone_check_ins(user_id),
    }))
}
