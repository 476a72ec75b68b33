//! Deep profile lookup.

use axum::{
    extract::{Path, State},
    Json,
};

use assessor_core::types::UserId;
use assessor_core::DeepProfile;

use crate::error::ApiResult;
use crate::routes::require_user_id;
use crate::state::AppState;

/// GET /profiles/:id
///
/// Unknown users get an empty profile, never a 404.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> ApiResult<Json<DeepProfile>> {
    let user_id = require_user_id("id", id)?;
    Ok(Json(state.matching.build_profile(user_id)))
}
