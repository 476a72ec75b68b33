//! Route definitions for the HTTP API.

mod chat;
mod engagement;
mod health;
mod matching;
mod profiles;
mod timeline;

use axum::{
    routing::{get, post},
    Router,
};

use assessor_core::types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/chat/talk", post(chat::talk))
        .route("/matching/feed", get(matching::feed))
        .route("/matching/interactions", post(matching::record_interaction))
        .route("/engagement/checkins", get(engagement::check_ins))
        .route("/profiles/:id", get(profiles::get_profile))
        .route("/timeline", get(timeline::snapshot))
        .with_state(state)
}

/// User ids are positive.
pub(crate) fn require_user_id(field: &str, id: UserId) -> Result<UserId, ApiError> {
    if id > 0 {
        Ok(id)
    } else {
        Err(ApiError::invalid_field(field, format!("{} must be a positive id", field)))
    }
}

pub use chat::*;
pub use engagement::*;
pub use health::*;
pub use matching::*;
pub use profiles::*;
pub use timeline::*;
