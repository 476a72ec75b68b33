//! Chat endpoint.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::debug;

use assessor_core::types::{Message, UserId};
use assessor_core::ChatTurn;

use crate::error::{ApiError, ApiResult};
use crate::extract::AppJson;
use crate::routes::require_user_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalkRequest {
    pub user_id: UserId,
    pub message: String,
    #[serde(default)]
    pub history: Vec<Message>,
}

/// POST /chat/talk
pub async fn talk(
    State(state): State<AppState>,
    AppJson(request): AppJson<TalkRequest>,
) -> ApiResult<Json<ChatTurn>> {
    let user_id = require_user_id("userId", request.user_id)?;
    if request.message.trim().is_empty() {
        return Err(ApiError::invalid_field("message", "Mensagem obrigatória"));
    }

    debug!(user_id, history = request.history.len(), "Chat turn requested");
    let turn = state
        .chat
        .process_user_message(user_id, &request.message, &request.history)
        .await?;
    Ok(Json(turn))
}
