//! Chat endpoints backed by the gateway's [`ChatSession`](deepread_chat::ChatSession).

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::debug;

use deepread_core::wire::{ChatQuery, ChatWithPdfResponse};
use deepread_core::{ChatMessage, MessageStatus};

use crate::error::ApiError;
use crate::server::GatewayState;

/// `POST /api/chat`: send one question and wait for its reply.
pub async fn post_chat(
    State(state): State<GatewayState>,
    Json(body): Json<ChatQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let query = body.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("Empty query"));
    }
    let reply = state.chat.send_message(query);
    let id = reply.placeholder_id;
    let status = reply.settled().await;
    debug!(message = %id, "Chat reply settled");

    Ok(match status {
        MessageStatus::Resolved(answer) => (
            StatusCode::OK,
            Json(ChatWithPdfResponse {
                answer: Some(answer),
                error: None,
            }),
        ),
        MessageStatus::Failed(error) => (
            StatusCode::BAD_GATEWAY,
            Json(ChatWithPdfResponse {
                answer: None,
                error: Some(error),
            }),
        ),
        MessageStatus::Pending => (
            StatusCode::BAD_GATEWAY,
            Json(ChatWithPdfResponse {
                answer: None,
                error: Some("reply still pending".into()),
            }),
        ),
    })
}

/// `GET /api/transcript`
pub async fn get_transcript(State(state): State<GatewayState>) -> Json<Vec<ChatMessage>> {
    Json(state.chat.messages())
}
