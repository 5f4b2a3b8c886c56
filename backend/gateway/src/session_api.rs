use axum::{extract::State, Json};
use serde::Serialize;

use deepread_core::SessionContext;

use crate::server::{CurrentDocument, GatewayState};

#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub document: Option<CurrentDocument>,
    pub context: Option<SessionContext>,
    pub messages: usize,
}

/// Handler for `GET /api/session`
pub async fn get_session(State(state): State<GatewayState>) -> Json<SessionReport> {
    Json(SessionReport {
        document: state.current(),
        context: state.chat.context(),
        messages: state.chat.len(),
    })
}
