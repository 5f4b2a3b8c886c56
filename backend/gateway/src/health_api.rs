//! Gateway Health API

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::server::GatewayState;

#[derive(Serialize)]
pub struct HealthReport {
    pub status: String,
    pub backend: String,
    pub uptime_seconds: u64,
    /// File currently held in the PDF directory.
    pub stored_file: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Handler for `GET /api/health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    let stored_file = state.store.current().await.unwrap_or_else(|e| {
        warn!(error = %e, "Could not list the PDF directory");
        None
    });
    Json(HealthReport {
        status: "ok".into(),
        backend: state.backend.name().to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        stored_file,
        timestamp: Utc::now(),
    })
}
