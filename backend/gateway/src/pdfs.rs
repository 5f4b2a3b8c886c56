//! `GET /pdfs/:file`

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use deepread_core::ReaderError;

use crate::error::ApiError;
use crate::server::GatewayState;
use crate::store::is_servable_name;

pub async fn serve_pdf(
    Path(file): Path<String>,
    State(state): State<GatewayState>,
) -> Result<Response, ApiError> {
    if !is_servable_name(&file) {
        warn!(filename = %file, "Rejected suspicious PDF path");
        return Err(ReaderError::InvalidFilename.into());
    }
    let bytes = state.store.read(&file).await?;
    debug!(filename = %file, size = bytes.len(), "Serving PDF");

    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{file}\""))
        .map_err(|_| ApiError::from(ReaderError::InvalidFilename))?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
