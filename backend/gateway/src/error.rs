use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use deepread_core::wire::ErrorBody;
use deepread_core::ReaderError;

/// An error on its way out of a handler as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<ReaderError> for ApiError {
    fn from(err: ReaderError) -> Self {
        let status = match &err {
            ReaderError::NoFile | ReaderError::InvalidFileType(_) | ReaderError::InvalidFilename => {
                StatusCode::BAD_REQUEST
            }
            ReaderError::NotFound => StatusCode::NOT_FOUND,
            ReaderError::Busy => StatusCode::CONFLICT,
            ReaderError::Chat(_) | ReaderError::MissingContext => StatusCode::BAD_GATEWAY,
            ReaderError::Load(_)
            | ReaderError::RenderCancelled
            | ReaderError::Render(_)
            | ReaderError::Processing(_)
            | ReaderError::Storage(_)
            | ReaderError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "Request failed");
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}
