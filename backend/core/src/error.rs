use thiserror::Error;

/// Top-level error type for DeepRead components.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to load document: {0}")]
    Load(String),

    /// A render was superseded by a newer request. Never shown to the user.
    #[error("rendering cancelled")]
    RenderCancelled,

    #[error("failed to render page: {0}")]
    Render(String),

    #[error("No file")]
    NoFile,

    #[error("invalid file type: {0}")]
    InvalidFileType(String),

    #[error("PDF processing failed: {0}")]
    Processing(String),

    #[error("Error communicating with the AI: {0}")]
    Chat(String),

    #[error("Error: PDF not processed yet. Please select or upload a PDF.")]
    MissingContext,

    #[error("Invalid filename")]
    InvalidFilename,

    #[error("Not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("a request is already in flight")]
    Busy,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReaderError {
    /// Whether this error is an expected cancellation rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ReaderError::RenderCancelled)
    }
}

impl From<std::io::Error> for ReaderError {
    fn from(err: std::io::Error) -> Self {
        ReaderError::Storage(err.to_string())
    }
}

pub type Result<T, E = ReaderError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_context_reads_as_user_facing_text() {
        assert_eq!(
            ReaderError::MissingContext.to_string(),
            "Error: PDF not processed yet. Please select or upload a PDF."
        );
    }

    #[test]
    fn only_render_cancelled_is_cancellation() {
        assert!(ReaderError::RenderCancelled.is_cancellation());
        assert!(!ReaderError::Render("boom".into()).is_cancellation());
    }
}
