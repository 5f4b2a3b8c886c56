use async_trait::async_trait;

use crate::error::Result;
use crate::session::{ProcessedDocument, SessionContext};

/// The external retrieval-augmented backend that parses documents and answers questions.
#[async_trait]
pub trait RagBackend: Send + Sync {
    /// Backend name for logging (e.g., "http", "mock").
    fn name(&self) -> &str;

    /// Ask the backend to ingest a stored PDF by filename.
    async fn process_pdf(&self, filename: &str) -> Result<ProcessedDocument>;

    /// Ask a question about a previously processed document and return the answer.
    async fn chat(&self, query: &str, context: &SessionContext) -> Result<String>;
}
