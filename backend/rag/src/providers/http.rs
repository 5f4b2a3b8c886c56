use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use deepread_core::wire::{ChatWithPdfRequest, ChatWithPdfResponse, ProcessPdfRequest};
use deepread_core::{ProcessedDocument, RagBackend, ReaderError, Result, SessionContext};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// RAG backend reached over HTTP.
///
/// No timeout is imposed on requests; they run until the backend answers or
/// the connection fails.
pub struct HttpRagBackend {
    client: Client,
    base_url: String,
}

impl HttpRagBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BACKEND_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for HttpRagBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RagBackend for HttpRagBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn process_pdf(&self, filename: &str) -> Result<ProcessedDocument> {
        let start = Instant::now();
        debug!(filename = %filename, backend = %self.base_url, "Requesting PDF processing");

        let response = self
            .client
            .post(format!("{}/api/process_pdf", self.base_url))
            .json(&ProcessPdfRequest {
                filename: filename.to_string(),
            })
            .send()
            .await
            .map_err(|e| ReaderError::Processing(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Backend rejected PDF processing");
            let detail = if body.is_empty() { status.to_string() } else { body };
            return Err(ReaderError::Processing(detail));
        }

        let processed: ProcessedDocument = response
            .json()
            .await
            .map_err(|e| ReaderError::Processing(format!("malformed backend response: {e}")))?;

        debug!(
            session = %processed.pdf_session_id,
            collection = %processed.collection_name_for_rag,
            latency_ms = start.elapsed().as_millis() as u64,
            "PDF processed"
        );
        Ok(processed)
    }

    async fn chat(&self, query: &str, context: &SessionContext) -> Result<String> {
        let start = Instant::now();

        let response = self
            .client
            .post(format!("{}/api/chat_with_pdf", self.base_url))
            .json(&ChatWithPdfRequest::new(query, context))
            .send()
            .await
            .map_err(|e| ReaderError::Chat(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Prefer the backend's own error message, fall back to the status line.
            let body: ChatWithPdfResponse = response.json().await.unwrap_or_default();
            let detail = body
                .error
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            return Err(ReaderError::Chat(detail));
        }

        let body: ChatWithPdfResponse = response
            .json()
            .await
            .map_err(|e| ReaderError::Chat(format!("malformed backend response: {e}")))?;

        if let Some(error) = body.error {
            return Err(ReaderError::Chat(error));
        }
        let answer = body
            .answer
            .ok_or_else(|| ReaderError::Chat("backend returned no answer".to_string()))?;

        debug!(
            session = %context.pdf_session_id,
            latency_ms = start.elapsed().as_millis() as u64,
            "Chat answered"
        );
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    async fn spawn_backend(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn process_pdf_parses_session_ids() {
        let router = Router::new().route(
            "/api/process_pdf",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "message": "ok",
                    "pdf_internal_id": "7",
                    "original_filename": body["filename"],
                    "collection_name_for_rag": "col_7",
                    "pdf_session_id": "sess-7",
                }))
            }),
        );
        let backend = HttpRagBackend::new().with_base_url(spawn_backend(router).await);

        let processed = backend.process_pdf("notes.pdf").await.unwrap();
        assert_eq!(processed.original_filename.as_deref(), Some("notes.pdf"));
        assert_eq!(processed.context(), SessionContext::new("sess-7", "col_7"));
    }

    #[tokio::test]
    async fn process_pdf_failure_carries_backend_detail() {
        let router = Router::new().route(
            "/api/process_pdf",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "parser exploded") }),
        );
        let backend = HttpRagBackend::new().with_base_url(spawn_backend(router).await);

        let err = backend.process_pdf("notes.pdf").await.unwrap_err();
        assert!(matches!(err, ReaderError::Processing(ref d) if d == "parser exploded"));
    }

    #[tokio::test]
    async fn chat_returns_answer() {
        let router = Router::new().route(
            "/api/chat_with_pdf",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["pdf_session_id"], "s");
                Json(json!({ "answer": "The thesis is X." }))
            }),
        );
        let backend = HttpRagBackend::new().with_base_url(spawn_backend(router).await);

        let answer = backend
            .chat("What is the thesis?", &SessionContext::new("s", "c"))
            .await
            .unwrap();
        assert_eq!(answer, "The thesis is X.");
    }

    #[tokio::test]
    async fn chat_error_status_uses_backend_message() {
        let router = Router::new().route(
            "/api/chat_with_pdf",
            post(|| async { (StatusCode::BAD_REQUEST, Json(json!({ "error": "unknown session" }))) }),
        );
        let backend = HttpRagBackend::new().with_base_url(spawn_backend(router).await);

        let err = backend.chat("q", &SessionContext::new("s", "c")).await.unwrap_err();
        assert_eq!(err.to_string(), "Error communicating with the AI: unknown session");
    }

    #[tokio::test]
    async fn chat_error_status_without_body_reports_status() {
        let router = Router::new().route(
            "/api/chat_with_pdf",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let backend = HttpRagBackend::new().with_base_url(spawn_backend(router).await);

        let err = backend.chat("q", &SessionContext::new("s", "c")).await.unwrap_err();
        assert!(matches!(err, ReaderError::Chat(ref d) if d == "HTTP error! status: 503"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_chat_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let backend = HttpRagBackend::new().with_base_url(format!("http://{addr}"));

        let err = backend.chat("q", &SessionContext::new("s", "c")).await.unwrap_err();
        assert!(matches!(err, ReaderError::Chat(_)));
    }
}
