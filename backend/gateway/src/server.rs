//! Main HTTP gateway server and its routes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use deepread_chat::ChatSession;
use deepread_core::RagBackend;

use crate::store::PdfStore;
use crate::{chat_api, health_api, pdfs, session_api, upload};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// The document the reader should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentDocument {
    pub name: String,
    pub url: String,
}

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub store: PdfStore,
    pub backend: Arc<dyn RagBackend>,
    pub chat: ChatSession,
    pub started_at: Instant,
    current: Arc<RwLock<Option<CurrentDocument>>>,
    ingest: Arc<tokio::sync::Mutex<()>>,
}

impl GatewayState {
    pub fn new(pdf_dir: impl Into<PathBuf>, backend: Arc<dyn RagBackend>) -> Self {
        Self {
            store: PdfStore::new(pdf_dir),
            chat: ChatSession::new(Arc::clone(&backend)),
            backend,
            started_at: Instant::now(),
            current: Arc::new(RwLock::new(None)),
            ingest: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn current(&self) -> Option<CurrentDocument> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) fn set_current(&self, document: CurrentDocument) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(document);
    }

    /// Held for a whole upload so that replace, processing and publishing
    /// happen as one step.
    pub(crate) async fn lock_ingest(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.ingest.lock().await
    }
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/upload", post(upload::upload_pdf))
        .route("/api/chat", post(chat_api::post_chat))
        .route("/api/transcript", get(chat_api::get_transcript))
        .route("/api/session", get(session_api::get_session))
        .route("/api/health", get(health_api::get_health))
        .route("/pdfs/:file", get(pdfs::serve_pdf))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the gateway and serves until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Gateway HTTP server listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepread_rag::MockRagBackend;
    use reqwest::multipart::{Form, Part};
    use reqwest::StatusCode;
    use serde_json::Value;

    async fn spawn(backend: MockRagBackend) -> (String, Arc<MockRagBackend>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(backend);
        let state = GatewayState::new(dir.path().join("pdfs"), backend.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        (format!("http://{addr}"), backend, dir)
    }

    fn pdf_form(name: &str, bytes: &[u8]) -> Form {
        let part = Part::bytes(bytes.to_vec())
            .file_name(name.to_string())
            .mime_str("application/pdf")
            .unwrap();
        Form::new().part("file", part)
    }

    async fn upload(client: &reqwest::Client, base: &str, form: Form) -> (StatusCode, Value) {
        let res = client
            .post(format!("{base}/api/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        (res.status(), res.json().await.unwrap())
    }

    #[tokio::test]
    async fn upload_then_fetch() {
        let (base, backend, _dir) = spawn(MockRagBackend::new()).await;
        let client = reqwest::Client::new();

        let (status, body) = upload(&client, &base, pdf_form("notes.pdf", b"%PDF-1.4 notes")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "/pdfs/notes.pdf");
        assert_eq!(backend.processed(), vec!["notes.pdf".to_string()]);

        let res = client.get(format!("{base}/pdfs/notes.pdf")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "application/pdf");
        assert_eq!(
            res.headers()["content-disposition"],
            "inline; filename=\"notes.pdf\""
        );
        assert_eq!(res.bytes().await.unwrap().as_ref(), b"%PDF-1.4 notes");

        let session: Value = client
            .get(format!("{base}/api/session"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(session["document"]["url"], "/pdfs/notes.pdf");
        assert_eq!(session["context"]["pdf_session_id"], "session-notes");
    }

    #[tokio::test]
    async fn second_upload_replaces_the_first() {
        let (base, _backend, _dir) = spawn(MockRagBackend::new()).await;
        let client = reqwest::Client::new();

        upload(&client, &base, pdf_form("a.pdf", b"%PDF-a")).await;
        let (_, body) = upload(&client, &base, pdf_form("b.pdf", b"%PDF-b")).await;
        assert_eq!(body["url"], "/pdfs/b.pdf");

        let a = client.get(format!("{base}/pdfs/a.pdf")).send().await.unwrap();
        assert_eq!(a.status(), StatusCode::NOT_FOUND);
        let a: Value = a.json().await.unwrap();
        assert_eq!(a["error"], "Not found");

        let b = client.get(format!("{base}/pdfs/b.pdf")).send().await.unwrap();
        assert_eq!(b.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_bad_uploads() {
        let (base, backend, _dir) = spawn(MockRagBackend::new()).await;
        let client = reqwest::Client::new();

        let form = Form::new().text("note", "no file here");
        let (status, body) = upload(&client, &base, form).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file");

        let part = Part::bytes(b"plain text".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap();
        let (status, _) = upload(&client, &base, Form::new().part("file", part)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let two = pdf_form("a.pdf", b"%PDF-a").part(
            "file",
            Part::bytes(b"%PDF-b".to_vec()).file_name("b.pdf"),
        );
        let (status, _) = upload(&client, &base, two).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(backend.processed().is_empty());
    }

    #[tokio::test]
    async fn processing_failure_is_500_and_keeps_the_file() {
        let backend = MockRagBackend::new().with_processing_error("index unavailable");
        let (base, _backend, _dir) = spawn(backend).await;
        let client = reqwest::Client::new();

        let (status, body) = upload(&client, &base, pdf_form("notes.pdf", b"%PDF-1.4")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = body["error"].as_str().unwrap();
        assert!(error.starts_with("PDF processing failed: "));
        assert!(error.contains("index unavailable"));

        let res = client.get(format!("{base}/pdfs/notes.pdf")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn uppercase_extension_is_stored_and_served() {
        let (base, backend, _dir) = spawn(MockRagBackend::new()).await;
        let client = reqwest::Client::new();

        let (status, body) = upload(&client, &base, pdf_form("Scan.PDF", b"%PDF-1.4 scan")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "/pdfs/Scan.pdf");
        assert_eq!(backend.processed(), vec!["Scan.pdf".to_string()]);

        let res = client.get(format!("{base}/pdfs/Scan.pdf")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.bytes().await.unwrap().as_ref(), b"%PDF-1.4 scan");
    }

    #[tokio::test]
    async fn failed_reupload_drops_the_old_context() {
        let (base, backend, _dir) = spawn(MockRagBackend::new()).await;
        let client = reqwest::Client::new();

        let (status, _) = upload(&client, &base, pdf_form("a.pdf", b"%PDF-a")).await;
        assert_eq!(status, StatusCode::OK);

        backend.set_processing_error("index unavailable");
        let (status, _) = upload(&client, &base, pdf_form("b.pdf", b"%PDF-b")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let session: Value = client
            .get(format!("{base}/api/session"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(session["document"]["url"], "/pdfs/b.pdf");
        assert_eq!(session["document"]["name"], "b.pdf");
        assert!(session["context"].is_null());

        let res = client.get(format!("{base}/pdfs/b.pdf")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = client
            .post(format!("{base}/api/chat"))
            .json(&serde_json::json!({ "query": "What is in a.pdf?" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let body: Value = res.json().await.unwrap();
        assert_eq!(
            body["error"],
            "Error: PDF not processed yet. Please select or upload a PDF."
        );
        assert!(backend.queries().is_empty());
    }

    #[tokio::test]
    async fn rejects_traversal_and_non_pdf_names() {
        let (base, _backend, _dir) = spawn(MockRagBackend::new()).await;
        let client = reqwest::Client::new();

        for path in ["/pdfs/notes.txt", "/pdfs/..%2F..%2Fetc%2Fpasswd.pdf", "/pdfs/..passwd.pdf"] {
            let res = client.get(format!("{base}{path}")).send().await.unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
            let body: Value = res.json().await.unwrap();
            assert_eq!(body["error"], "Invalid filename");
        }
    }

    #[tokio::test]
    async fn chat_round_trip() {
        let backend = MockRagBackend::new().with_answer("The thesis is X.");
        let (base, _backend, _dir) = spawn(backend).await;
        let client = reqwest::Client::new();

        let res = client
            .post(format!("{base}/api/chat"))
            .json(&serde_json::json!({ "query": "What is the thesis?" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let body: Value = res.json().await.unwrap();
        assert_eq!(
            body["error"],
            "Error: PDF not processed yet. Please select or upload a PDF."
        );

        upload(&client, &base, pdf_form("paper.pdf", b"%PDF-1.4")).await;
        let body: Value = client
            .post(format!("{base}/api/chat"))
            .json(&serde_json::json!({ "query": "What is the thesis?" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["answer"], "The thesis is X.");

        let transcript: Vec<Value> = client
            .get(format!("{base}/api/transcript"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        // welcome + two exchanges
        assert_eq!(transcript.len(), 5);
        assert_eq!(transcript[4]["text"], "The thesis is X.");
        assert_eq!(transcript[4]["role"], "assistant");
    }

    #[tokio::test]
    async fn health_reports_backend() {
        let (base, _backend, _dir) = spawn(MockRagBackend::new()).await;
        let client = reqwest::Client::new();
        let health = |client: reqwest::Client, url: String| async move {
            client
                .get(url)
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()
        };
        let url = format!("{base}/api/health");

        let body = health(client.clone(), url.clone()).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "mock");
        assert!(body["stored_file"].is_null());

        upload(&client, &base, pdf_form("notes.pdf", b"%PDF-1.4")).await;
        assert_eq!(health(client, url).await["stored_file"], "notes.pdf");
    }
}
