use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use deepread_core::{ProcessedDocument, RagBackend, ReaderError, Result, SessionContext};

/// A scripted backend that returns canned responses and records every call.
///
/// Chat replies are served from a queue first, then from the fixed answer.
pub struct MockRagBackend {
    name: String,
    fixed_answer: Option<String>,
    scripted: Mutex<VecDeque<Result<String, String>>>,
    processing_error: Mutex<Option<String>>,
    delay: Option<Duration>,
    processed: Mutex<Vec<String>>,
    queries: Mutex<Vec<(String, SessionContext)>>,
}

impl MockRagBackend {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            fixed_answer: None,
            scripted: Mutex::new(VecDeque::new()),
            processing_error: Mutex::new(None),
            delay: None,
            processed: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.fixed_answer = Some(answer.into());
        self
    }

    /// Queue a chat reply; `Err` becomes a `ReaderError::Chat`.
    pub fn push_reply(&self, reply: Result<String, String>) {
        lock(&self.scripted).push_back(reply);
    }

    pub fn with_processing_error(self, detail: impl Into<String>) -> Self {
        self.set_processing_error(detail);
        self
    }

    /// Make every later `process_pdf` call fail with `detail`.
    pub fn set_processing_error(&self, detail: impl Into<String>) {
        *lock(&self.processing_error) = Some(detail.into());
    }

    /// Delay every chat reply, to keep requests in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Filenames passed to `process_pdf`, in call order.
    pub fn processed(&self) -> Vec<String> {
        lock(&self.processed).clone()
    }

    /// Queries passed to `chat`, in call order.
    pub fn queries(&self) -> Vec<(String, SessionContext)> {
        lock(&self.queries).clone()
    }

    /// Session context handed out for a processed filename.
    pub fn context_for(filename: &str) -> SessionContext {
        let stem = filename.trim_end_matches(".pdf");
        SessionContext::new(format!("session-{stem}"), format!("collection_{stem}"))
    }
}

impl Default for MockRagBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RagBackend for MockRagBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process_pdf(&self, filename: &str) -> Result<ProcessedDocument> {
        lock(&self.processed).push(filename.to_string());
        if let Some(detail) = lock(&self.processing_error).clone() {
            return Err(ReaderError::Processing(detail));
        }
        let context = Self::context_for(filename);
        Ok(ProcessedDocument {
            message: "processed".to_string(),
            pdf_internal_id: Some(format!("{}", lock(&self.processed).len())),
            original_filename: Some(filename.to_string()),
            collection_name_for_rag: context.collection_name_for_rag,
            pdf_session_id: context.pdf_session_id,
        })
    }

    async fn chat(&self, query: &str, context: &SessionContext) -> Result<String> {
        lock(&self.queries).push((query.to_string(), context.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = lock(&self.scripted).pop_front();
        match scripted {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(detail)) => Err(ReaderError::Chat(detail)),
            None => Ok(self
                .fixed_answer
                .clone()
                .unwrap_or_else(|| format!("Mock answer to: {query}"))),
        }
    }
}
