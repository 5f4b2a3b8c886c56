//! JSON bodies exchanged with the backend and the gateway's clients.

use serde::{Deserialize, Serialize};

use crate::session::SessionContext;

/// `POST /api/process_pdf` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPdfRequest {
    pub filename: String,
}

/// `POST /api/chat_with_pdf` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatWithPdfRequest {
    pub query: String,
    pub pdf_session_id: String,
    pub collection_name_for_rag: String,
}

impl ChatWithPdfRequest {
    pub fn new(query: impl Into<String>, context: &SessionContext) -> Self {
        Self {
            query: query.into(),
            pdf_session_id: context.pdf_session_id.clone(),
            collection_name_for_rag: context.collection_name_for_rag.clone(),
        }
    }
}

/// `POST /api/chat_with_pdf` response body: either an answer or an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatWithPdfResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `POST /api/upload` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Error body shared by every gateway endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// `POST /api/chat` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatQuery {
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_response_accepts_either_shape() {
        let ok: ChatWithPdfResponse = serde_json::from_str(r#"{"answer":"42"}"#).unwrap();
        assert_eq!(ok.answer.as_deref(), Some("42"));
        assert!(ok.error.is_none());

        let err: ChatWithPdfResponse = serde_json::from_str(r#"{"error":"no index"}"#).unwrap();
        assert_eq!(err.error.as_deref(), Some("no index"));
    }

    #[test]
    fn chat_request_carries_context() {
        let ctx = SessionContext::new("s-1", "col");
        let body = serde_json::to_value(ChatWithPdfRequest::new("why?", &ctx)).unwrap();
        assert_eq!(body["pdf_session_id"], "s-1");
        assert_eq!(body["collection_name_for_rag"], "col");
        assert_eq!(body["query"], "why?");
    }
}
