//! Reader event logger.
//!
//! Uploads, chat traffic, and render notices are emitted as structured
//! `tracing` events under the `reader_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReaderEvent {
    DocumentUploaded {
        filename: String,
        size_bytes: usize,
    },
    DocumentProcessed {
        filename: String,
        collection: String,
    },
    ChatQuery {
        message_id: u64,
        query: String,
    },
    ChatReply {
        message_id: u64,
        ok: bool,
        content: String,
    },
    RenderNotice {
        page: u32,
        detail: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: ReaderEvent,
}

impl EventLogEntry {
    /// Build an entry with every free-text field redacted.
    pub fn new(session_id: &str, mut event: ReaderEvent) -> Self {
        match &mut event {
            ReaderEvent::ChatQuery { query, .. } => *query = redact_sensitive_data(query),
            ReaderEvent::ChatReply { content, .. } => *content = redact_sensitive_data(content),
            ReaderEvent::RenderNotice { detail, .. } => *detail = redact_sensitive_data(detail),
            ReaderEvent::DocumentUploaded { .. } | ReaderEvent::DocumentProcessed { .. } => {}
        }
        Self {
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

pub struct EventLogger;

impl EventLogger {
    /// Log a reader event. `session_id` is the backend session, or `"-"` when none is active.
    pub fn log_event(session_id: &str, event: ReaderEvent) {
        let entry = EventLogEntry::new(session_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "reader_events", session = %entry.session_id, event = %json, "Reader event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_text_is_redacted_in_entries() {
        let entry = EventLogEntry::new(
            "s-1",
            ReaderEvent::ChatQuery {
                message_id: 4,
                query: "mail me at bob@example.com".into(),
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "chat_query");
        assert_eq!(json["event"]["query"], "mail me at [REDACTED_EMAIL]");
        assert_eq!(json["session_id"], "s-1");
    }
}
