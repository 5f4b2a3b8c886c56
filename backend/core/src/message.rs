use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monotonic message identifier, unique within one transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle of a message's content.
///
/// User messages and notes are created `Resolved`. Assistant placeholders start
/// `Pending` and settle exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Resolved(String),
    Failed(String),
}

impl MessageStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, MessageStatus::Pending)
    }
}

/// One entry in a chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    #[serde(flatten)]
    pub status: MessageStatus,
    pub timestamp: DateTime<Utc>,
    /// `pdf_session_id` of the document this message was sent about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatMessage {
    /// Text shown for this message, whatever its status.
    pub fn content(&self) -> &str {
        match &self.status {
            MessageStatus::Pending => "…",
            MessageStatus::Resolved(text) | MessageStatus::Failed(text) => text,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_tagged_union() {
        let msg = ChatMessage {
            id: MessageId(3),
            role: Role::Assistant,
            status: MessageStatus::Failed("offline".into()),
            timestamp: Utc::now(),
            session_id: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["text"], "offline");
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["id"], 3);
        assert!(json.get("session_id").is_none());
    }

    #[test]
    fn pending_content_is_a_placeholder() {
        let msg = ChatMessage {
            id: MessageId(1),
            role: Role::Assistant,
            status: MessageStatus::Pending,
            timestamp: Utc::now(),
            session_id: Some("abc".into()),
        };
        assert!(msg.is_pending());
        assert_eq!(msg.content(), "…");
    }
}
