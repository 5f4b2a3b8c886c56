use chrono::Utc;

use deepread_core::{ChatMessage, MessageId, MessageStatus, Role};

pub const WELCOME_MESSAGE: &str = "Hi there! I'm DeepRead, your AI study assistant. I'll help you understand the document you're reading. Ask me any questions about the content!";

/// Append-only list of chat messages.
///
/// The only mutation of an existing entry is settling a pending placeholder,
/// which never changes its position.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transcript opening with the assistant's greeting.
    pub fn with_welcome() -> Self {
        let mut transcript = Self::new();
        transcript.push_assistant(WELCOME_MESSAGE);
        transcript
    }

    fn push(&mut self, role: Role, status: MessageStatus, session_id: Option<String>) -> MessageId {
        self.next_id += 1;
        let id = MessageId(self.next_id);
        self.messages.push(ChatMessage {
            id,
            role,
            status,
            timestamp: Utc::now(),
            session_id,
        });
        id
    }

    pub fn push_user(&mut self, text: impl Into<String>, session_id: Option<String>) -> MessageId {
        self.push(Role::User, MessageStatus::Resolved(text.into()), session_id)
    }

    pub fn push_placeholder(&mut self, session_id: Option<String>) -> MessageId {
        self.push(Role::Assistant, MessageStatus::Pending, session_id)
    }

    /// Append an already-resolved assistant message.
    pub fn push_assistant(&mut self, text: impl Into<String>) -> MessageId {
        self.push(Role::Assistant, MessageStatus::Resolved(text.into()), None)
    }

    /// Replace a pending placeholder's status. Returns false if `id` is
    /// unknown or already settled, or if `status` is itself `Pending`.
    pub fn settle(&mut self, id: MessageId, status: MessageStatus) -> bool {
        if status.is_pending() {
            return false;
        }
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) if message.is_pending() => {
                message.status = status;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_pending()).count()
    }
}
