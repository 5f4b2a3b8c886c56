use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use deepread_core::{
    ChatMessage, MessageId, MessageStatus, RagBackend, ReaderError, SessionContext,
};
use deepread_logging::{EventLogger, ReaderEvent};

use crate::transcript::Transcript;

/// Conversation about the currently loaded document.
///
/// Cheap to clone; clones share the transcript and the active session context.
/// Replies are awaited on the tokio runtime, so `send_message` must be called
/// from within one.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn RagBackend>,
    transcript: Mutex<Transcript>,
    context: RwLock<Option<SessionContext>>,
}

impl Inner {
    fn transcript(&self) -> MutexGuard<'_, Transcript> {
        self.transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn settle(&self, id: MessageId, status: MessageStatus) {
        let (ok, content) = match &status {
            MessageStatus::Resolved(text) => (true, text.clone()),
            MessageStatus::Failed(text) => (false, text.clone()),
            MessageStatus::Pending => return,
        };
        let session_id = {
            let mut transcript = self.transcript();
            if !transcript.settle(id, status) {
                warn!(message = %id, "Placeholder already settled");
                return;
            }
            transcript.get(id).and_then(|m| m.session_id.clone())
        };
        EventLogger::log_event(
            session_id.as_deref().unwrap_or("-"),
            ReaderEvent::ChatReply {
                message_id: id.0,
                ok,
                content,
            },
        );
    }
}

/// Handle to an assistant reply that may still be in flight.
pub struct PendingReply {
    pub user_id: MessageId,
    pub placeholder_id: MessageId,
    outcome: ReplyOutcome,
    session: ChatSession,
}

enum ReplyOutcome {
    Settled(MessageStatus),
    InFlight(JoinHandle<MessageStatus>),
}

impl PendingReply {
    /// Wait for the placeholder to settle and return its final status.
    pub async fn settled(self) -> MessageStatus {
        let task = match self.outcome {
            ReplyOutcome::Settled(status) => return status,
            ReplyOutcome::InFlight(task) => task,
        };
        match task.await {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, message = %self.placeholder_id, "Chat reply task failed");
                let status = MessageStatus::Failed(
                    ReaderError::Chat("reply task aborted".to_string()).to_string(),
                );
                self.session.inner.settle(self.placeholder_id, status.clone());
                status
            }
        }
    }
}

impl ChatSession {
    /// A new conversation opening with the assistant's welcome message.
    pub fn new(backend: Arc<dyn RagBackend>) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                transcript: Mutex::new(Transcript::with_welcome()),
                context: RwLock::new(None),
            }),
        }
    }

    pub fn with_context(self, context: SessionContext) -> Self {
        self.set_context(context);
        self
    }

    /// Point subsequent messages at a newly processed document.
    ///
    /// Replies already in flight still settle their own placeholders, which stay
    /// tagged with the session they were sent under.
    pub fn set_context(&self, context: SessionContext) {
        debug!(session = %context.pdf_session_id, "Chat context switched");
        *self
            .inner
            .context
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(context);
    }

    pub fn clear_context(&self) {
        *self
            .inner
            .context
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    pub fn context(&self) -> Option<SessionContext> {
        self.inner
            .context
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Send a user message.
    ///
    /// The user entry and a pending assistant placeholder are appended before
    /// this returns. The backend query runs in the background; its outcome,
    /// success or failure, replaces the placeholder in place. Without a session
    /// context the placeholder fails immediately and no request is made.
    pub fn send_message(&self, text: impl Into<String>) -> PendingReply {
        let text = text.into();
        let context = self.context().filter(SessionContext::is_complete);
        let session_id = context.as_ref().map(|c| c.pdf_session_id.clone());

        let (user_id, placeholder_id) = {
            let mut transcript = self.inner.transcript();
            let user_id = transcript.push_user(text.clone(), session_id.clone());
            let placeholder_id = transcript.push_placeholder(session_id.clone());
            (user_id, placeholder_id)
        };

        EventLogger::log_event(
            session_id.as_deref().unwrap_or("-"),
            ReaderEvent::ChatQuery {
                message_id: user_id.0,
                query: text.clone(),
            },
        );

        let Some(context) = context else {
            warn!(message = %placeholder_id, "Chat message sent without a processed document");
            let status = MessageStatus::Failed(ReaderError::MissingContext.to_string());
            self.inner.settle(placeholder_id, status.clone());
            return PendingReply {
                user_id,
                placeholder_id,
                outcome: ReplyOutcome::Settled(status),
                session: self.clone(),
            };
        };

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let status = match inner.backend.chat(&text, &context).await {
                Ok(answer) => MessageStatus::Resolved(answer),
                Err(e) => {
                    warn!(error = %e, backend = inner.backend.name(), "Chat request failed");
                    MessageStatus::Failed(failure_text(&e))
                }
            };
            inner.settle(placeholder_id, status.clone());
            status
        });

        PendingReply {
            user_id,
            placeholder_id,
            outcome: ReplyOutcome::InFlight(task),
            session: self.clone(),
        }
    }

    /// Ask the assistant to explain a passage selected in the viewer.
    pub fn explain_selection(&self, selection: &str) -> PendingReply {
        self.send_message(format!("Can you explain this: \"{}\"", selection.trim()))
    }

    /// Append an assistant message that needs no backend round trip.
    pub fn add_assistant_note(&self, text: impl Into<String>) -> MessageId {
        self.inner.transcript().push_assistant(text)
    }

    /// Snapshot of the transcript in display order.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.transcript().messages().to_vec()
    }

    pub fn message(&self, id: MessageId) -> Option<ChatMessage> {
        self.inner.transcript().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.transcript().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.transcript().is_empty()
    }
}

fn failure_text(err: &ReaderError) -> String {
    match err {
        ReaderError::Chat(_) | ReaderError::MissingContext => err.to_string(),
        other => ReaderError::Chat(other.to_string()).to_string(),
    }
}
