//! Chat session manager.
//!
//! Keeps an ordered transcript of user and assistant messages. Sending a
//! message appends the user entry and a pending assistant placeholder at once;
//! the placeholder is later replaced in place by the backend's answer or by an
//! inline error description.

pub mod session;
pub mod transcript;

pub use session::{ChatSession, PendingReply};
pub use transcript::{Transcript, WELCOME_MESSAGE};
