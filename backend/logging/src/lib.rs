//! Structured logging for DeepRead.
//!
//! Installs the global subscriber (console plus optional rolling JSON file)
//! and records reader events with sensitive text scrubbed.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, ReaderEvent};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
