pub mod document;
pub mod error;
pub mod message;
pub mod session;
pub mod traits;
pub mod wire;

pub use document::{
    clamp_scale, DocumentSession, DocumentSource, Rotation, DEFAULT_SCALE, MAX_SCALE, MIN_SCALE,
    ZOOM_STEP,
};
pub use error::{ReaderError, Result};
pub use message::{ChatMessage, MessageId, MessageStatus, Role};
pub use session::{ProcessedDocument, SessionContext};
pub use traits::RagBackend;
