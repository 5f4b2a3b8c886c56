//! PDF render engine.
//!
//! Loads a document from a URL, a path, or in-memory bytes, tracks pagination,
//! zoom and rotation, and drives one render at a time through a
//! [`PageRenderer`]. A new render request cancels the one in flight.

pub mod cancel;
pub mod engine;
pub mod loader;
pub mod locator;
pub mod poppler;
pub mod renderer;
pub mod viewport;

#[cfg(test)]
pub(crate) mod test_support;

pub use cancel::RenderToken;
pub use engine::{Phase, RenderEngine, RenderStatus};
pub use loader::{DocumentLoader, PdfDocument};
pub use locator::{reader_url, ReaderLocation, ReaderQuery, StoredDocument};
pub use poppler::PopplerRenderer;
pub use renderer::{Frame, FrameSurface, PageRenderer, RenderRequest};
pub use viewport::{PageSize, Viewport};
