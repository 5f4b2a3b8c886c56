//! DeepRead gateway HTTP server.
//!
//! Accepts PDF uploads, serves the stored file back to the reader, and fronts
//! the chat session for clients that talk to it over HTTP.

pub mod chat_api;
pub mod error;
pub mod health_api;
pub mod pdfs;
pub mod server;
pub mod session_api;
pub mod store;
pub mod upload;

pub use error::ApiError;
pub use server::{build_router, start_server, GatewayState};
pub use store::{sanitize_filename, PdfStore};
