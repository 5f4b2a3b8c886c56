//! Clients for the external retrieval-augmented backend.
//!
//! `HttpRagBackend` talks to the real service; `MockRagBackend` is a scripted
//! stand-in used by tests throughout the workspace.

pub mod providers;

pub use providers::http::HttpRagBackend;
pub use providers::mock::MockRagBackend;
