//! Extension bridge.
//!
//! Recognizes pages that show a PDF and relays a one-click "open in reader"
//! action: fetch the document, upload it to the gateway, open the reader.

pub mod detect;
pub mod opener;
pub mod protocol;
pub mod relay;

pub use detect::{is_pdf_context, PageContext};
pub use opener::{ReaderOpener, SystemOpener};
pub use protocol::BridgeMessage;
pub use relay::ExtensionBridge;
