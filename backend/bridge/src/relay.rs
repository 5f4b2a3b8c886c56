//! The open-in-reader relay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{info, instrument, warn};

use deepread_core::wire::{ErrorBody, UploadResponse};
use deepread_core::{DocumentSource, ReaderError, Result};
use deepread_viewer::{reader_url, DocumentLoader, ReaderLocation};

use crate::opener::ReaderOpener;
use crate::protocol::BridgeMessage;

/// Clears the in-flight flag when an activation ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Relays a PDF page to the gateway and opens the reader on the result.
///
/// Only one activation runs at a time; there are no retries.
pub struct ExtensionBridge {
    client: Client,
    loader: DocumentLoader,
    gateway_url: String,
    reader_url: String,
    opener: Arc<dyn ReaderOpener>,
    in_flight: AtomicBool,
}

impl ExtensionBridge {
    pub fn new(
        gateway_url: impl Into<String>,
        reader_url: impl Into<String>,
        opener: Arc<dyn ReaderOpener>,
    ) -> Self {
        let client = Client::new();
        Self {
            loader: DocumentLoader::with_client(client.clone()),
            client,
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            reader_url: reader_url.into().trim_end_matches('/').to_string(),
            opener,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether an activation is currently running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Reader URL for a location: `<reader>/reader?pdfUrl=..&pdfName=..`.
    pub fn reader_link(&self, location: &ReaderLocation) -> String {
        reader_url(&self.reader_url, &location.url, &location.name)
    }

    pub async fn handle(&self, message: BridgeMessage) -> Result<ReaderLocation> {
        match message {
            BridgeMessage::OpenInReader { pdf_url } => self.activate(&pdf_url).await,
        }
    }

    /// Fetch the document at `page_url`, upload it, and open the reader.
    /// Returns where the reader was pointed.
    #[instrument(skip(self))]
    pub async fn activate(&self, page_url: &str) -> Result<ReaderLocation> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Activation ignored, another one is running");
            return Err(ReaderError::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let source = DocumentSource::parse(page_url);
        let mut name = urlencoding::decode(&source.display_name())
            .map(|n| n.into_owned())
            .unwrap_or_else(|_| source.display_name());
        if !name.to_ascii_lowercase().ends_with(".pdf") {
            name.push_str(".pdf");
        }
        let bytes = self.loader.fetch(&source).await?;
        info!(name = %name, size = bytes.len(), "Fetched document");

        let uploaded = self.upload(&name, bytes.to_vec()).await?;
        let stored_name = uploaded
            .url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&name)
            .to_string();

        let location = ReaderLocation {
            url: uploaded.url,
            name: stored_name,
        };
        self.opener.open(&self.reader_link(&location)).await?;
        Ok(location)
    }

    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<UploadResponse> {
        let part = Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ReaderError::Other(e.into()))?;
        let response = self
            .client
            .post(format!("{}/api/upload", self.gateway_url))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(|e| ReaderError::Other(anyhow::anyhow!("upload failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ReaderError::Other(e.into()))?;
        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(ReaderError::Other(anyhow::anyhow!(
                "upload rejected ({status}): {detail}"
            )));
        }
        serde_json::from_str(&body).map_err(|e| ReaderError::Other(e.into()))
    }
}
