//! Document loading: materialize the bytes, then parse page geometry with lopdf.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use lopdf::{Dictionary, Document, Object};
use reqwest::Client;
use tracing::{debug, warn};

use deepread_core::{DocumentSource, ReaderError, Result};

use crate::viewport::{PageSize, DEFAULT_PAGE_SIZE};

/// Parent links followed when looking for an inherited page attribute.
const MAX_INHERITANCE_DEPTH: usize = 32;

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// A parsed PDF: its raw bytes plus the size of every page.
#[derive(Debug)]
pub struct PdfDocument {
    id: u64,
    name: String,
    bytes: Bytes,
    pages: Vec<PageSize>,
}

impl PdfDocument {
    /// Parse a PDF held in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: Bytes) -> Result<Self> {
        let doc = Document::load_mem(&bytes)
            .map_err(|e| ReaderError::Load(format!("PDF parse error: {e}")))?;

        let page_ids = doc.get_pages();
        if page_ids.is_empty() {
            return Err(ReaderError::Load("document has no pages".to_string()));
        }
        let pages = page_ids
            .values()
            .map(|&page_id| {
                doc.get_object(page_id)
                    .and_then(Object::as_dict)
                    .ok()
                    .map(|dict| page_size(&doc, dict, page_id))
                    .unwrap_or(DEFAULT_PAGE_SIZE)
            })
            .collect();

        Ok(Self {
            id: NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            bytes,
            pages,
        })
    }

    /// Process-unique handle, distinct for every load.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Size of a 1-indexed page.
    pub fn page_size(&self, page: u32) -> Option<PageSize> {
        let index = usize::try_from(page).ok()?.checked_sub(1)?;
        self.pages.get(index).copied()
    }
}

/// Displayed size of a page: its MediaBox with the sides swapped when
/// `/Rotate` is a quarter turn.
fn page_size(doc: &Document, page: &Dictionary, page_id: lopdf::ObjectId) -> PageSize {
    let size = inherited(doc, page, b"MediaBox")
        .and_then(|obj| parse_rect(doc, obj))
        .unwrap_or_else(|| {
            warn!(?page_id, "MediaBox not found on page, falling back to US Letter");
            DEFAULT_PAGE_SIZE
        });
    match page_rotation(doc, page) {
        90 | 270 => PageSize {
            width: size.height,
            height: size.width,
        },
        _ => size,
    }
}

/// `/Rotate` normalized into `0..360`; 0 when absent or not a multiple of 90.
fn page_rotation(doc: &Document, page: &Dictionary) -> i64 {
    let degrees = inherited(doc, page, b"Rotate")
        .and_then(|obj| as_f64(doc, obj))
        .map(|r| (r as i64).rem_euclid(360))
        .unwrap_or(0);
    if degrees % 90 == 0 {
        degrees
    } else {
        0
    }
}

/// Look up a page attribute, walking `/Parent` for an inherited one.
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut dict = page;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(obj) = dict.get(key) {
            return Some(obj);
        }
        let parent_id = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        dict = doc.get_object(parent_id).and_then(Object::as_dict).ok()?;
    }
    None
}

fn parse_rect(doc: &Document, obj: &Object) -> Option<PageSize> {
    let arr = match obj {
        Object::Array(arr) => arr,
        Object::Reference(id) => doc.get_object(*id).and_then(Object::as_array).ok()?,
        _ => return None,
    };
    if arr.len() != 4 {
        return None;
    }
    let mut values = [0.0f64; 4];
    for (slot, obj) in values.iter_mut().zip(arr) {
        *slot = as_f64(doc, obj)?;
    }
    let width = (values[2] - values[0]).abs();
    let height = (values[3] - values[1]).abs();
    (width > 0.0 && height > 0.0).then_some(PageSize { width, height })
}

fn as_f64(doc: &Document, obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        Object::Reference(id) => doc.get_object(*id).ok().and_then(|o| as_f64(doc, o)),
        _ => None,
    }
}

/// Fetches document bytes from any [`DocumentSource`] and parses them.
#[derive(Clone, Default)]
pub struct DocumentLoader {
    client: Client,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Materialize the raw bytes behind a locator.
    pub async fn fetch(&self, source: &DocumentSource) -> Result<Bytes> {
        match source {
            DocumentSource::Memory { bytes, .. } => Ok(bytes.clone()),
            DocumentSource::Path(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| ReaderError::Load(format!("{}: {e}", path.display()))),
            DocumentSource::Url(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| ReaderError::Load(e.to_string()))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(ReaderError::Load(format!("{url} returned {status}")));
                }
                response
                    .bytes()
                    .await
                    .map_err(|e| ReaderError::Load(e.to_string()))
            }
        }
    }

    /// Fetch and parse. Parsing runs on the blocking pool.
    pub async fn load(&self, source: &DocumentSource) -> Result<PdfDocument> {
        let bytes = self.fetch(source).await?;
        let name = source.display_name();
        debug!(source = %source, size = bytes.len(), "Parsing document");
        tokio::task::spawn_blocking(move || PdfDocument::from_bytes(name, bytes))
            .await
            .map_err(|e| ReaderError::Load(format!("parser task failed: {e}")))?
    }
}
