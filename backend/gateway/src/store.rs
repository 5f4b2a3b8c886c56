//! Single-slot PDF storage.
//!
//! The gateway keeps at most one uploaded document on disk. Writing a new one
//! first deletes everything in the directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use deepread_core::{ReaderError, Result};

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`, collapse `..`,
/// and make sure the name ends in a lowercase `.pdf`.
pub fn sanitize_filename(name: &str) -> String {
    let mut clean: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    while clean.contains("..") {
        clean = clean.replace("..", "_");
    }
    if clean.is_empty() {
        clean.push_str("document");
    }
    if clean.to_ascii_lowercase().ends_with(".pdf") {
        clean.truncate(clean.len() - ".pdf".len());
    }
    clean.push_str(".pdf");
    clean
}

/// Whether `name` may be served from the store: a `.pdf` name with no path
/// separators or parent references.
pub fn is_servable_name(name: &str) -> bool {
    name.ends_with(".pdf") && !name.contains("..") && !name.contains('/') && !name.contains('\\')
}

#[derive(Clone)]
pub struct PdfStore {
    dir: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

impl PdfStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Arc::new(dir.into()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete whatever is stored and write `bytes` under the sanitized form of
    /// `original_name`. Returns the stored filename.
    pub async fn replace(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        let filename = sanitize_filename(original_name);
        let _guard = self.write_lock.lock().await;

        fs::create_dir_all(self.dir.as_path()).await?;
        let mut entries = fs::read_dir(self.dir.as_path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                continue;
            }
            debug!(path = %path.display(), "Removing previous upload");
            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove previous upload");
                return Err(e.into());
            }
        }

        let dest = self.dir.join(&filename);
        fs::write(&dest, bytes).await?;
        info!(path = %dest.display(), size = bytes.len(), "Stored upload");
        Ok(filename)
    }

    pub async fn read(&self, filename: &str) -> Result<Bytes> {
        if !is_servable_name(filename) {
            return Err(ReaderError::InvalidFilename);
        }
        match fs::read(self.dir.join(filename)).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ReaderError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Name of the stored document, if any.
    pub async fn current(&self) -> Result<Option<String>> {
        let mut entries = match fs::read_dir(self.dir.as_path()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                return Ok(Some(entry.file_name().to_string_lossy().into_owned()));
            }
        }
        Ok(None)
    }
}
