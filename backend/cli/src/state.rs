//! The last document handed to the reader, kept between invocations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use deepread_viewer::StoredDocument;

const STATE_FILE_NAME: &str = "current.json";

pub fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("deepread"))
        .unwrap_or_else(|| PathBuf::from(".deepread"))
        .join(STATE_FILE_NAME)
}

/// Read the stored document; an absent or unreadable file yields the empty
/// fallback.
pub fn load(path: &Path) -> StoredDocument {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

pub fn save(path: &Path, stored: &StoredDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create state directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(stored)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/current.json");
        assert_eq!(load(&path), StoredDocument::default());

        let stored = StoredDocument {
            current_pdf_url: Some("/pdfs/notes.pdf".into()),
            current_pdf_name: Some("notes.pdf".into()),
        };
        save(&path, &stored).unwrap();
        assert_eq!(load(&path), stored);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("currentPdfUrl"));
    }
}
