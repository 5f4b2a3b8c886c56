//! Document session state: pagination, zoom, and rotation.
//!
//! The state here is pure; the render engine drives it and decides when a
//! change warrants a new render cycle.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 3.0;
pub const DEFAULT_SCALE: f32 = 1.2;
/// Increment used by the stepwise zoom controls.
pub const ZOOM_STEP: f32 = 0.2;

/// Where the bytes of a PDF come from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Remote locator, fetched over HTTP.
    Url(String),
    /// File on the local filesystem.
    Path(PathBuf),
    /// Transient in-memory data (the equivalent of a browser `blob:` reference).
    Memory { name: String, bytes: Bytes },
}

impl DocumentSource {
    /// Interpret a user-supplied locator string.
    ///
    /// `http(s)://` locators are remote, `file://` and everything else is a path.
    pub fn parse(locator: &str) -> Self {
        let trimmed = locator.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            DocumentSource::Url(trimmed.to_string())
        } else if let Some(path) = trimmed.strip_prefix("file://") {
            DocumentSource::Path(PathBuf::from(path))
        } else {
            DocumentSource::Path(PathBuf::from(trimmed))
        }
    }

    /// Best-effort human-readable name: the last path segment, or "Document".
    pub fn display_name(&self) -> String {
        let candidate = match self {
            DocumentSource::Url(url) => {
                let path = match url.split_once("://") {
                    Some((_, rest)) => rest.split_once('/').map(|(_, path)| path).unwrap_or(""),
                    None => url.as_str(),
                };
                let path = path.split(['?', '#']).next().unwrap_or(path);
                path.rsplit('/').next().map(str::to_string)
            }
            DocumentSource::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            DocumentSource::Memory { name, .. } => Some(name.clone()),
        };
        candidate
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Document".to_string())
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Url(url) => write!(f, "{url}"),
            DocumentSource::Path(path) => write!(f, "{}", path.display()),
            DocumentSource::Memory { name, bytes } => {
                write!(f, "memory:{name} ({} bytes)", bytes.len())
            }
        }
    }
}

/// Page rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Next rotation clockwise.
    pub fn clockwise(self) -> Self {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    /// Parse a degree value; only multiples of 90 are accepted.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Whether the page's width and height trade places.
    pub fn is_sideways(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Clamp a requested scale into the supported zoom range.
pub fn clamp_scale(scale: f32) -> f32 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// Navigation state of one loaded document.
#[derive(Debug, Clone)]
pub struct DocumentSession {
    pub source: DocumentSource,
    pub display_name: String,
    page_count: u32,
    current_page: u32,
    scale: f32,
    rotation: Rotation,
}

impl DocumentSession {
    /// A session for a freshly loaded document, positioned on the first page.
    pub fn new(source: DocumentSource, display_name: impl Into<String>, page_count: u32) -> Self {
        Self {
            source,
            display_name: display_name.into(),
            page_count,
            current_page: 1,
            scale: DEFAULT_SCALE,
            rotation: Rotation::default(),
        }
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Jump to page `n`, clamped to `[1, page_count]`. Returns whether the page changed.
    pub fn set_page(&mut self, n: u32) -> bool {
        if self.page_count == 0 {
            return false;
        }
        let target = n.clamp(1, self.page_count);
        let changed = target != self.current_page;
        self.current_page = target;
        changed
    }

    pub fn next_page(&mut self) -> bool {
        if self.current_page >= self.page_count {
            return false;
        }
        self.set_page(self.current_page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        if self.current_page <= 1 {
            return false;
        }
        self.set_page(self.current_page - 1)
    }

    /// Set the zoom, clamped to `[MIN_SCALE, MAX_SCALE]`. Non-finite requests are ignored.
    pub fn set_zoom(&mut self, scale: f32) -> bool {
        if scale.is_nan() {
            return false;
        }
        let clamped = clamp_scale(scale);
        let changed = clamped != self.scale;
        self.scale = clamped;
        changed
    }

    pub fn zoom_in(&mut self) -> bool {
        self.set_zoom(round_step(self.scale + ZOOM_STEP))
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set_zoom(round_step(self.scale - ZOOM_STEP))
    }

    /// Rotate a quarter turn clockwise. Always a change.
    pub fn rotate(&mut self) -> bool {
        self.rotation = self.rotation.clockwise();
        true
    }

    pub fn set_rotation(&mut self, rotation: Rotation) -> bool {
        let changed = rotation != self.rotation;
        self.rotation = rotation;
        changed
    }

    /// Reading progress as a percentage; 0 when the document has no pages.
    pub fn progress_percent(&self) -> f32 {
        if self.page_count == 0 {
            return 0.0;
        }
        self.current_page as f32 / self.page_count as f32 * 100.0
    }

    /// `"Page 3 of 10"`.
    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.current_page, self.page_count)
    }

    /// `"120%"`.
    pub fn zoom_label(&self) -> String {
        format!("{}%", (self.scale * 100.0).round() as u32)
    }
}

fn round_step(scale: f32) -> f32 {
    (scale * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(pages: u32) -> DocumentSession {
        DocumentSession::new(DocumentSource::parse("/pdfs/notes.pdf"), "notes.pdf", pages)
    }

    #[test]
    fn zoom_is_clamped_to_range() {
        let mut s = session(3);
        for z in [-4.0, 0.0, 0.49, 0.5, 1.0, 2.99, 3.0, 3.01, 100.0, f32::INFINITY] {
            s.set_zoom(z);
            assert_eq!(s.scale(), z.clamp(MIN_SCALE, MAX_SCALE), "zoom {z}");
        }
    }

    #[test]
    fn nan_zoom_is_ignored() {
        let mut s = session(3);
        assert!(!s.set_zoom(f32::NAN));
        assert_eq!(s.scale(), DEFAULT_SCALE);
    }

    #[test]
    fn zoom_steps_stop_at_bounds() {
        let mut s = session(1);
        assert!(s.zoom_in());
        assert_eq!(s.scale(), 1.4);
        for _ in 0..20 {
            s.zoom_in();
        }
        assert_eq!(s.scale(), MAX_SCALE);
        assert!(!s.zoom_in());
        for _ in 0..20 {
            s.zoom_out();
        }
        assert_eq!(s.scale(), MIN_SCALE);
        assert!(!s.zoom_out());
    }

    #[test]
    fn rotation_wraps_every_four_turns() {
        let mut s = session(1);
        for n in 1..=9u32 {
            s.rotate();
            assert_eq!(u32::from(s.rotation().degrees()), (90 * n) % 360);
        }
    }

    #[test]
    fn navigation_stays_within_pages() {
        let mut s = session(3);
        assert!(!s.previous_page());
        assert_eq!(s.current_page(), 1);
        assert!(s.next_page());
        assert!(s.next_page());
        assert!(!s.next_page());
        assert_eq!(s.current_page(), 3);
        assert!(s.set_page(0));
        assert_eq!(s.current_page(), 1);
        s.set_page(99);
        assert_eq!(s.current_page(), 3);
    }

    #[test]
    fn labels_and_progress() {
        let mut s = session(4);
        s.next_page();
        assert_eq!(s.page_label(), "Page 2 of 4");
        assert_eq!(s.progress_percent(), 50.0);
        assert_eq!(s.zoom_label(), "120%");
        assert_eq!(session(0).progress_percent(), 0.0);
    }

    #[test]
    fn display_name_uses_last_segment() {
        assert_eq!(
            DocumentSource::parse("https://example.com/papers/thesis.pdf?dl=1").display_name(),
            "thesis.pdf"
        );
        assert_eq!(DocumentSource::parse("https://example.com/").display_name(), "Document");
        assert_eq!(DocumentSource::parse("file:///tmp/a.pdf").display_name(), "a.pdf");
    }

    #[test]
    fn rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(45), None);
    }
}
