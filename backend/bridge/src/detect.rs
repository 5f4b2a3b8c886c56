use url::Url;

/// What the bridge knows about the page the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub url: String,
    pub content_type: Option<String>,
}

impl PageContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Heuristic check for a page showing a PDF: the document's content type, a
/// `.pdf` path, Google's document viewer, or a `/pdf` path segment.
pub fn is_pdf_context(page: &PageContext) -> bool {
    let declared = page.content_type.as_deref().is_some_and(|ct| {
        ct.split(';')
            .next()
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/pdf"))
    });
    if declared {
        return true;
    }

    let Ok(url) = Url::parse(page.url.trim()) else {
        return page.url.to_ascii_lowercase().ends_with(".pdf");
    };
    let path = url.path().to_ascii_lowercase();
    if path.ends_with(".pdf") {
        return true;
    }
    if url.host_str().is_some_and(|h| h.ends_with("google.com")) && path.starts_with("/viewer") {
        return true;
    }
    url.path_segments()
        .is_some_and(|mut segments| segments.any(|s| s.eq_ignore_ascii_case("pdf")))
}
