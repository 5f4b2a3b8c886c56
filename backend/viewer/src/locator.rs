//! Resolving which document the reader page should open.

use serde::{Deserialize, Serialize};
use url::Url;

use deepread_core::{DocumentSource, ReaderError, Result};

const FALLBACK_NAME: &str = "Document";

/// Last document the reader opened, kept as a fallback for bare `/reader`
/// visits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub current_pdf_url: Option<String>,
    pub current_pdf_name: Option<String>,
}

/// Query parameters accepted by the reader page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderQuery {
    pub pdf_url: Option<String>,
    pub pdf_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReaderLocation {
    pub url: String,
    pub name: String,
}

impl ReaderLocation {
    /// Query parameters win over the stored fallback. Returns `None` when
    /// neither names a document.
    pub fn resolve(query: &ReaderQuery, stored: &StoredDocument) -> Option<Self> {
        let url = non_empty(query.pdf_url.as_deref())
            .or_else(|| non_empty(stored.current_pdf_url.as_deref()))?
            .to_string();
        let name = non_empty(query.pdf_name.as_deref())
            .or_else(|| non_empty(stored.current_pdf_name.as_deref()))
            .map(str::to_string)
            .unwrap_or_else(|| name_from_url(&url));
        Some(Self { url, name })
    }

    /// Turn the location into a loadable source. Relative URLs such as
    /// `/pdfs/notes.pdf` are resolved against `base`.
    pub fn source(&self, base: &str) -> Result<DocumentSource> {
        if Url::parse(&self.url).is_ok() {
            return Ok(DocumentSource::parse(&self.url));
        }
        let base = Url::parse(base).map_err(|e| ReaderError::Load(format!("{base}: {e}")))?;
        let joined = base
            .join(&self.url)
            .map_err(|e| ReaderError::Load(format!("{}: {e}", self.url)))?;
        Ok(DocumentSource::Url(joined.to_string()))
    }

    /// Persist this location as the fallback for the next bare visit.
    pub fn remember(&self) -> StoredDocument {
        StoredDocument {
            current_pdf_url: Some(self.url.clone()),
            current_pdf_name: Some(self.name.clone()),
        }
    }
}

/// `<base>/reader?pdfUrl=<enc>&pdfName=<enc>`
pub fn reader_url(base: &str, pdf_url: &str, pdf_name: &str) -> String {
    format!(
        "{}/reader?pdfUrl={}&pdfName={}",
        base.trim_end_matches('/'),
        urlencoding::encode(pdf_url),
        urlencoding::encode(pdf_name)
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = match path.find("://") {
        Some(i) => path[i + 3..].split_once('/').map(|(_, p)| p).unwrap_or(""),
        None => path,
    };
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(url: Option<&str>, name: Option<&str>) -> ReaderQuery {
        ReaderQuery {
            pdf_url: url.map(String::from),
            pdf_name: name.map(String::from),
        }
    }

    #[test]
    fn query_wins_over_stored() {
        let stored = StoredDocument {
            current_pdf_url: Some("/pdfs/old.pdf".into()),
            current_pdf_name: Some("old.pdf".into()),
        };
        let loc = ReaderLocation::resolve(&query(Some("/pdfs/new.pdf"), Some("New")), &stored).unwrap();
        assert_eq!(loc.url, "/pdfs/new.pdf");
        assert_eq!(loc.name, "New");

        let loc = ReaderLocation::resolve(&query(None, None), &stored).unwrap();
        assert_eq!(loc, ReaderLocation { url: "/pdfs/old.pdf".into(), name: "old.pdf".into() });
    }

    #[test]
    fn name_defaults_to_last_segment_then_document() {
        let stored = StoredDocument::default();
        let loc = ReaderLocation::resolve(
            &query(Some("https://example.com/papers/My%20Paper.pdf?dl=1"), None),
            &stored,
        )
        .unwrap();
        assert_eq!(loc.name, "My Paper.pdf");

        let loc = ReaderLocation::resolve(&query(Some("https://example.com/"), None), &stored).unwrap();
        assert_eq!(loc.name, "Document");
    }

    #[test]
    fn nothing_to_open() {
        assert!(ReaderLocation::resolve(&query(Some("  "), None), &StoredDocument::default()).is_none());
    }

    #[test]
    fn relative_urls_join_the_base() {
        let loc = ReaderLocation { url: "/pdfs/notes.pdf".into(), name: "notes.pdf".into() };
        let source = loc.source("http://localhost:3000/reader").unwrap();
        assert!(matches!(
            source,
            DocumentSource::Url(ref url) if url == "http://localhost:3000/pdfs/notes.pdf"
        ));

        let stored = loc.remember();
        assert_eq!(stored.current_pdf_name.as_deref(), Some("notes.pdf"));
    }

    #[test]
    fn builds_encoded_reader_url() {
        let url = reader_url("http://localhost:3000/", "/pdfs/a b.pdf", "a b.pdf");
        assert_eq!(
            url,
            "http://localhost:3000/reader?pdfUrl=%2Fpdfs%2Fa%20b.pdf&pdfName=a%20b.pdf"
        );
    }
}
