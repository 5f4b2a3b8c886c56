use serde::{Deserialize, Serialize};

/// Backend identifiers correlating chat queries with a processed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub pdf_session_id: String,
    pub collection_name_for_rag: String,
}

impl SessionContext {
    pub fn new(pdf_session_id: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            pdf_session_id: pdf_session_id.into(),
            collection_name_for_rag: collection.into(),
        }
    }

    /// Both identifiers must be non-empty for the backend to resolve the document.
    pub fn is_complete(&self) -> bool {
        !self.pdf_session_id.trim().is_empty() && !self.collection_name_for_rag.trim().is_empty()
    }
}

/// Result of asking the backend to process an uploaded PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedDocument {
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "id_as_string")]
    pub pdf_internal_id: Option<String>,
    #[serde(default)]
    pub original_filename: Option<String>,
    pub collection_name_for_rag: String,
    pub pdf_session_id: String,
}

/// Backends report the internal id as either a string or an integer.
fn id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }
    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(text) => text,
        RawId::Number(n) => n.to_string(),
    }))
}

impl ProcessedDocument {
    pub fn context(&self) -> SessionContext {
        SessionContext::new(&self.pdf_session_id, &self.collection_name_for_rag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_id_accepts_numbers_and_strings() {
        let numeric: ProcessedDocument = serde_json::from_str(
            r#"{"message":"ok","pdf_internal_id":7,"collection_name_for_rag":"c","pdf_session_id":"s"}"#,
        )
        .unwrap();
        assert_eq!(numeric.pdf_internal_id.as_deref(), Some("7"));
        assert_eq!(numeric.context(), SessionContext::new("s", "c"));

        let bare: ProcessedDocument =
            serde_json::from_str(r#"{"collection_name_for_rag":"c","pdf_session_id":"s"}"#).unwrap();
        assert_eq!(bare.pdf_internal_id, None);
        assert!(bare.context().is_complete());
        assert!(!SessionContext::new("s", " ").is_complete());
    }
}
