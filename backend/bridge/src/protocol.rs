use serde::{Deserialize, Serialize};

/// Messages the page script sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BridgeMessage {
    OpenInReader {
        #[serde(rename = "pdfUrl")]
        pdf_url: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape() {
        let msg: BridgeMessage =
            serde_json::from_str(r#"{"action":"openInReader","pdfUrl":"https://x.org/a.pdf"}"#).unwrap();
        assert_eq!(
            msg,
            BridgeMessage::OpenInReader {
                pdf_url: "https://x.org/a.pdf".into()
            }
        );
        assert!(serde_json::from_str::<BridgeMessage>(r#"{"action":"close"}"#).is_err());
    }
}
