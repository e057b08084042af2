//! Documents and their redaction status.

use serde::{Deserialize, Serialize};

use crate::errors::{DocshieldError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Pending,
    Processing,
    Redacted,
    Failed,
}

/// A user-owned uploaded document.
///
/// `status`, `redacted_location` and `error` are written only by the redaction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub status: DocumentStatus,
    pub source_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redacted_location: Option<String>,
    /// Message of the failure that moved the document to `failed`, kept for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Document {
    pub fn new(id: &str, user_id: &str, source_location: &str) -> Self {
        Document {
            id: id.to_string(),
            user_id: user_id.to_string(),
            source_location: source_location.to_string(),
            ..Default::default()
        }
    }
}

/// A status transition written by the redaction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: DocumentStatus,
    pub redacted_location: Option<String>,
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn processing() -> Self {
        StatusUpdate { status: DocumentStatus::Processing, redacted_location: None, error: None }
    }

    pub fn redacted(location: impl Into<String>) -> Self {
        StatusUpdate {
            status: DocumentStatus::Redacted,
            redacted_location: Some(location.into()),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        StatusUpdate { status: DocumentStatus::Failed, redacted_location: None, error: Some(message.into()) }
    }

    pub fn apply_to(&self, document: &mut Document) {
        document.status = self.status;
        document.redacted_location = self.redacted_location.clone();
        document.error = self.error.clone();
    }
}

/// Decodes raw source bytes into text, rejecting binary or non-UTF-8 content.
pub fn decode_source(document_id: &str, bytes: Vec<u8>) -> Result<String> {
    if bytes.contains(&0) {
        return Err(DocshieldError::processing(
            document_id,
            "document appears to be binary (contains NUL bytes)",
        ));
    }
    String::from_utf8(bytes).map_err(|e| {
        DocshieldError::processing(
            document_id,
            format!("document is not valid UTF-8 text (invalid byte at offset {})", e.utf8_error().valid_up_to()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_update_replaces_location_and_error() {
        let mut doc = Document::new("d1", "u1", "d1.txt");
        StatusUpdate::failed("boom").apply_to(&mut doc);
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert_eq!(doc.error.as_deref(), Some("boom"));

        StatusUpdate::redacted("artifacts/d1.redacted.txt").apply_to(&mut doc);
        assert_eq!(doc.status, DocumentStatus::Redacted);
        assert!(doc.error.is_none());
        assert_eq!(doc.redacted_location.as_deref(), Some("artifacts/d1.redacted.txt"));
    }

    #[test]
    fn decode_rejects_binary_and_invalid_utf8() {
        assert_eq!(decode_source("d", b"plain".to_vec()).unwrap(), "plain");
        let err = decode_source("d", vec![b'a', 0, b'b']).unwrap_err();
        assert!(err.to_string().contains("binary"));
        let err = decode_source("d", vec![b'a', 0xff, 0xfe]).unwrap_err();
        assert_eq!(err.kind(), "processing");
        assert!(err.to_string().contains("offset 1"));
    }
}
