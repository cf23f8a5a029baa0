//! Wire shapes of the contents API and the measurement document it carries.

use crate::sync::error::SyncError;
use crate::types::record::{RawRow, Record, RowResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a successful "get content" answer. Only the fields used here are modeled.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ContentResponse {
    pub sha: Option<String>,
    pub content: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

/// Body of a "put content" request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PutPayload {
    pub message: String,
    /// Base64 of the pretty-printed JSON document.
    pub content: String,
    pub branch: String,
    /// Version token of the document being replaced; absent when creating it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

/// Extracts the human-readable message from an error body, falling back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Decodes the transport encoding (base64, possibly wrapped at 60 columns) into the document text.
pub(crate) fn decode_content(content: &str) -> Result<String, SyncError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(SyncError::DecodeBase64)?;
    String::from_utf8(bytes).map_err(SyncError::DecodeUtf8)
}

pub(crate) fn encode_content(document: &str) -> String {
    STANDARD.encode(document.as_bytes())
}

/// Parses the document into one inbound row per array entry.
///
/// An entry that is not an object, or holds a malformed number, becomes an `Err` row; the
/// remaining entries are still returned.
///
/// # Errors
///
/// Returns [`SyncError::DecodeJson`] when the document is not a JSON array.
pub(crate) fn parse_document(document: &str) -> Result<Vec<RowResult>, SyncError> {
    let entries: Vec<Value> = serde_json::from_str(document).map_err(SyncError::DecodeJson)?;
    Ok(entries.iter().map(RawRow::from_json).collect())
}

pub(crate) fn render_document(records: &[Record]) -> Result<String, SyncError> {
    serde_json::to_string_pretty(records).map_err(SyncError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::source::Source;
    use chrono::NaiveDate;

    #[test]
    fn test_content_round_trip_with_wrapped_base64() -> Result<(), SyncError> {
        let document = "[{\"Datum\": \"2024-01-01 00:00:00\", \"Standort\": \"Jena\"}]";
        let encoded = encode_content(document);
        let wrapped = format!("{}\n{}\n", &encoded[..20], &encoded[20..]);
        assert_eq!(decode_content(&wrapped)?, document);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_content("###"),
            Err(SyncError::DecodeBase64(_))
        ));
    }

    #[test]
    fn test_parse_document_keeps_good_entries() -> Result<(), SyncError> {
        let rows = parse_document(
            r#"[{"Datum": "2024-01-01", "Niederschlag": "x"}, {"Datum": "2024-01-02"}]"#,
        )?;
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_err());
        assert!(rows[1].is_ok());
        assert!(matches!(
            parse_document("{\"not\": \"an array\"}"),
            Err(SyncError::DecodeJson(_))
        ));
        Ok(())
    }

    #[test]
    fn test_render_document_uses_display_names() -> Result<(), SyncError> {
        let record = Record {
            id: "x".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            temperature: 1.0,
            precipitation: 0.0,
            sunshine_hours: 0.0,
            source: Source::Manual,
            location: "Jena".into(),
            temp_min: None,
            temp_max: None,
        };
        let document = render_document(&[record])?;
        assert!(document.starts_with("[\n  {"));
        assert!(document.contains("\"Quelle\": \"manuell\""));
        Ok(())
    }

    #[test]
    fn test_put_payload_omits_missing_sha() -> Result<(), serde_json::Error> {
        let payload = PutPayload {
            message: "m".into(),
            content: "c".into(),
            branch: "main".into(),
            sha: None,
        };
        let value = serde_json::to_value(&payload)?;
        assert!(value.get("sha").is_none());
        Ok(())
    }

    #[test]
    fn test_error_message_prefers_json_message() {
        assert_eq!(error_message(r#"{"message": "Not Found"}"#), "Not Found");
        assert_eq!(error_message(" plain "), "plain");
    }
}
