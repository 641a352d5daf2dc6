//! Capture records: one parsed line of the CDXJ index.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};

/// JSON metadata block of a capture line.
///
/// Field names match what the indexer writes. Unknown fields are ignored
/// so index formats can grow without breaking replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Content-store path whose last two segments are the header and
    /// payload blob refs.
    pub locator: String,
    /// MIME type of the archived payload.
    #[serde(default)]
    pub mime_type: String,
    /// Archived HTTP status code as a string; the first character is the
    /// status class digit.
    #[serde(default = "RecordMeta::default_status")]
    pub status_code: String,
    /// Optional page title captured at index time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Encryption scheme name, present when the blobs are encrypted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_method: Option<String>,
    /// Key material for encrypted blobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
    /// Base64 nonce for encrypted blobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_nonce: Option<String>,
}

impl RecordMeta {
    fn default_status() -> String {
        "200".to_string()
    }

    /// Splits the locator into `(header_ref, payload_ref)`.
    ///
    /// The refs are the last two `/`-separated segments; anything before
    /// them (e.g. a store scheme prefix) is ignored.
    pub fn locator_refs(&self) -> IndexResult<(&str, &str)> {
        let mut it = self.locator.rsplit('/');
        let payload = it.next().filter(|s| !s.is_empty());
        let header = it.next().filter(|s| !s.is_empty());
        match (header, payload) {
            (Some(h), Some(p)) => Ok((h, p)),
            _ => Err(IndexError::MalformedLocator {
                locator: self.locator.clone(),
            }),
        }
    }

    /// Returns true when the record's blobs are encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.encryption_method.is_some()
    }
}

/// One capture line of the index: canonical key, 14-digit timestamp, and
/// the parsed metadata block.
#[derive(Debug, Clone)]
pub struct CaptureRecord {
    /// Canonical sortable form of the captured URI.
    pub canonical_key: String,
    /// Full 14-digit UTC timestamp, `YYYYMMDDhhmmss`.
    pub timestamp: String,
    /// Parsed JSON metadata block.
    pub meta: RecordMeta,
}

impl CaptureRecord {
    /// Parses a physical index line. `line_no` is used for error context
    /// only.
    pub fn parse(line: &str, line_no: usize) -> IndexResult<Self> {
        let mut fields = line.splitn(3, ' ');
        let key = fields.next().unwrap_or_default();
        let timestamp = fields.next().unwrap_or_default();
        let json = fields.next().ok_or_else(|| IndexError::MalformedLine {
            line_no,
            reason: "expected 3 space-separated fields".to_string(),
        })?;

        if key.is_empty() || timestamp.len() != 14 || !is_all_digits(timestamp) {
            return Err(IndexError::MalformedLine {
                line_no,
                reason: format!("bad key or timestamp: {key:?} {timestamp:?}"),
            });
        }

        let meta: RecordMeta = serde_json::from_str(json)?;
        Ok(Self {
            canonical_key: key.to_string(),
            timestamp: timestamp.to_string(),
            meta,
        })
    }

    /// The record's timestamp as an integer, for nearest-datetime math.
    pub fn timestamp_value(&self) -> i64 {
        self.timestamp.parse().unwrap_or(0)
    }
}

/// Validates a query timestamp: 1-14 ASCII digits.
pub fn validate_timestamp_query(value: &str) -> IndexResult<()> {
    if value.is_empty() || value.len() > 14 || !is_all_digits(value) {
        return Err(IndexError::InvalidTimestamp {
            value: value.to_string(),
        });
    }
    Ok(())
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
