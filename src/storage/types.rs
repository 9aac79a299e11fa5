use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A captured photo with its self-destruct deadline.
///
/// Records are immutable once persisted: there is no update operation, and
/// `expiry_date` cannot be edited after capture. The persisted form is the
/// wire contract shared by both backends:
///
/// ```text
/// { "id": "...", "data": "data:image/jpeg;base64,...", "timestamp": 1700000000000, "expiryDate": 1700003600000 }
/// ```
///
/// Instants serialize as integer epoch milliseconds and are truncated to
/// millisecond precision at construction so a persisted record reloads
/// equal to the original in every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Opaque unique id, the sole lookup and delete key.
    pub id: String,
    /// Encoded still image as a `data:` URL.
    pub data: String,
    /// Instant of capture.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Instant after which the record is expired. Absolute time, not a
    /// duration: comparisons always use the caller's reading of "now".
    #[serde(rename = "expiryDate", with = "chrono::serde::ts_milliseconds")]
    pub expiry_date: DateTime<Utc>,
}

impl PhotoRecord {
    /// Build a record with a fresh unique id.
    pub fn new(data: String, timestamp: DateTime<Utc>, expiry_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data,
            timestamp: truncate_to_millis(timestamp),
            expiry_date: truncate_to_millis(expiry_date),
        }
    }

    /// Whether the record is past its expiry instant at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date <= now
    }

    /// Decode the `data:` URL payload back into its mime type and raw
    /// image bytes. `None` if the payload is not a base64 data URL.
    pub fn decode_image(&self) -> Option<(String, Vec<u8>)> {
        let rest = self.data.strip_prefix("data:")?;
        let (mime, payload) = rest.split_once(";base64,")?;
        let bytes = BASE64.decode(payload).ok()?;
        Some((mime.to_string(), bytes))
    }
}

/// Encode raw image bytes as a base64 `data:` URL.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(instant.timestamp_millis()).unwrap_or(instant)
}
