//! The output side of the manifest contract.
//!
//! Each processed request produces exactly one `ResponseRecord`,
//! serialised as a single JSON object per line. Field order is fixed by
//! the struct declaration; serde_json's string escaping covers `"`, `\`,
//! the common control escapes, and `\u00XX` for the rest of the range
//! below 0x20.

use std::io;

use serde::{Deserialize, Serialize};

/// Bodies longer than this many bytes are cut before serialisation.
pub const MAX_BODY_SNIPPET: usize = 1_000;
/// Marker appended to a truncated body.
pub const TRUNCATION_MARKER: &str = "... (truncated)";

/// One line of engine output.
///
/// `status == 0` means no HTTP status was obtained and is always paired
/// with an `error`; any non-zero status is a real response, however
/// unhappy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Byte-for-byte copy of the request `id`.
    pub id: String,
    /// HTTP status code, or `0` when the request never produced one.
    pub status: u16,
    /// Wall-clock milliseconds from pick-up to terminal outcome,
    /// including backoff sleeps.
    pub latency_ms: u64,
    /// Additional attempts beyond the first.
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ResponseRecord {
    /// Record for a request that obtained an HTTP response.
    pub fn success(id: &str, status: u16, latency_ms: u64, retry_count: u32, body: &[u8]) -> Self {
        Self {
            id: id.to_owned(),
            status,
            latency_ms,
            retry_count,
            error: None,
            body: Some(body_snippet(body)),
        }
    }

    /// Record for a request that failed before any status line was parsed.
    pub fn failure(id: &str, latency_ms: u64, retry_count: u32, error: String) -> Self {
        Self {
            id: id.to_owned(),
            status: 0,
            latency_ms,
            retry_count,
            error: Some(error),
            body: None,
        }
    }

    /// Serialise to a single line of JSON, without the trailing newline.
    pub fn serialise(&self) -> io::Result<String> {
        serde_json::to_string(self).map_err(io::Error::other)
    }
}

/// Cut a raw body down to the reportable snippet.
///
/// Truncation happens on the byte prefix; a split multi-byte character
/// degrades to the replacement character rather than invalid output.
fn body_snippet(raw: &[u8]) -> String {
    if raw.len() > MAX_BODY_SNIPPET {
        let mut snippet = String::from_utf8_lossy(&raw[..MAX_BODY_SNIPPET]).into_owned();
        snippet.push_str(TRUNCATION_MARKER);
        snippet
    } else {
        String::from_utf8_lossy(raw).into_owned()
    }
}
