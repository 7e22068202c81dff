//! Manifest codec: one request descriptor per input line.
//!
//! The input is newline-delimited JSON. Blank lines are skipped; a line
//! that fails to parse is reported with the line's `id` when one can be
//! recovered, so the caller can still emit exactly one record for it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod record;

pub use record::{MAX_BODY_SNIPPET, ResponseRecord, TRUNCATION_MARKER};

/// Placeholder identifier for lines whose own `id` cannot be recovered.
pub const UNKNOWN_ID: &str = "<unknown>";

/// Errors produced while decoding a manifest line.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// The line is not a usable descriptor (bad JSON, missing fields,
    /// out-of-range values, unsupported URL scheme).
    #[error("InvalidManifest: {0}")]
    InvalidManifest(String),
    /// The `method` field is not one of the recognised verbs.
    #[error("InvalidMethod: unknown method `{0}`")]
    InvalidMethod(String),
}

/// HTTP methods recognised by the manifest parser.
///
/// `HEAD` and `OPTIONS` parse successfully but are rejected later by the
/// executor; keeping them here lets the rejection carry the request's own
/// `id` instead of a parse error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
    HEAD,
    OPTIONS,
}

impl Method {
    /// Case-sensitive match against the manifest's method strings.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "GET" => Some(Self::GET),
            "POST" => Some(Self::POST),
            "PUT" => Some(Self::PUT),
            "PATCH" => Some(Self::PATCH),
            "DELETE" => Some(Self::DELETE),
            "HEAD" => Some(Self::HEAD),
            "OPTIONS" => Some(Self::OPTIONS),
            _ => None,
        }
    }

    /// Convert to the string representation used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::PATCH => "PATCH",
            Self::DELETE => "DELETE",
            Self::HEAD => "HEAD",
            Self::OPTIONS => "OPTIONS",
        }
    }

    /// Whether the executor sends a request body for this method.
    pub fn allows_body(&self) -> bool {
        matches!(self, Self::POST | Self::PUT | Self::PATCH)
    }
}

/// One parsed input record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestDescriptor {
    /// Caller-supplied correlation tag, copied verbatim into the output.
    pub id: String,
    pub method: Method,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Per-request override of the engine's default timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Per-request override of the engine's default retry budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

/// Outcome of parsing one non-blank manifest line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedLine {
    /// A usable descriptor.
    Request(RequestDescriptor),
    /// A line that must still produce exactly one (error) output record.
    Invalid { id: String, error: ManifestError },
}

/// Field-level shape of a manifest line; validation happens afterwards so
/// the error can say which field was at fault.
#[derive(Debug, Deserialize)]
struct RawDescriptor {
    id: Option<String>,
    method: Option<String>,
    url: Option<String>,
    headers: Option<BTreeMap<String, String>>,
    body: Option<String>,
    timeout_ms: Option<u64>,
    max_retries: Option<u32>,
}

/// Parse one manifest line. Returns `None` for blank lines.
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(err) => {
            return Some(ParsedLine::Invalid {
                id: UNKNOWN_ID.to_owned(),
                error: ManifestError::InvalidManifest(err.to_string()),
            });
        }
    };

    // Recover the id before strict decoding so error records stay
    // correlatable even when another field is broken.
    let id = value
        .get("id")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_owned);

    match descriptor_from_value(value) {
        Ok(request) => Some(ParsedLine::Request(request)),
        Err(error) => Some(ParsedLine::Invalid {
            id: id.unwrap_or_else(|| UNKNOWN_ID.to_owned()),
            error,
        }),
    }
}

fn descriptor_from_value(value: serde_json::Value) -> Result<RequestDescriptor, ManifestError> {
    let raw: RawDescriptor = serde_json::from_value(value)
        .map_err(|err| ManifestError::InvalidManifest(err.to_string()))?;

    let id = raw
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ManifestError::InvalidManifest("missing or empty `id`".to_owned()))?;
    let method_name = raw
        .method
        .ok_or_else(|| ManifestError::InvalidManifest("missing `method`".to_owned()))?;
    let method = Method::parse(&method_name).ok_or(ManifestError::InvalidMethod(method_name))?;
    let url = raw
        .url
        .ok_or_else(|| ManifestError::InvalidManifest("missing `url`".to_owned()))?;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ManifestError::InvalidManifest(format!(
            "unsupported url scheme in `{url}`"
        )));
    }

    Ok(RequestDescriptor {
        id,
        method,
        url,
        headers: raw.headers,
        body: raw.body,
        timeout_ms: raw.timeout_ms,
        max_retries: raw.max_retries,
    })
}
