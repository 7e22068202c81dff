//! Failure taxonomy of a single HTTP attempt.
//!
//! Every variant's display form leads with the kind name so response
//! records can be matched on the class of failure without a schema change.

use std::io;

use thiserror::Error;

/// Errors reported by [`HttpClient`](super::HttpClient) for one round-trip.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The connection could not be established (DNS, refused, unreachable).
    #[error("ConnectFailed: {0}")]
    ConnectFailed(String),
    /// The TLS handshake with the peer failed.
    #[error("TlsHandshakeFailed: {0}")]
    TlsHandshakeFailed(String),
    /// The per-request timeout elapsed before a terminal outcome.
    #[error("Timeout")]
    Timeout,
    /// The request could not be written to the wire.
    #[error("WriteFailed: {0}")]
    WriteFailed(String),
    /// The response could not be read from the wire.
    #[error("ReadFailed: {0}")]
    ReadFailed(String),
    /// The peer produced a response that does not parse as HTTP.
    #[error("MalformedResponse: {0}")]
    MalformedResponse(String),
    /// The redirect limit was exceeded.
    #[error("TooManyRedirects")]
    TooManyRedirects,
    /// The response body exceeded the configured cap.
    #[error("BodyTooLarge: response body exceeds {0} bytes")]
    BodyTooLarge(usize),
}

/// Map a transport-level failure from the underlying HTTP stack.
pub(super) fn map_transport(transport: &ureq::Transport) -> ClientError {
    let detail = transport.to_string();
    if is_timeout(&detail) {
        return ClientError::Timeout;
    }
    if is_tls_failure(&detail) {
        return ClientError::TlsHandshakeFailed(detail);
    }
    match transport.kind() {
        ureq::ErrorKind::Dns
        | ureq::ErrorKind::ConnectionFailed
        | ureq::ErrorKind::ProxyConnect
        | ureq::ErrorKind::ProxyUnauthorized
        | ureq::ErrorKind::InvalidProxyUrl
        | ureq::ErrorKind::InvalidUrl
        | ureq::ErrorKind::UnknownScheme
        | ureq::ErrorKind::InsecureRequestHttpsOnly => ClientError::ConnectFailed(detail),
        ureq::ErrorKind::TooManyRedirects => ClientError::TooManyRedirects,
        ureq::ErrorKind::BadStatus | ureq::ErrorKind::BadHeader => {
            ClientError::MalformedResponse(detail)
        }
        _ => {
            if is_write_failure(&detail) {
                ClientError::WriteFailed(detail)
            } else {
                ClientError::ReadFailed(detail)
            }
        }
    }
}

/// Map an I/O failure observed while draining a response body.
pub(super) fn map_body_read(error: &io::Error) -> ClientError {
    match error.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ClientError::Timeout,
        _ => ClientError::ReadFailed(error.to_string()),
    }
}

fn is_timeout(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    lower.contains("timed out") || lower.contains("timeout")
}

fn is_tls_failure(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    lower.contains("tls") || lower.contains("handshake") || lower.contains("certificate")
}

fn is_write_failure(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    lower.contains("broken pipe") || lower.contains("write")
}
