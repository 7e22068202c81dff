//! Concurrent batch HTTP request executor.
//!
//! A manifest of request descriptors (newline-delimited JSON) is
//! dispatched across a bounded pool of worker threads. Each worker
//! exclusively owns one HTTP client for its lifetime, retries transient
//! failures with exponential backoff, and emits exactly one response
//! record per request to a serialized JSON Lines sink.

pub mod client;
pub mod config;
pub mod engine;
pub mod manifest;
pub mod retry;
pub mod sink;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{ClientError, ClientResponse, HttpClient};
pub use config::EngineConfig;
pub use engine::{Engine, FatalError};
pub use manifest::{Method, ParsedLine, RequestDescriptor, ResponseRecord, parse_line};
pub use sink::{OutputSink, SinkError};
pub use stats::StatsSnapshot;
