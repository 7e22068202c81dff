//! Worker runtime: one thread, one client, one retrier.
//!
//! A worker pulls descriptors from the shared queue until it closes and
//! turns every one of them into exactly one response record. Per-request
//! failures never escape the worker; only a sink failure ends the loop
//! early, because at that point emitted output can no longer be trusted.

use std::{
    io::Write,
    time::{Duration, Instant},
};

use crossbeam_channel::Receiver;
use log::debug;

use crate::{
    client::{ClientError, ClientOptions, ClientResponse, HttpClient},
    config::EngineConfig,
    manifest::{Method, RequestDescriptor, ResponseRecord},
    retry::{Retrier, ResponseClass, RetryClass, classify_status, transport_class},
    sink::{OutputSink, SinkError},
    stats::BatchStats,
};

/// Failure of a single attempt as seen by the retry loop.
///
/// Retryable statuses travel as failures so the retry engine drives them,
/// but they still carry the full response: when the budget runs out the
/// last response is reported as-is rather than degraded to an error.
enum AttemptFailure {
    Transport(ClientError),
    Status(ClientResponse),
}

impl AttemptFailure {
    fn class(&self) -> RetryClass {
        match self {
            Self::Transport(error) => transport_class(error),
            Self::Status(_) => RetryClass::Retryable,
        }
    }
}

pub(super) struct Worker {
    id: usize,
    client: HttpClient,
    retrier: Retrier,
    default_max_attempts: u32,
    retry_server_errors: bool,
}

impl Worker {
    /// Construct the worker's private client and retrier.
    pub(super) fn new(id: usize, config: &EngineConfig) -> Self {
        let client = HttpClient::new(ClientOptions {
            connect_timeout: config.connect_timeout,
            default_timeout: config.default_timeout,
            max_body_bytes: config.max_body_bytes,
        });
        let policy = config.retry_policy();
        Self {
            id,
            client,
            retrier: Retrier::new(&policy),
            default_max_attempts: policy.max_attempts,
            retry_server_errors: config.retry_server_errors,
        }
    }

    /// Drain the queue, emitting one record per descriptor.
    pub(super) fn run<W: Write>(
        mut self,
        rx: &Receiver<&RequestDescriptor>,
        sink: &OutputSink<W>,
        stats: &BatchStats,
    ) -> Result<(), SinkError> {
        debug!("worker {} started", self.id);
        for request in rx.iter() {
            let record = self.execute(request);
            stats.observe(&record);
            sink.emit(&record)?;
        }
        debug!("worker {} finished", self.id);
        Ok(())
    }

    /// Run one descriptor through the retry loop to a terminal record.
    fn execute(&mut self, request: &RequestDescriptor) -> ResponseRecord {
        let start = Instant::now();

        if matches!(request.method, Method::HEAD | Method::OPTIONS) {
            return ResponseRecord::failure(
                &request.id,
                elapsed_ms(start),
                0,
                "MethodNotSupported".to_owned(),
            );
        }

        let budget = request
            .max_retries
            .map(|retries| retries.saturating_add(1))
            .unwrap_or(self.default_max_attempts);
        let timeout = request.timeout_ms.map(Duration::from_millis);

        let client = &self.client;
        let retry_server_errors = self.retry_server_errors;
        let outcome = self.retrier.run(
            budget,
            request,
            |request| {
                match perform(client, request, timeout) {
                    Ok(response)
                        if retry_server_errors
                            && classify_status(response.status) == ResponseClass::Retryable =>
                    {
                        Err(AttemptFailure::Status(response))
                    }
                    Ok(response) => Ok(response),
                    Err(error) => Err(AttemptFailure::Transport(error)),
                }
            },
            AttemptFailure::class,
        );

        let latency_ms = elapsed_ms(start);
        let retries = outcome.retries;
        match outcome.result {
            Ok(response) => ResponseRecord::success(
                &request.id,
                response.status,
                latency_ms,
                retries,
                &response.body,
            ),
            Err(AttemptFailure::Status(response)) => ResponseRecord::success(
                &request.id,
                response.status,
                latency_ms,
                retries,
                &response.body,
            ),
            Err(AttemptFailure::Transport(error)) => {
                ResponseRecord::failure(&request.id, latency_ms, retries, error.to_string())
            }
        }
    }
}

/// Dispatch one attempt through the verb matching the descriptor.
fn perform(
    client: &HttpClient,
    request: &RequestDescriptor,
    timeout: Option<Duration>,
) -> Result<ClientResponse, ClientError> {
    let headers = collect_headers(request);
    // An absent body on a body-bearing method degrades to an empty one;
    // a body on any other method is ignored.
    let body = request.body.as_deref().unwrap_or_default();
    match request.method {
        Method::GET => client.get(&request.url, &headers, timeout),
        Method::POST => client.post(&request.url, &headers, body.as_bytes(), timeout),
        Method::PUT => client.put(&request.url, &headers, body.as_bytes(), timeout),
        Method::PATCH => client.patch(&request.url, &headers, body.as_bytes(), timeout),
        Method::DELETE => client.delete(&request.url, &headers, timeout),
        Method::HEAD | Method::OPTIONS => unreachable!("rejected before dispatch"),
    }
}

fn collect_headers(request: &RequestDescriptor) -> Vec<(String, String)> {
    request
        .headers
        .as_ref()
        .map(|headers| {
            headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
