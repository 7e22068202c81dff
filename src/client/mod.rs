//! Single-owner HTTP client facade.
//!
//! `HttpClient` wraps a `ureq::Agent` and exposes one method per supported
//! verb. The agent reuses connections per `(scheme, host, port)` across
//! successive calls, so a worker that keeps its client for the whole batch
//! amortises connection setup. Instances are never shared: each worker
//! constructs its own client on entry and drops it on exit, which is what
//! makes the engine free of cross-thread HTTP state.

use std::{io::Read, time::Duration};

use ureq::{Agent, AgentBuilder};

use crate::config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_BODY_BYTES, DEFAULT_TIMEOUT};

mod error;
#[cfg(test)]
mod tests;

pub use error::ClientError;

/// Construction parameters for [`HttpClient`].
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Timeout for establishing connections.
    pub connect_timeout: Duration,
    /// Round-trip timeout applied when a call carries no override.
    pub default_timeout: Duration,
    /// Upper bound on materialised response bodies.
    pub max_body_bytes: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            default_timeout: DEFAULT_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// A fully materialised HTTP response.
///
/// Non-2xx statuses are responses, not errors; callers decide what a 404
/// or a 503 means for them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Blocking HTTP client owned by exactly one worker at a time.
pub struct HttpClient {
    agent: Agent,
    default_timeout: Duration,
    max_body_bytes: usize,
}

impl HttpClient {
    /// Build a client with its own connection pool.
    pub fn new(options: ClientOptions) -> Self {
        let agent = AgentBuilder::new()
            .timeout_connect(options.connect_timeout)
            .timeout(options.default_timeout)
            .build();
        Self {
            agent,
            default_timeout: options.default_timeout,
            max_body_bytes: options.max_body_bytes,
        }
    }

    /// Perform a GET request.
    pub fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<ClientResponse, ClientError> {
        self.execute("GET", url, headers, None, timeout)
    }

    /// Perform a POST request with the supplied body.
    pub fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &[u8],
        timeout: Option<Duration>,
    ) -> Result<ClientResponse, ClientError> {
        self.execute("POST", url, headers, Some(body), timeout)
    }

    /// Perform a PUT request with the supplied body.
    pub fn put(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &[u8],
        timeout: Option<Duration>,
    ) -> Result<ClientResponse, ClientError> {
        self.execute("PUT", url, headers, Some(body), timeout)
    }

    /// Perform a PATCH request with the supplied body.
    pub fn patch(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &[u8],
        timeout: Option<Duration>,
    ) -> Result<ClientResponse, ClientError> {
        self.execute("PATCH", url, headers, Some(body), timeout)
    }

    /// Perform a DELETE request.
    pub fn delete(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<ClientResponse, ClientError> {
        self.execute("DELETE", url, headers, None, timeout)
    }

    fn execute(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Option<&[u8]>,
        timeout: Option<Duration>,
    ) -> Result<ClientResponse, ClientError> {
        let mut request = self
            .agent
            .request(method, url)
            .timeout(timeout.unwrap_or(self.default_timeout));
        for (name, value) in headers {
            request = request.set(name, value);
        }

        let result = match body {
            Some(bytes) => request.send_bytes(bytes),
            None => request.call(),
        };

        match result {
            Ok(response) => self.read_response(response),
            // Non-2xx statuses carry a full response worth materialising.
            Err(ureq::Error::Status(_, response)) => self.read_response(response),
            Err(ureq::Error::Transport(transport)) => Err(error::map_transport(&transport)),
        }
    }

    fn read_response(&self, response: ureq::Response) -> Result<ClientResponse, ClientError> {
        let status = response.status();
        let headers: Vec<(String, String)> = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = response.header(&name)?.to_owned();
                Some((name, value))
            })
            .collect();

        // Read one byte past the cap so an over-limit body is detectable
        // without draining an unbounded stream.
        let mut body = Vec::new();
        let mut reader = response.into_reader().take(self.max_body_bytes as u64 + 1);
        reader
            .read_to_end(&mut body)
            .map_err(|err| error::map_body_read(&err))?;
        if body.len() > self.max_body_bytes {
            return Err(ClientError::BodyTooLarge(self.max_body_bytes));
        }

        Ok(ClientResponse {
            status,
            headers,
            body,
        })
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("default_timeout", &self.default_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}
