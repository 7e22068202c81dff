//! Policy-driven retry around a single fallible attempt.
//!
//! [`Retrier::run`] executes a caller-supplied attempt up to an attempt
//! budget, classifying each failure as retryable or terminal and sleeping
//! on the backoff schedule in between. The engine is parametric over the
//! attempt's success and failure types; the classifiers for transport
//! failures and HTTP statuses live here so callers share one policy.

use std::{thread, time::Duration};

use log::debug;

use crate::client::ClientError;

mod backoff;

pub use backoff::BackoffSchedule;

/// Default base delay for exponential backoff.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
/// Default delay cap for exponential backoff.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(1_000);
/// Default attempt budget (one initial attempt plus three retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Retry tuning: attempt budget plus backoff shape.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts permitted, counting the first.
    pub max_attempts: u32,
    /// Base delay of the exponential schedule.
    pub base_delay: Duration,
    /// Cap the schedule saturates at.
    pub max_delay: Duration,
    /// Whether delays carry random jitter in `[0, base_delay)`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: false,
        }
    }
}

/// Classification of a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryClass {
    /// Worth another attempt after backoff.
    Retryable,
    /// Retrying cannot change the outcome.
    Terminal,
}

/// Classification of an HTTP response status for retry logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx responses - the request succeeded.
    Success,
    /// 5xx or 429 - retry with backoff.
    Retryable,
    /// Everything else - a terminal outcome worth reporting as-is.
    Permanent,
}

/// Classifies an HTTP status code for retry logic.
///
/// * **2xx** → [`ResponseClass::Success`]
/// * **429** → [`ResponseClass::Retryable`] - rate limited
/// * **5xx** → [`ResponseClass::Retryable`] - server error
/// * **Other** → [`ResponseClass::Permanent`]
pub fn classify_status(status: u16) -> ResponseClass {
    match status {
        200..=299 => ResponseClass::Success,
        429 => ResponseClass::Retryable,
        500..=599 => ResponseClass::Retryable,
        _ => ResponseClass::Permanent,
    }
}

/// Default classification of transport failures.
///
/// Connection setup, handshake, timeout, and wire I/O failures are
/// transient by nature; anything else means the exchange itself is broken
/// and retrying cannot help.
pub fn transport_class(error: &ClientError) -> RetryClass {
    match error {
        ClientError::ConnectFailed(_)
        | ClientError::TlsHandshakeFailed(_)
        | ClientError::Timeout
        | ClientError::WriteFailed(_)
        | ClientError::ReadFailed(_) => RetryClass::Retryable,
        _ => RetryClass::Terminal,
    }
}

/// Terminal result of a retry loop.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// The successful value or the last failure.
    pub result: Result<T, E>,
    /// Zero-based index of the attempt that produced `result`, i.e. the
    /// number of additional attempts beyond the first.
    pub retries: u32,
}

/// Drives attempts against a [`RetryPolicy`]'s backoff schedule.
///
/// One retrier per worker; the jitter source inside the schedule is
/// stateful, which is why `run` takes `&mut self`.
pub struct Retrier {
    backoff: BackoffSchedule,
}

impl Retrier {
    /// Build a retrier from the policy's backoff shape.
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            backoff: BackoffSchedule::new(policy.base_delay, policy.max_delay, policy.jitter),
        }
    }

    /// Execute `attempt` at most `max_attempts` times.
    ///
    /// Attempts are numbered `k = 0..max_attempts`. A failure on attempt
    /// `k` sleeps for the schedule's `delay(k)` and retries only while
    /// budget remains and `classify` deems the failure retryable. A budget
    /// of zero is treated as one attempt.
    pub fn run<C, T, E, A, K>(
        &mut self,
        max_attempts: u32,
        context: &C,
        mut attempt: A,
        classify: K,
    ) -> RetryOutcome<T, E>
    where
        A: FnMut(&C) -> Result<T, E>,
        K: Fn(&E) -> RetryClass,
    {
        let budget = max_attempts.max(1);
        let mut index = 0u32;
        loop {
            match attempt(context) {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        retries: index,
                    };
                }
                Err(error) => {
                    if index + 1 >= budget || classify(&error) == RetryClass::Terminal {
                        return RetryOutcome {
                            result: Err(error),
                            retries: index,
                        };
                    }
                    let delay = self.backoff.delay(index);
                    debug!("attempt {index} failed, retrying in {delay:?}");
                    thread::sleep(delay);
                    index += 1;
                }
            }
        }
    }
}
