//! Caller-supplied retry policy.
//!
//! Endpoint methods never retry on their own. Callers that want retries wrap
//! a call in a policy; only transient classes (network, server error) are
//! repeated, with doubling backoff between attempts.

use std::thread;
use std::time::Duration;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    /// A single attempt.
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    /// `retries` extra attempts after the first, starting at 1s backoff.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            initial_backoff: Duration::from_secs(1),
        }
    }

    pub fn backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempts run out. Returns the last error.
    pub fn run<R>(&self, mut op: impl FnMut() -> Result<R, ClientError>) -> Result<R, ClientError> {
        let attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;

        for attempt in 1..=attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() || attempt == attempts => return Err(e),
                Err(e) => {
                    log::warn!(
                        "retry {}/{} in {}ms ({})",
                        attempt,
                        attempts - 1,
                        backoff.as_millis(),
                        e
                    );
                    thread::sleep(backoff);
                    backoff = backoff.saturating_mul(2);
                }
            }
        }

        unreachable!("loop returns on the final attempt")
    }
}
