use log::{error, warn};
use serde_json::Value;
use std::future::Future;
use tokio::time::{sleep, Duration};

use crate::client::keys::KeyPool;
use crate::client::transport::Transport;
use crate::config::Credentials;
use crate::error::{AmbientError, ErrorKind, Result};
use crate::models::KeyPair;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 1000;
const DEFAULT_MAX_DELAY_MS: u64 = 10000;

/// Retry bound, exponential backoff and terminal-error predicate.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    terminal: fn(&AmbientError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            terminal: AmbientError::is_credential_rejection,
        }
    }
}

/// Result of one retry loop and how many retries it took
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    pub retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            ..Default::default()
        }
    }

    /// Same policy without waiting between attempts
    pub fn immediate(max_retries: u32) -> Self {
        RetryPolicy {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Stop retrying a credential on HTTP 400 as well as on auth failures
    pub fn treat_bad_request_as_terminal(mut self) -> Self {
        self.terminal = |err: &AmbientError| {
            err.is_credential_rejection() || err.kind() == ErrorKind::BadRequest
        };
        self
    }

    pub fn is_terminal(&self, err: &AmbientError) -> bool {
        (self.terminal)(err)
    }

    /// `min(base * 2^attempt, max)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails terminally, or the retry
    /// bound is used up. The operation receives the 0-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    return Attempted {
                        result: Ok(value),
                        retries: attempt,
                    }
                }
                Err(err) => {
                    if self.is_terminal(&err) || attempt >= self.max_retries {
                        return Attempted {
                            result: Err(err),
                            retries: attempt,
                        };
                    }
                    let delay = self.delay_for(attempt);
                    warn!(
                        "Attempt {} failed: {}. Retrying in {} ms",
                        attempt + 1,
                        err,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Query parameters with the pair's credentials added, replacing any
/// credentials already present
pub fn credential_query(params: &[(String, String)], pair: &KeyPair) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(key, _)| key != "apiKey" && key != "applicationKey")
        .cloned()
        .chain([
            ("apiKey".to_string(), pair.api_key.clone()),
            ("applicationKey".to_string(), pair.application_key.clone()),
        ])
        .collect()
}

/// GET `endpoint`, cycling through every key pair in pool order
///
/// Each pair is retried under `policy`; a terminal failure moves straight on
/// to the next pair. Fails with the last error seen once all pairs are used up.
pub async fn fetch_with_retry(
    transport: &dyn Transport,
    credentials: &Credentials,
    endpoint: &str,
    params: &[(String, String)],
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<Value> {
    let pool = KeyPool::from_credentials(credentials)?;
    let mut last_error = None;

    for pair in pool.pairs() {
        let query = credential_query(params, pair);
        let attempted = policy
            .run(|_| transport.get(endpoint, &query, timeout))
            .await;

        match attempted.result {
            Ok(value) => return Ok(value),
            Err(e) => {
                error!(
                    "Key pair {} gave up on {} after {} retries: {}",
                    pair.index, endpoint, attempted.retries, e
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| AmbientError::new(ErrorKind::AllRequestsFailed, "All requests failed")))
}
