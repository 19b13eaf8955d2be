use std::{thread, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub base_delay_ms: u64,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3, base_delay_ms: 300, factor: 2.0 }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn once() -> Self {
        Self { attempts: 1, base_delay_ms: 0, factor: 1.0 }
    }

    /// Delay before try `n + 1`, after the `n`-th failure (1-based).
    pub fn delay(&self, n: usize) -> Duration {
        let exp = n.saturating_sub(1) as i32;
        Duration::from_millis((self.base_delay_ms as f64 * self.factor.powi(exp)).round() as u64)
    }

    /// Run `op` up to `attempts` times, returning the first success or the last error.
    pub fn run<T>(&self, label: &str, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let attempts = self.attempts.max(1);
        let mut n = 0;
        loop {
            n += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if n < attempts => {
                    let delay = self.delay(n);
                    tracing::warn!(label, attempt = n, error = %err, ?delay, "request failed, retrying");
                    if !delay.is_zero() { thread::sleep(delay) }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Walk `endpoints` in order, applying `policy` to each, and return the first
/// success. Fails with [`Error::ProviderUnavailable`] once every endpoint is exhausted.
pub fn first_success<T>(
    service: &'static str,
    endpoints: &[String],
    policy: &RetryPolicy,
    mut op: impl FnMut(&str) -> Result<T>,
) -> Result<T> {
    let mut last = String::from("no endpoints configured");
    let mut attempts = 0;

    for endpoint in endpoints {
        tracing::debug!(service, endpoint = endpoint.as_str(), "querying endpoint");
        let result = policy.run(endpoint, || {
            attempts += 1;
            op(endpoint)
        });
        match result {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::warn!(service, endpoint = endpoint.as_str(), error = %err, "endpoint exhausted, rotating");
                last = err.to_string();
            }
        }
    }

    Err(Error::ProviderUnavailable { service, attempts, last })
}
