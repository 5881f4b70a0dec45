//! Resilient invocation of remote calls
//!
//! Every call to the authoritative store goes through [`ResilientInvoker`]. A
//! backend that is still cold-starting shows up as timeouts, refused
//! connections, or 5xx responses, and is retried with a linearly growing
//! wait. Credential and validation failures (400/401) and every other
//! failure are returned on first occurrence.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult, FailureClass};
use crate::models::Advisory;
use crate::services::notifier::Notifier;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);
pub const DEFAULT_RETRY_STEP: Duration = Duration::from_millis(2_000);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Timeout and backoff settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt, only for `ServerUnavailable` failures
    pub max_retries: u32,
    /// Upper bound on a single attempt
    pub timeout: Duration,
    /// Wait before retry `n` is `n * step`
    pub step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            step: DEFAULT_RETRY_STEP,
        }
    }
}

impl RetryPolicy {
    /// Wait before the given retry (1-based)
    pub fn wait_for(&self, attempt_number: u32) -> Duration {
        self.step * attempt_number
    }
}

/// One scheduled retry of a logical invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    pub attempt_number: u32,
    pub classification: FailureClass,
    pub wait_ms: u64,
}

impl RetryAttempt {
    fn advisory(&self, max_retries: u32) -> Advisory {
        let seconds = self.wait_ms as f64 / 1000.0;
        if self.attempt_number == 1 {
            Advisory::warning(format!(
                "The server is waking up, this can take a moment. Retrying in {}s...",
                seconds
            ))
        } else {
            Advisory::info(format!(
                "Still waiting for the server (retry {} of {}, next attempt in {}s)...",
                self.attempt_number, max_retries, seconds
            ))
        }
    }
}

/// Runs remote calls with timeout, failure classification and backoff
#[derive(Clone)]
pub struct ResilientInvoker {
    policy: RetryPolicy,
    notifier: Arc<dyn Notifier>,
}

impl ResilientInvoker {
    pub fn new(policy: RetryPolicy, notifier: Arc<dyn Notifier>) -> Self {
        Self { policy, notifier }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Invokes `call` with the configured number of retries
    pub async fn invoke<T, F, Fut>(&self, operation: &str, call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        self.invoke_with_retries(operation, self.policy.max_retries, call)
            .await
    }

    /// Invokes `call`, retrying up to `max_retries` times while the server is unavailable.
    ///
    /// Exhausting the retries yields [`AppError::ServiceUnavailable`], not the
    /// last underlying error.
    pub async fn invoke_with_retries<T, F, Fut>(
        &self,
        operation: &str,
        max_retries: u32,
        mut call: F,
    ) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut retries = 0u32;

        loop {
            let outcome = match tokio::time::timeout(self.policy.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(AppError::ServerUnavailable(format!(
                    "{} timed out after {}ms",
                    operation,
                    self.policy.timeout.as_millis()
                ))),
            };

            let error = match outcome {
                Ok(value) => {
                    if retries > 0 {
                        tracing::info!(operation, retries, "Remote call succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            let classification = error.failure_class();
            if classification != FailureClass::ServerUnavailable {
                tracing::debug!(
                    operation,
                    classification = ?classification,
                    error = %error,
                    "Remote call failed, not retrying"
                );
                return Err(error);
            }

            if retries >= max_retries {
                tracing::error!(
                    operation,
                    attempts = retries + 1,
                    error = %error,
                    "Remote call failed, retries exhausted"
                );
                return Err(AppError::ServiceUnavailable {
                    attempts: retries + 1,
                });
            }

            retries += 1;
            let wait = self.policy.wait_for(retries);
            let attempt = RetryAttempt {
                attempt_number: retries,
                classification,
                wait_ms: wait.as_millis() as u64,
            };

            tracing::warn!(
                operation,
                attempt = attempt.attempt_number,
                wait_ms = attempt.wait_ms,
                error = %error,
                "Server unavailable, scheduling retry"
            );
            self.notifier.notify(attempt.advisory(max_retries));

            tokio::time::sleep(wait).await;
        }
    }
}
