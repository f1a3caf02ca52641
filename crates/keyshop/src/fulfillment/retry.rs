//! Bounded retry around one decision attempt.
//!
//! Only storage failures that the backend's [`TransientClassifier`] calls
//! transient are repeated. Every attempt runs in its own transaction, so a
//! failed one leaves nothing behind.

use super::AllocationError;
use crate::error::DecisionError;
use crate::store::TransientClassifier;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based): doubles each time, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub async fn run<T, F, Fut>(
        &self,
        classifier: &dyn TransientClassifier,
        mut attempt_once: F,
    ) -> Result<T, DecisionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AllocationError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match attempt_once().await {
                Ok(value) => return Ok(value),
                Err(AllocationError::Store(err)) if classifier.is_transient(&err) => {
                    if attempt >= max_attempts {
                        error!(attempt, error = %err, "Storage still failing, giving up");
                        return Err(DecisionError::TransientFailure {
                            attempts: attempt,
                            last_error: err.to_string(),
                        });
                    }
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient storage failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
