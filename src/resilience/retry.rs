//! Bounded retry with a fixed delay.
//!
//! # Responsibilities
//! - Re-invoke a failed operation up to `max_attempts` times
//! - Sleep a fixed delay between attempts, never after the last
//! - Convert exhaustion into a `Fault` value
//!
//! # Design Decisions
//! - No exponential backoff, no jitter; the delay is deliberately fixed
//! - The delay is an async suspension point, not a blocked thread
//! - A permanent failure costs exactly `max_attempts` invocations

use std::time::Duration;

use async_trait::async_trait;

use crate::observability::metrics;
use crate::resilience::{Fault, Operation, Outcome};

/// Tunables for one retry policy.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Total invocation budget, including the first attempt.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

/// Wrapper re-invoking one operation until it succeeds or the budget is
/// spent.
pub struct RetryPolicy<O> {
    op: O,
    max_attempts: u32,
    delay: Duration,
}

impl<O: Operation> RetryPolicy<O>
where
    O::Input: Clone,
{
    pub fn new(op: O, settings: RetrySettings) -> Self {
        Self {
            op,
            max_attempts: settings.max_attempts.max(1),
            delay: settings.delay,
        }
    }

    /// Invoke the operation, retrying faults up to the attempt budget.
    ///
    /// Success returns immediately with no further attempts and no
    /// delay. The input is cloned per attempt because the operation is
    /// consumed-by-value on each invocation.
    pub async fn invoke(&self, input: O::Input) -> Outcome<O::Value> {
        let mut attempts = 0;
        while attempts < self.max_attempts {
            match self.op.invoke(input.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempts += 1;
                    metrics::record_retry_attempt();
                    tracing::warn!(
                        attempt = attempts,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Attempt failed"
                    );
                    if attempts < self.max_attempts {
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }
        tracing::warn!(max_attempts = self.max_attempts, "All retry attempts failed");
        Err(Fault::Exhausted {
            attempts: self.max_attempts,
        })
    }
}

#[async_trait]
impl<O: Operation> Operation for RetryPolicy<O>
where
    O::Input: Clone,
{
    type Input = O::Input;
    type Value = O::Value;
    type Error = Fault;

    async fn invoke(&self, input: Self::Input) -> Result<Self::Value, Self::Error> {
        RetryPolicy::invoke(self, input).await
    }
}
