//! Circuit breaker guarding one fallible operation.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: operation assumed down, calls rejected without invoking it
//! - Half-Open: probing whether the operation recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Half-Open: next call after timeout elapsed (lazy, no timer)
//! Half-Open → Closed: trial call succeeds (failure count reset)
//! Half-Open → Open: trial call fails (threshold bypassed, timer reset)
//! ```
//!
//! # Design Decisions
//! - One circuit and one lock per protected operation, never shared
//! - Entry check and post-call update are separate critical sections;
//!   the operation call itself runs outside the lock
//! - Concurrent callers can race through the entry check into Half-Open
//!   and each run a trial; this window is accepted, not corrected
//! - A circuit with no incoming traffic stays Open indefinitely

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;

use crate::observability::metrics;
use crate::resilience::{Fault, Operation, Outcome};

/// Circuit states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Tunables for one circuit.
#[derive(Debug, Clone)]
pub struct CircuitSettings {
    /// Consecutive failures that open the circuit from Closed.
    pub threshold: u32,
    /// How long the circuit stays Open before admitting a trial call.
    pub timeout: Duration,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            threshold: 2,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Mutable circuit fields, only touched while holding the lock.
#[derive(Debug)]
struct CircuitCore {
    state: CircuitState,
    failure_count: u32,
    /// Set exactly while `state == Open`.
    opened_at: Option<Instant>,
}

/// State machine gating calls to one protected operation.
#[derive(Debug)]
pub struct Circuit {
    name: String,
    threshold: u32,
    timeout: Duration,
    core: Mutex<CircuitCore>,
}

/// Point-in-time view of a circuit, for inspection endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub threshold: u32,
    /// Seconds until a trial call is admitted; present while Open.
    pub retry_in_secs: Option<f64>,
}

impl Circuit {
    pub fn new(name: impl Into<String>, settings: CircuitSettings) -> Self {
        Self {
            name: name.into(),
            threshold: settings.threshold.max(1),
            timeout: settings.timeout,
            core: Mutex::new(CircuitCore {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry check: decide whether a call may reach the operation.
    ///
    /// While Open, rejects until `timeout` has elapsed since the circuit
    /// opened, then flips to Half-Open and admits the call as a trial.
    /// The failure count is not cleared on that flip; only a successful
    /// trial clears it. More than one caller can be admitted as a trial
    /// when calls race through this check.
    pub fn admit(&self) -> Result<(), Fault> {
        let mut core = self.lock();
        match core.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let remaining = core
                    .opened_at
                    .map(|opened| self.timeout.saturating_sub(opened.elapsed()))
                    .unwrap_or_default();
                if remaining > Duration::ZERO {
                    tracing::debug!(
                        circuit = %self.name,
                        remaining_secs = remaining.as_secs_f64(),
                        "Call rejected while open"
                    );
                    Err(Fault::Rejected {
                        retry_in: remaining.as_secs_f64(),
                    })
                } else {
                    core.state = CircuitState::HalfOpen;
                    core.opened_at = None;
                    tracing::info!(circuit = %self.name, "Circuit is now HALF-OPEN");
                    metrics::record_circuit_transition(&self.name, CircuitState::HalfOpen.as_str());
                    Ok(())
                }
            }
            CircuitState::HalfOpen => {
                tracing::debug!(circuit = %self.name, "Trial call admitted while half-open");
                Ok(())
            }
        }
    }

    /// Post-call update for a successful invocation.
    pub fn record_success(&self) {
        let mut core = self.lock();
        if core.state == CircuitState::HalfOpen {
            core.state = CircuitState::Closed;
            core.failure_count = 0;
            core.opened_at = None;
            tracing::info!(circuit = %self.name, "Trial succeeded, circuit is now CLOSED");
            metrics::record_circuit_transition(&self.name, CircuitState::Closed.as_str());
        }
    }

    /// Post-call update for a failed invocation.
    ///
    /// A failed trial reopens unconditionally; otherwise the failure
    /// counts toward the threshold.
    pub fn record_failure(&self) {
        let mut core = self.lock();
        match core.state {
            CircuitState::HalfOpen => {
                core.state = CircuitState::Open;
                core.opened_at = Some(Instant::now());
                tracing::warn!(circuit = %self.name, "Trial failed, circuit is now OPEN");
                metrics::record_circuit_transition(&self.name, CircuitState::Open.as_str());
            }
            _ => {
                core.failure_count += 1;
                tracing::debug!(
                    circuit = %self.name,
                    failures = core.failure_count,
                    threshold = self.threshold,
                    "Recording failure"
                );
                if core.failure_count >= self.threshold {
                    core.state = CircuitState::Open;
                    core.opened_at = Some(Instant::now());
                    tracing::warn!(
                        circuit = %self.name,
                        failures = core.failure_count,
                        "Circuit is now OPEN"
                    );
                    metrics::record_circuit_transition(&self.name, CircuitState::Open.as_str());
                }
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let core = self.lock();
        let retry_in_secs = match (core.state, core.opened_at) {
            (CircuitState::Open, Some(opened)) => {
                Some(self.timeout.saturating_sub(opened.elapsed()).as_secs_f64())
            }
            _ => None,
        };
        CircuitSnapshot {
            name: self.name.clone(),
            state: core.state,
            failure_count: core.failure_count,
            threshold: self.threshold,
            retry_in_secs,
        }
    }

    // The core is plain data; a poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, CircuitCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wrapper binding one operation to one circuit.
pub struct CircuitBreaker<O> {
    op: O,
    circuit: Arc<Circuit>,
}

impl<O: Operation> CircuitBreaker<O> {
    pub fn new(op: O, circuit: Arc<Circuit>) -> Self {
        Self { op, circuit }
    }

    pub fn circuit(&self) -> &Arc<Circuit> {
        &self.circuit
    }

    /// Gate one call through the circuit.
    ///
    /// The entry check and the post-call update each take the circuit
    /// lock; the operation itself runs without it.
    pub async fn invoke(&self, input: O::Input) -> Outcome<O::Value> {
        self.circuit.admit()?;
        match self.op.invoke(input).await {
            Ok(value) => {
                self.circuit.record_success();
                Ok(value)
            }
            Err(err) => {
                self.circuit.record_failure();
                Err(Fault::Transient {
                    detail: err.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl<O: Operation> Operation for CircuitBreaker<O> {
    type Input = O::Input;
    type Value = O::Value;
    type Error = Fault;

    async fn invoke(&self, input: Self::Input) -> Result<Self::Value, Self::Error> {
        CircuitBreaker::invoke(self, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Operation whose failure mode can be flipped from the outside.
    struct FlakyOp {
        calls: Arc<AtomicU32>,
        failing: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Operation for FlakyOp {
        type Input = ();
        type Value = u32;
        type Error = String;

        async fn invoke(&self, _input: ()) -> Result<u32, String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.failing.load(Ordering::SeqCst) {
                Err(format!("call {call} failed"))
            } else {
                Ok(call)
            }
        }
    }

    fn flaky_breaker(
        settings: CircuitSettings,
    ) -> (CircuitBreaker<FlakyOp>, Arc<AtomicU32>, Arc<AtomicBool>) {
        let calls = Arc::new(AtomicU32::new(0));
        let failing = Arc::new(AtomicBool::new(false));
        let op = FlakyOp {
            calls: calls.clone(),
            failing: failing.clone(),
        };
        let circuit = Arc::new(Circuit::new("test", settings));
        (CircuitBreaker::new(op, circuit), calls, failing)
    }

    #[tokio::test]
    async fn threshold_failures_open_the_circuit() {
        let (breaker, _, failing) = flaky_breaker(CircuitSettings {
            threshold: 2,
            timeout: Duration::from_secs(15),
        });
        failing.store(true, Ordering::SeqCst);

        for _ in 0..2 {
            let outcome = breaker.invoke(()).await;
            assert!(matches!(outcome, Err(Fault::Transient { .. })));
        }

        assert_eq!(breaker.circuit().state(), CircuitState::Open);
        assert_eq!(breaker.circuit().failure_count(), 2);
    }

    #[tokio::test]
    async fn single_failure_below_threshold_stays_closed() {
        let (breaker, _, failing) = flaky_breaker(CircuitSettings::default());
        failing.store(true, Ordering::SeqCst);

        let _ = breaker.invoke(()).await;

        assert_eq!(breaker.circuit().state(), CircuitState::Closed);
        assert_eq!(breaker.circuit().failure_count(), 1);
    }

    #[tokio::test]
    async fn open_circuit_rejects_without_invoking() {
        let (breaker, calls, failing) = flaky_breaker(CircuitSettings {
            threshold: 2,
            timeout: Duration::from_secs(15),
        });
        failing.store(true, Ordering::SeqCst);
        let _ = breaker.invoke(()).await;
        let _ = breaker.invoke(()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        failing.store(false, Ordering::SeqCst);
        let outcome = breaker.invoke(()).await;

        match outcome {
            Err(Fault::Rejected { retry_in }) => {
                assert!(retry_in > 0.0 && retry_in <= 15.0);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        // The operation was never reached.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn successful_trial_closes_and_resets() {
        let (breaker, _, failing) = flaky_breaker(CircuitSettings {
            threshold: 2,
            timeout: Duration::from_millis(20),
        });
        failing.store(true, Ordering::SeqCst);
        let _ = breaker.invoke(()).await;
        let _ = breaker.invoke(()).await;
        assert_eq!(breaker.circuit().state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(40)).await;
        failing.store(false, Ordering::SeqCst);

        let outcome = breaker.invoke(()).await;
        assert!(outcome.is_ok());
        assert_eq!(breaker.circuit().state(), CircuitState::Closed);
        assert_eq!(breaker.circuit().failure_count(), 0);
    }

    #[tokio::test]
    async fn failed_trial_reopens_with_fresh_timer() {
        let (breaker, _, failing) = flaky_breaker(CircuitSettings {
            threshold: 2,
            timeout: Duration::from_millis(20),
        });
        failing.store(true, Ordering::SeqCst);
        let _ = breaker.invoke(()).await;
        let _ = breaker.invoke(()).await;

        tokio::time::sleep(Duration::from_millis(40)).await;

        // The trial fails and the circuit reopens regardless of threshold.
        let outcome = breaker.invoke(()).await;
        assert!(matches!(outcome, Err(Fault::Transient { .. })));
        assert_eq!(breaker.circuit().state(), CircuitState::Open);

        // Fresh timer: an immediate follow-up call is rejected again.
        let outcome = breaker.invoke(()).await;
        assert!(matches!(outcome, Err(Fault::Rejected { .. })));
    }

    #[tokio::test]
    async fn opened_at_tracks_open_state_exactly() {
        let (breaker, _, failing) = flaky_breaker(CircuitSettings {
            threshold: 1,
            timeout: Duration::from_millis(20),
        });

        // Closed: no remaining-time field.
        assert!(breaker.circuit().snapshot().retry_in_secs.is_none());

        failing.store(true, Ordering::SeqCst);
        let _ = breaker.invoke(()).await;
        let snapshot = breaker.circuit().snapshot();
        assert_eq!(snapshot.state, CircuitState::Open);
        assert!(snapshot.retry_in_secs.is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        failing.store(false, Ordering::SeqCst);
        let _ = breaker.invoke(()).await;
        let snapshot = breaker.circuit().snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert!(snapshot.retry_in_secs.is_none());
    }
}
