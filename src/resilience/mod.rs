//! Resilience control layer.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → CircuitBreaker::invoke (entry check under the circuit lock)
//!       or RetryPolicy::invoke (attempt loop, fixed delay between attempts)
//!     → Operation::invoke (runs outside any lock)
//!     → post-call state update (circuit lock again)
//!     → Outcome: success value or classified Fault
//! ```
//!
//! # Design Decisions
//! - Faults are values end-to-end; no panic crosses a wrapper boundary
//! - Each wrapper binds exactly one operation; both wrappers implement
//!   `Operation` themselves, so one can nest inside the other
//! - One circuit, and one lock, per protected operation; circuits live
//!   in an inspectable registry for the process lifetime

pub mod circuit_breaker;
pub mod registry;
pub mod retry;

use async_trait::async_trait;
use thiserror::Error;

pub use circuit_breaker::{
    Circuit, CircuitBreaker, CircuitSettings, CircuitSnapshot, CircuitState,
};
pub use registry::CircuitRegistry;
pub use retry::{RetryPolicy, RetrySettings};

/// A unit of work guarded by the resilience layer.
///
/// Side-effecting. The retry policy may invoke it several times and the
/// circuit breaker re-invokes it as a trial, so implementations are
/// assumed (not checked) to be safe to run more than once.
#[async_trait]
pub trait Operation: Send + Sync {
    type Input: Send + 'static;
    type Value: Send + 'static;
    type Error: std::fmt::Display + Send + 'static;

    async fn invoke(&self, input: Self::Input) -> Result<Self::Value, Self::Error>;
}

/// Classified failure handed to callers in place of a raw operation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    /// The operation itself failed while the circuit admitted the call.
    #[error("Internal error during processing.")]
    Transient { detail: String },

    /// The circuit is open; the operation was never invoked.
    #[error("Circuit is open. Try again in {retry_in:.1} seconds.")]
    Rejected { retry_in: f64 },

    /// The retry budget was spent without a success.
    #[error("Operation failed after {attempts} attempts.")]
    Exhausted { attempts: u32 },
}

impl Fault {
    /// HTTP status code this fault maps to at the boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Fault::Rejected { .. } => 503,
            Fault::Transient { .. } | Fault::Exhausted { .. } => 500,
        }
    }
}

/// What a wrapper returns to its caller: the operation's success value or
/// a classified fault, never a raw propagated error.
pub type Outcome<T> = Result<T, Fault>;
