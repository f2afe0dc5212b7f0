//! Payment document generation.
//!
//! # Data Flow
//! ```text
//! HTTP request (validated body)
//!     → resilience wrapper (circuit breaker or retry policy)
//!     → pix.rs / bank_slip.rs (assemble document)
//!     → store.rs (record payment status)
//!     → document returned to the handler
//! ```
//!
//! # Design Decisions
//! - Generators are pure except for the status-store write
//! - Every generator error is a value; the wrappers classify it
//! - Request bodies carry a `force_failure` hook so failure paths can be
//!   exercised without a genuinely failing dependency

pub mod bank_slip;
pub mod pix;
pub mod store;

use thiserror::Error;

pub use bank_slip::{BankSlipDocument, BankSlipOperation, BankSlipRequest};
pub use pix::{PixDocument, PixOperation, PixRequest};
pub use store::{PaymentMethod, PaymentRecord, PaymentStatus, PaymentStore};

/// Errors raised by the payment generators.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("failure forced by caller")]
    Forced,

    #[error("amount must be positive, got {0}")]
    InvalidAmount(f64),

    #[error("{0} must not be empty")]
    MissingField(&'static str),
}
