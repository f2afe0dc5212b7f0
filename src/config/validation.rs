//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (threshold and attempts at least 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the config
//! - Runs before the config is accepted into the system

use thiserror::Error;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("listener.bind_address must not be empty")]
    EmptyBindAddress,

    #[error("resilience.circuit.threshold must be at least 1")]
    ZeroThreshold,

    #[error("resilience.circuit.timeout_secs must be at least 1")]
    ZeroCircuitTimeout,

    #[error("resilience.retry.max_attempts must be at least 1")]
    ZeroMaxAttempts,

    #[error("payments.beneficiary_name must not be empty")]
    EmptyBeneficiaryName,

    #[error("payments.due_days must not be negative")]
    NegativeDueDays,
}

/// Check the whole config and return every violation.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::EmptyBindAddress);
    }
    if config.resilience.circuit.threshold == 0 {
        errors.push(ValidationError::ZeroThreshold);
    }
    if config.resilience.circuit.timeout_secs == 0 {
        errors.push(ValidationError::ZeroCircuitTimeout);
    }
    if config.resilience.retry.max_attempts == 0 {
        errors.push(ValidationError::ZeroMaxAttempts);
    }
    if config.payments.beneficiary_name.trim().is_empty() {
        errors.push(ValidationError::EmptyBeneficiaryName);
    }
    if config.payments.due_days < 0 {
        errors.push(ValidationError::NegativeDueDays);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
