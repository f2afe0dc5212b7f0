//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from
//! config files, and every field has a default.

use serde::{Deserialize, Serialize};

/// Root configuration for the payment gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Resilience layer tunables.
    pub resilience: ResilienceConfig,

    /// Payment document settings (beneficiary identity, due dates).
    pub payments: PaymentsConfig,

    /// Payment store persistence.
    pub persistence: PersistenceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Resilience layer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Circuit breaker tunables.
    pub circuit: CircuitConfig,

    /// Retry policy tunables.
    pub retry: RetryConfig,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Consecutive failures that open the circuit.
    pub threshold: u32,

    /// Seconds the circuit stays open before admitting a trial call.
    pub timeout_secs: u64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            threshold: 2,
            timeout_secs: 15,
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total invocation budget, including the first attempt.
    pub max_attempts: u32,

    /// Fixed delay between attempts in seconds.
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_secs: 2,
        }
    }
}

/// Payment document configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Bank-slip beneficiary name.
    pub beneficiary_name: String,

    /// Bank-slip beneficiary document (CNPJ).
    pub beneficiary_document: String,

    /// Days from generation to the slip's due date.
    pub due_days: i64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            beneficiary_name: "Bookify LTDA".to_string(),
            beneficiary_document: "12.345.678/0001-90".to_string(),
            due_days: 7,
        }
    }
}

/// Payment store persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Path of the JSON store file; empty disables persistence.
    pub path: String,
}

impl PersistenceConfig {
    pub fn path(&self) -> Option<&str> {
        if self.path.is_empty() {
            None
        } else {
            Some(&self.path)
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
