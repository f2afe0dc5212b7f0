//! HTTP handlers and the fault-to-response mapping.

use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::payments::{BankSlipRequest, PaymentMethod, PixRequest};
use crate::resilience::{CircuitSnapshot, Fault, Outcome};

#[derive(Serialize)]
pub struct HealthStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct PaymentsSummary {
    pub total: usize,
    pub generated: usize,
    pub failed: usize,
}

/// Map a wrapper outcome to the boundary response shape.
fn outcome_response<T: Serialize>(outcome: Outcome<T>) -> Response {
    match outcome {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(fault) => fault_response(&fault),
    }
}

fn fault_response(fault: &Fault) -> Response {
    let status = StatusCode::from_u16(fault.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match fault {
        Fault::Transient { detail } => json!({
            "message": fault.to_string(),
            "error": detail,
        }),
        Fault::Rejected { .. } | Fault::Exhausted { .. } => json!({
            "message": fault.to_string(),
        }),
    };
    (status, Json(body)).into_response()
}

/// Generate a Pix payload through the circuit breaker.
pub async fn create_pix(
    State(state): State<AppState>,
    Json(request): Json<PixRequest>,
) -> Response {
    let start = Instant::now();
    let transaction_id = request.transaction_id.clone();
    let amount = request.amount;

    let outcome = state.pix.invoke(request).await;
    if matches!(outcome, Err(Fault::Transient { .. })) {
        state
            .store
            .record_failed(&transaction_id, PaymentMethod::Pix, amount);
    }

    let response = outcome_response(outcome);
    metrics::record_request("POST", "/payments/pix", response.status().as_u16(), start);
    response
}

/// Generate a bank-slip document through the retry policy.
pub async fn create_bank_slip(
    State(state): State<AppState>,
    Json(request): Json<BankSlipRequest>,
) -> Response {
    let start = Instant::now();

    let outcome = state.bank_slip.invoke(request).await;

    let response = outcome_response(outcome);
    metrics::record_request(
        "POST",
        "/payments/bank-slip",
        response.status().as_u16(),
        start,
    );
    response
}

/// Look up a stored payment record.
pub async fn get_payment(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Response {
    match state.store.get(&transaction_id) {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Payment not found." })),
        )
            .into_response(),
    }
}

/// Counts of generated and failed payment records.
pub async fn get_payments_summary(State(state): State<AppState>) -> Json<PaymentsSummary> {
    let (generated, failed) = state.store.summary();
    Json(PaymentsSummary {
        total: generated + failed,
        generated,
        failed,
    })
}

/// Point-in-time view of every registered circuit.
pub async fn get_circuits(State(state): State<AppState>) -> Json<Vec<CircuitSnapshot>> {
    Json(state.registry.snapshots())
}

pub async fn get_health() -> Json<HealthStatus> {
    Json(HealthStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}
