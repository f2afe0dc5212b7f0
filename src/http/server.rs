//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the Axum router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind the resilience wrappers to the payment operations
//! - Serve with graceful shutdown and save the store afterwards

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::handlers;
use crate::payments::{BankSlipOperation, PaymentStore, PixOperation};
use crate::resilience::{
    CircuitBreaker, CircuitRegistry, CircuitSettings, RetryPolicy, RetrySettings,
};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pix: Arc<CircuitBreaker<PixOperation>>,
    pub bank_slip: Arc<RetryPolicy<BankSlipOperation>>,
    pub registry: Arc<CircuitRegistry>,
    pub store: Arc<PaymentStore>,
}

/// HTTP server for the payment gateway.
pub struct HttpServer {
    router: Router,
    store: Arc<PaymentStore>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let store = Arc::new(match config.persistence.path() {
            Some(path) => PaymentStore::load_from_file(path).unwrap_or_else(|e| {
                tracing::warn!(error = %e, path, "Could not load payment store, starting empty");
                PaymentStore::new(Some(path.to_string()))
            }),
            None => PaymentStore::new(None),
        });

        // One circuit per protected operation, registered for the
        // process lifetime.
        let registry = Arc::new(CircuitRegistry::new());
        let pix_circuit = registry.register(
            "pix",
            CircuitSettings {
                threshold: config.resilience.circuit.threshold,
                timeout: Duration::from_secs(config.resilience.circuit.timeout_secs),
            },
        );

        let pix = Arc::new(CircuitBreaker::new(
            PixOperation::new(store.clone()),
            pix_circuit,
        ));
        let bank_slip = Arc::new(RetryPolicy::new(
            BankSlipOperation::new(store.clone(), &config.payments),
            RetrySettings {
                max_attempts: config.resilience.retry.max_attempts,
                delay: Duration::from_secs(config.resilience.retry.delay_secs),
            },
        ));

        let state = AppState {
            pix,
            bank_slip,
            registry,
            store: store.clone(),
        };

        let router = Self::build_router(&config, state);
        Self { router, store }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/payments/pix", post(handlers::create_pix))
            .route("/payments/bank-slip", post(handlers::create_bank_slip))
            .route("/payments/{transaction_id}", get(handlers::get_payment))
            .route("/payments", get(handlers::get_payments_summary))
            .route("/circuits", get(handlers::get_circuits))
            .route("/health", get(handlers::get_health))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        if let Err(e) = self.store.save_to_file() {
            tracing::warn!(error = %e, "Failed to save payment store on shutdown");
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
