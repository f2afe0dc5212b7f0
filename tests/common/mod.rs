//! Shared utilities for integration testing.

use std::net::SocketAddr;

use payment_gateway::config::GatewayConfig;
use payment_gateway::lifecycle::Shutdown;
use payment_gateway::HttpServer;

/// Spawn the gateway on an ephemeral port; returns its address and the
/// shutdown handle.
pub async fn spawn_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config);

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[allow(dead_code)]
pub fn pix_body(transaction_id: &str, force_failure: bool) -> serde_json::Value {
    serde_json::json!({
        "merchant_name": "Pedro Santana",
        "pix_key": "pedroems.147@gmail.com",
        "amount": 100.50,
        "merchant_city": "Salgueiro",
        "transaction_id": transaction_id,
        "force_failure": force_failure,
    })
}

#[allow(dead_code)]
pub fn bank_slip_body(force_failure: bool) -> serde_json::Value {
    serde_json::json!({
        "payer_name": "Maria Silva",
        "payer_document": "123.456.789-00",
        "amount": 250.0,
        "payer_address": "Rua das Flores, 42",
        "payer_neighborhood": "Centro",
        "payer_city": "Quixadá",
        "payer_state": "CE",
        "payer_zip": "63900-000",
        "force_failure": force_failure,
    })
}
