//! Payment endpoint behavior through the HTTP boundary.

use payment_gateway::config::GatewayConfig;

mod common;

#[tokio::test]
async fn pix_success_returns_payload_and_records_status() {
    let (addr, shutdown) = common::spawn_gateway(GatewayConfig::default()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{addr}/payments/pix"))
        .json(&common::pix_body("txid_001", false))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let document: serde_json::Value = res.json().await.unwrap();
    assert_eq!(document["transaction_id"], "TXID001");
    let payload = document["payload"].as_str().unwrap();
    assert!(payload.starts_with("000201"));
    assert!(payload.contains("br.gov.bcb.pix"));

    let res = client
        .get(format!("http://{addr}/payments/TXID001"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["method"], "pix");
    assert_eq!(record["status"], "generated");

    shutdown.trigger();
}

#[tokio::test]
async fn invalid_amount_maps_to_transient_fault() {
    let (addr, shutdown) = common::spawn_gateway(GatewayConfig::default()).await;
    let client = common::client();

    let mut body = common::pix_body("txneg", false);
    body["amount"] = serde_json::json!(-10.0);
    let res = client
        .post(format!("http://{addr}/payments/pix"))
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Internal error during processing.");
    assert!(body["error"].as_str().unwrap().contains("amount"));

    shutdown.trigger();
}

#[tokio::test]
async fn unknown_payment_is_not_found() {
    let (addr, shutdown) = common::spawn_gateway(GatewayConfig::default()).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/payments/nope"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Payment not found.");

    shutdown.trigger();
}

#[tokio::test]
async fn health_and_circuits_endpoints_respond() {
    let (addr, shutdown) = common::spawn_gateway(GatewayConfig::default()).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "operational");

    let res = client
        .get(format!("http://{addr}/circuits"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let circuits: serde_json::Value = res.json().await.unwrap();
    assert_eq!(circuits[0]["name"], "pix");
    assert_eq!(circuits[0]["state"], "closed");
    assert_eq!(circuits[0]["threshold"], 2);

    shutdown.trigger();
}

#[tokio::test]
async fn summary_counts_generated_and_failed_records() {
    let mut config = GatewayConfig::default();
    config.resilience.circuit.threshold = 5;
    let (addr, shutdown) = common::spawn_gateway(config).await;
    let client = common::client();

    let res = client
        .post(format!("http://{addr}/payments/pix"))
        .json(&common::pix_body("txgood", false))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let res = client
        .post(format!("http://{addr}/payments/pix"))
        .json(&common::pix_body("txbad", true))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);

    let res = client
        .get(format!("http://{addr}/payments"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let summary: serde_json::Value = res.json().await.unwrap();
    assert_eq!(summary["generated"], 1);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["total"], 2);

    shutdown.trigger();
}

#[tokio::test]
async fn store_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payments.json");

    let mut config = GatewayConfig::default();
    config.persistence.path = path.to_str().unwrap().to_string();
    let (addr, shutdown) = common::spawn_gateway(config.clone()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{addr}/payments/pix"))
        .json(&common::pix_body("persisted", false))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // Graceful shutdown saves the store.
    shutdown.trigger();
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let (addr, shutdown) = common::spawn_gateway(config).await;
    let res = client
        .get(format!("http://{addr}/payments/PERSISTED"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["status"], "generated");

    shutdown.trigger();
}
