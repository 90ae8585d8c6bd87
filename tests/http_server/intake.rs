use reqwest::Method;
use serde_json::json;

use crate::helpers::*;

#[tokio::test]
async fn posted_heartbeat_registers_an_instance() {
    let server = TestServer::new().await;

    let resp = server.post_alert(heartbeat_payload("tester")).await;
    assert_eq!(resp.status(), 200);

    server.wait_for_instances(1).await;
    let (key, instance) = server.registry.snapshot().into_iter().next().unwrap();
    assert!(key.contains(r#"job="tester""#));
    assert_eq!(instance.receiver, "prommsd");
    assert_eq!(instance.destinations, vec!["http://alertmanager:9093"]);

    server.cleanup();
}

#[tokio::test]
async fn repeated_heartbeats_keep_a_single_instance() {
    let server = TestServer::new().await;

    server.post_alert(heartbeat_payload("tester")).await;
    server.post_alert(heartbeat_payload("tester")).await;
    server.wait_for_instances(1).await;

    server.cleanup();
}

#[tokio::test]
async fn resolved_alerts_are_silently_discarded() {
    let server = TestServer::new().await;

    let mut payload = heartbeat_payload("tester");
    payload["alerts"][0]["status"] = json!("resolved");
    let resp = server.post_alert(payload).await;
    assert_eq!(resp.status(), 200);

    // Prove the loop processed the request before checking emptiness.
    assert_eq!(server.get("/-/healthy").await.status(), 200);
    assert_eq!(server.registry.len(), 0);

    server.cleanup();
}

#[tokio::test]
async fn head_and_options_are_empty_successes() {
    let server = TestServer::new().await;

    let resp = server.request(Method::HEAD, "/alert").await.send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = server.request(Method::OPTIONS, "/alert").await.send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().is_empty());

    server.cleanup();
}

#[tokio::test]
async fn wrong_method_is_a_client_error() {
    let server = TestServer::new().await;

    let resp = server.get("/alert").await;
    assert_eq!(resp.status(), 400);

    let metrics = server.get("/metrics").await.text().await.unwrap();
    assert!(metrics.contains(r#"prommsd_alerthook_errors_total{type="wrong_method"} 1"#));

    server.cleanup();
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let server = TestServer::new().await;

    let resp = server
        .request(Method::POST, "/alert")
        .await
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let metrics = server.get("/metrics").await.text().await.unwrap();
    assert!(metrics.contains(r#"prommsd_alerthook_errors_total{type="decode"} 1"#));

    server.cleanup();
}

#[tokio::test]
async fn every_alert_in_a_batch_is_dispatched() {
    let server = TestServer::new().await;

    let payload = json!({
        "version": "4",
        "status": "firing",
        "receiver": "prommsd",
        "externalURL": "http://alertmanager:9093",
        "alerts": [
            {"status": "firing", "labels": {"job": "one"}, "annotations": {}},
            {"status": "firing", "labels": {"job": "two"}, "annotations": {}}
        ]
    });
    let resp = server.post_alert(payload).await;
    assert_eq!(resp.status(), 200);

    server.wait_for_instances(2).await;

    server.cleanup();
}
