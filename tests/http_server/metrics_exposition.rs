use crate::helpers::*;

#[tokio::test]
async fn metrics_endpoint_exposes_the_core_series() {
    let server = TestServer::new().await;

    server.post_alert(heartbeat_payload("tester")).await;
    server.wait_for_instances(1).await;

    let resp = server.get("/metrics").await;
    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));

    let body = resp.text().await.unwrap();
    assert!(body.contains("prommsd_alerthook_received_total 1"));
    assert!(body.contains("prommsd_alertcheck_monitored_instances 1"));
    assert!(body.contains("prommsd_alertmanager_sent_total 0"));
    assert!(body.contains(r#"prommsd_alerthook_errors_total{type="handler"} 0"#));
    assert!(body.contains("prommsd_build_info"));

    server.cleanup();
}

#[tokio::test]
async fn instance_gauge_follows_deletion() {
    let server = TestServer::new().await;

    server.post_alert(heartbeat_payload("tester")).await;
    server.wait_for_instances(1).await;
    let (key, _) = server.registry.snapshot().into_iter().next().unwrap();

    let resp = server
        .request(reqwest::Method::DELETE, &format!("/modify?key={}", urlencode(&key)))
        .await
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body = server.get("/metrics").await.text().await.unwrap();
    assert!(body.contains("prommsd_alertcheck_monitored_instances 0"));

    server.cleanup();
}

fn urlencode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect()
}
