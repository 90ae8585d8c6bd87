use reqwest::Method;

use crate::helpers::*;

#[tokio::test]
async fn status_page_lists_tracked_instances() {
    let server = TestServer::new().await;

    server.post_alert(heartbeat_payload("tester")).await;
    server.wait_for_instances(1).await;

    let resp = server.get("/").await;
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Monitoring 1 instances."));
    assert!(html.contains("job=&quot;tester&quot;"));
    assert!(html.contains("http://prometheus:9090/graph"));

    server.cleanup();
}

#[tokio::test]
async fn status_page_renders_when_empty() {
    let server = TestServer::new().await;

    let resp = server.get("/").await;
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("Monitoring 0 instances."));

    server.cleanup();
}

#[tokio::test]
async fn delete_removes_exactly_the_named_key() {
    let server = TestServer::new().await;

    server.post_alert(heartbeat_payload("keep")).await;
    server.post_alert(heartbeat_payload("drop")).await;
    server.wait_for_instances(2).await;

    let key = server
        .registry
        .snapshot()
        .into_iter()
        .map(|(key, _)| key)
        .find(|key| key.contains("drop"))
        .unwrap();

    let resp = server
        .request(Method::DELETE, "/modify")
        .await
        .query(&[("key", key.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let remaining = server.registry.snapshot();
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].0.contains("keep"));

    server.cleanup();
}

#[tokio::test]
async fn delete_of_unknown_key_is_a_client_error() {
    let server = TestServer::new().await;

    let resp = server
        .request(Method::DELETE, "/modify")
        .await
        .query(&[("key", "nope")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    server.cleanup();
}

#[tokio::test]
async fn modify_requires_delete_and_a_key() {
    let server = TestServer::new().await;

    server.post_alert(heartbeat_payload("tester")).await;
    server.wait_for_instances(1).await;
    let (key, _) = server.registry.snapshot().into_iter().next().unwrap();

    // Wrong method.
    let resp = server
        .request(Method::GET, "/modify")
        .await
        .query(&[("key", key.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Missing key.
    let resp = server.request(Method::DELETE, "/modify").await.send().await.unwrap();
    assert_eq!(resp.status(), 400);

    // The instance is untouched by the failed attempts.
    assert_eq!(server.registry.len(), 1);

    server.cleanup();
}
