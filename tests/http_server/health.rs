use crate::helpers::*;

#[tokio::test]
async fn health_endpoint_returns_ok_while_reconciler_runs() {
    let server = TestServer::new().await;

    let resp = server.get("/-/healthy").await;

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.expect("failed to read body"), "ok");

    server.cleanup();
}
