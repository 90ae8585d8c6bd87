use std::net::SocketAddr;
use std::sync::Arc;

use prommsd::checker::{AlertChecker, Registry};
use prommsd::config::{CheckerSettings, DEFAULT_SLACK_TEMPLATE};
use prommsd::http_client::HttpClientPool;
use prommsd::http_server::{router, ApiState};
use prommsd::metrics::AppMetrics;
use prommsd::notification::Notifier;
use reqwest::Client;
use serde_json::json;
use tokio::task;

pub struct TestServer {
    pub address: SocketAddr,
    pub registry: Arc<Registry>,
    pub client: Client,
    server_handle: task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        let metrics = Arc::new(AppMetrics::new());
        let registry = Arc::new(Registry::new(Arc::clone(&metrics)));
        let settings = CheckerSettings::default();
        let notifier = Arc::new(Notifier::new(
            Arc::new(HttpClientPool::new()),
            DEFAULT_SLACK_TEMPLATE.to_string(),
            settings.slack_send_interval,
            Arc::clone(&metrics),
        ));
        let checker = Arc::new(AlertChecker::new(
            Arc::clone(&registry),
            notifier,
            settings,
            "http://localhost:0".to_string(),
        ));
        let handle = checker.spawn();

        let state = ApiState::new(Arc::clone(&registry), handle, metrics);
        let listener =
            tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("failed to bind");
        let address = listener.local_addr().expect("failed to get address");

        let server_handle = task::spawn(async move {
            axum::serve(listener, router(state).into_make_service())
                .await
                .expect("server failed");
        });

        Self { address, registry, client: Client::new(), server_handle }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        let url = format!("http://{}{}", self.address, path);
        self.client.get(&url).send().await.expect("request failed")
    }

    pub async fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("http://{}{}", self.address, path);
        self.client.request(method, &url)
    }

    pub async fn post_alert(&self, body: serde_json::Value) -> reqwest::Response {
        let url = format!("http://{}/alert", self.address);
        self.client.post(&url).json(&body).send().await.expect("request failed")
    }

    /// The intake hand-off to the reconciler is asynchronous from the
    /// response's point of view; wait for the registry to catch up.
    pub async fn wait_for_instances(&self, expected: usize) {
        for _ in 0..100 {
            if self.registry.len() == expected {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(self.registry.len(), expected, "registry never reached the expected size");
    }

    pub fn cleanup(self) {
        self.server_handle.abort();
    }
}

/// A minimal Alertmanager webhook batch containing one heartbeat.
pub fn heartbeat_payload(job: &str) -> serde_json::Value {
    json!({
        "version": "4",
        "groupKey": "{}:{}",
        "status": "firing",
        "receiver": "prommsd",
        "groupLabels": {},
        "commonLabels": {},
        "commonAnnotations": {},
        "externalURL": "http://alertmanager:9093",
        "alerts": [{
            "status": "firing",
            "labels": {"job": job},
            "annotations": {},
            "startsAt": "2024-04-01T10:00:00Z",
            "generatorURL": "http://prometheus:9090/graph"
        }]
    })
}
