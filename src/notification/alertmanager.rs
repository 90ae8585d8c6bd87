//! A very small Alertmanager API client.

use std::sync::Arc;

use reqwest_middleware::ClientWithMiddleware;
use url::Url;

use super::error::NotificationError;
use crate::metrics::{AppMetrics, ErrorTypeLabels};
use crate::models::Alert;

/// Client for posting alerts to one Alertmanager instance.
pub struct AlertmanagerClient {
    base_url: Url,
    client: Arc<ClientWithMiddleware>,
    metrics: Arc<AppMetrics>,
}

impl AlertmanagerClient {
    /// Creates a client for the given base URL. A URL without a path (or
    /// with just `/`) is pointed at the v1 alerts endpoint.
    pub fn new(mut base_url: Url, client: Arc<ClientWithMiddleware>, metrics: Arc<AppMetrics>) -> Self {
        if base_url.path().is_empty() || base_url.path() == "/" {
            base_url.set_path("/api/v1/alerts");
        }
        AlertmanagerClient { base_url, client, metrics }
    }

    /// POSTs the alerts as a JSON array. Only a 200 counts as delivered.
    pub async fn send_alerts(&self, alerts: &[Alert]) -> Result<(), NotificationError> {
        self.metrics.alertmanager_sent.inc();

        let body = serde_json::to_vec(alerts).map_err(|e| {
            self.metrics.alertmanager_errors.get_or_create(&ErrorTypeLabels::new("json_encode")).inc();
            NotificationError::Encode(e)
        })?;

        let request = self
            .client
            .post(self.base_url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .build()
            .map_err(|e| {
                self.metrics
                    .alertmanager_errors
                    .get_or_create(&ErrorTypeLabels::new("make_request"))
                    .inc();
                NotificationError::Request(reqwest_middleware::Error::Reqwest(e))
            })?;

        let response = self.client.execute(request).await.map_err(|e| {
            self.metrics.alertmanager_errors.get_or_create(&ErrorTypeLabels::new("http_send")).inc();
            NotificationError::Request(e)
        })?;

        if response.status() == reqwest::StatusCode::OK {
            return Ok(());
        }
        self.metrics.alertmanager_errors.get_or_create(&ErrorTypeLabels::new("http_response")).inc();
        Err(NotificationError::Response(response.status()))
    }
}
