//! Generic webhook delivery.

use std::sync::Arc;

use reqwest_middleware::ClientWithMiddleware;
use url::Url;

use super::error::NotificationError;
use super::payload::NotificationBody;

/// Sends the Prometheus-webhook-compatible body to one endpoint.
pub struct WebhookNotifier {
    url: Url,
    client: Arc<ClientWithMiddleware>,
}

impl WebhookNotifier {
    /// Creates a notifier for the given endpoint.
    pub fn new(url: Url, client: Arc<ClientWithMiddleware>) -> Self {
        WebhookNotifier { url, client }
    }

    /// POSTs the body as JSON. 200 and 202 both count as delivered.
    pub async fn notify(&self, body: &NotificationBody) -> Result<(), NotificationError> {
        let response = self.client.post(self.url.clone()).json(body).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::OK || status == reqwest::StatusCode::ACCEPTED {
            return Ok(());
        }
        Err(NotificationError::Response(status))
    }
}
