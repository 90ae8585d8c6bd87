//! Slack-style chat webhook delivery.

use std::sync::Arc;

use minijinja::Environment;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use url::Url;

use super::error::NotificationError;
use super::payload::NotificationBody;

#[derive(Serialize)]
struct SlackBody<'a> {
    username: &'a str,
    text: String,
    icon_emoji: &'a str,
}

/// Sends a rendered text message to one Slack-style incoming webhook.
pub struct SlackNotifier<'a> {
    url: Url,
    client: Arc<ClientWithMiddleware>,
    template: &'a str,
}

impl<'a> SlackNotifier<'a> {
    /// Creates a notifier rendering `template` (minijinja) over the
    /// notification body.
    pub fn new(url: Url, client: Arc<ClientWithMiddleware>, template: &'a str) -> Self {
        SlackNotifier { url, client, template }
    }

    /// Renders and POSTs the message. 200 and 202 both count as delivered.
    /// A template failure falls back to a built-in format instead of
    /// aborting the delivery.
    pub async fn notify(&self, body: &NotificationBody, resolved: bool) -> Result<(), NotificationError> {
        let text = self.render_text(body);
        let emoji = if resolved { "grey_exclamation" } else { "exclaimation" };

        let response = self
            .client
            .post(self.url.clone())
            .json(&SlackBody { username: &body.receiver, text, icon_emoji: emoji })
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::OK || status == reqwest::StatusCode::ACCEPTED {
            return Ok(());
        }
        Err(NotificationError::Response(status))
    }

    fn render_text(&self, body: &NotificationBody) -> String {
        let env = Environment::new();
        match env.render_str(self.template, body) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "failed to render slack template, using fallback text");
                format!(
                    "{}: {}, {:?}.\n{:?}\n(templating problem)",
                    body.receiver,
                    body.status,
                    body.group_labels,
                    body.alerts.first()
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::DEFAULT_SLACK_TEMPLATE;
    use crate::models::Alert;
    use crate::notification::DeliveryIntent;
    use reqwest_middleware::ClientBuilder;

    fn client() -> Arc<ClientWithMiddleware> {
        Arc::new(ClientBuilder::new(reqwest::Client::new()).build())
    }

    fn body() -> NotificationBody {
        let mut alert = Alert::firing();
        alert.labels = HashMap::from([("job".to_string(), "tester".to_string())]);
        alert.annotations = HashMap::from([("summary".to_string(), "no heartbeat".to_string())]);
        NotificationBody::from_intent(&DeliveryIntent {
            destinations: vec![],
            receiver: "team-x".to_string(),
            last_sent: None,
            resolved: false,
            group_labels: HashMap::from([("job".to_string(), "tester".to_string())]),
            alerts: vec![alert],
        })
    }

    #[test]
    fn default_template_renders_receiver_and_annotations() {
        let notifier = SlackNotifier::new(
            Url::parse("http://slack.example/hook").unwrap(),
            client(),
            DEFAULT_SLACK_TEMPLATE,
        );
        let text = notifier.render_text(&body());
        assert!(text.starts_with("team-x: "));
        assert!(text.contains("summary: no heartbeat"));
    }

    #[test]
    fn broken_template_falls_back_without_failing() {
        let notifier = SlackNotifier::new(
            Url::parse("http://slack.example/hook").unwrap(),
            client(),
            "{{ unclosed",
        );
        let text = notifier.render_text(&body());
        assert!(text.contains("(templating problem)"));
        assert!(text.contains("team-x"));
    }

    #[tokio::test]
    async fn posts_username_text_and_emoji() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "username": "team-x",
                "icon_emoji": "exclaimation",
            })))
            .with_status(200)
            .create_async()
            .await;

        let notifier = SlackNotifier::new(
            Url::parse(&format!("{}/hook", server.url())).unwrap(),
            client(),
            DEFAULT_SLACK_TEMPLATE,
        );
        notifier.notify(&body(), false).await.expect("delivery should succeed");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resolved_send_uses_grey_emoji() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "icon_emoji": "grey_exclamation",
            })))
            .with_status(200)
            .create_async()
            .await;

        let notifier = SlackNotifier::new(
            Url::parse(&format!("{}/hook", server.url())).unwrap(),
            client(),
            DEFAULT_SLACK_TEMPLATE,
        );
        notifier.notify(&body(), true).await.expect("delivery should succeed");

        mock.assert_async().await;
    }
}
