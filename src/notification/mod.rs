//! Outbound notification fan-out.
//!
//! A [`DeliveryIntent`] names destination URLs; each URL selects one of a
//! closed set of delivery kinds via an optional `kind+` scheme prefix
//! (`am+`, `webhook+`, `slack+`; no prefix means `am`). Each kind owns its
//! wire format, request deadline, success predicate and rate policy, so
//! adding a kind is a local change here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

pub mod error;
pub mod payload;
mod alertmanager;
mod slack;
mod webhook;

use crate::http_client::HttpClientPool;
use crate::metrics::AppMetrics;
use crate::models::Alert;
use crate::NowFn;
use alertmanager::AlertmanagerClient;
use error::NotificationError;
use payload::NotificationBody;
use slack::SlackNotifier;
use webhook::WebhookNotifier;

/// Total-request deadline for Alertmanager API calls.
const ALERTMANAGER_DEADLINE: Duration = Duration::from_secs(20);
/// Total-request deadline for webhook and Slack calls.
const WEBHOOK_DEADLINE: Duration = Duration::from_secs(60);

/// One reconciliation decision, ready for delivery to every destination of
/// an instance.
#[derive(Debug, Clone)]
pub struct DeliveryIntent {
    /// Destination URLs, optionally `kind+` prefixed.
    pub destinations: Vec<String>,
    /// Receiver name carried over from the heartbeat's batch.
    pub receiver: String,
    /// The instance's `last_sent` at the moment the intent was built, for
    /// per-kind rate limiting.
    pub last_sent: Option<DateTime<Utc>>,
    /// Whether this is a resolve rather than a firing notification.
    pub resolved: bool,
    /// Identifier labels of the instance, post-override.
    pub group_labels: HashMap<String, String>,
    /// The synthetic alert, in a one-element list.
    pub alerts: Vec<Alert>,
}

/// What one fan-out attempt achieved across an intent's destinations.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Number of destinations that accepted the notification.
    pub delivered: usize,
    /// The last error encountered, if any.
    pub last_error: Option<NotificationError>,
}

impl DispatchOutcome {
    /// Whether the attempt counts as forward progress: anything was
    /// delivered, or there was nothing to fail (a rate-suppressed send is
    /// progress too). Progress is what advances an instance's `last_sent` —
    /// the goal is liveness, not perfect delivery.
    pub fn made_progress(&self) -> bool {
        self.delivered > 0 || self.last_error.is_none()
    }
}

/// A destination URL resolved to its delivery kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The Alertmanager v1 alerts API.
    Alertmanager(Url),
    /// A Prometheus-webhook-compatible endpoint.
    Webhook(Url),
    /// A Slack-style incoming webhook.
    Slack(Url),
}

/// Why a destination URL could not be resolved to a kind.
#[derive(Debug, Error)]
pub enum DestinationError {
    /// The URL itself did not parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// The `kind+` prefix named an unsupported kind.
    #[error("unknown alert delivery kind {kind}")]
    UnknownKind {
        /// The unrecognised prefix.
        kind: String,
    },
}

impl Destination {
    /// Parses a destination URL, honouring a `kind+` scheme prefix. A URL
    /// without a prefix is an Alertmanager destination.
    pub fn parse(raw: &str) -> Result<Self, DestinationError> {
        let url = Url::parse(raw)?;
        let Some((kind, _)) = url.scheme().split_once('+') else {
            return Ok(Destination::Alertmanager(url));
        };

        // Re-parse rather than set_scheme: the url crate refuses some
        // scheme rewrites (e.g. non-special to http).
        let inner = Url::parse(&raw[kind.len() + 1..])?;
        match kind {
            "am" => Ok(Destination::Alertmanager(inner)),
            "webhook" => Ok(Destination::Webhook(inner)),
            "slack" => Ok(Destination::Slack(inner)),
            other => Err(DestinationError::UnknownKind { kind: other.to_string() }),
        }
    }
}

/// Fans a [`DeliveryIntent`] out to its destinations.
pub struct Notifier {
    pool: Arc<HttpClientPool>,
    slack_template: String,
    slack_send_interval: chrono::Duration,
    metrics: Arc<AppMetrics>,
    now: NowFn,
}

impl Notifier {
    /// Creates a notifier.
    pub fn new(
        pool: Arc<HttpClientPool>,
        slack_template: String,
        slack_send_interval: chrono::Duration,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Notifier { pool, slack_template, slack_send_interval, metrics, now: Arc::new(Utc::now) }
    }

    /// Replaces the wall clock, for tests driving fake time.
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn with_now(mut self, now: NowFn) -> Self {
        self.now = now;
        self
    }

    /// Attempts delivery to every destination in the intent. Per-destination
    /// failures are logged and the last one is reported in the outcome
    /// alongside the number of successful deliveries.
    pub async fn dispatch(&self, intent: &DeliveryIntent) -> DispatchOutcome {
        let what = if intent.resolved { "resolved" } else { "alert" };
        let mut outcome = DispatchOutcome { delivered: 0, last_error: None };

        for raw in &intent.destinations {
            let destination = match Destination::parse(raw) {
                Ok(destination) => destination,
                Err(DestinationError::Url(err)) => {
                    tracing::warn!(url = %raw, error = %err, "unable to parse alert destination URL");
                    continue;
                }
                Err(DestinationError::UnknownKind { kind }) => {
                    let err = NotificationError::UnknownKind { kind, url: raw.clone() };
                    tracing::error!(error = %err, "cannot deliver notification");
                    outcome.last_error = Some(err);
                    continue;
                }
            };

            let result = match destination {
                Destination::Alertmanager(url) => self.send_alertmanager(url, intent).await,
                Destination::Webhook(url) => self.send_webhook(url, intent).await,
                Destination::Slack(url) => {
                    if !self.slack_send_due(intent.last_sent) {
                        // Avoid repeating chat notifications frequently. This
                        // may mean resolves aren't always sent, but that is
                        // better than a noisy channel.
                        tracing::debug!(url = %raw, "suppressing slack notification inside its send interval");
                        continue;
                    }
                    self.send_slack(url, intent).await
                }
            };

            match result {
                Ok(()) => {
                    tracing::info!(url = %raw, "sent {what}");
                    outcome.delivered += 1;
                }
                Err(err) => {
                    tracing::error!(url = %raw, error = %err, "error sending {what}");
                    outcome.last_error = Some(err);
                }
            }
        }

        outcome
    }

    async fn send_alertmanager(&self, url: Url, intent: &DeliveryIntent) -> Result<(), NotificationError> {
        let client = self.pool.get_or_create(ALERTMANAGER_DEADLINE).await?;
        AlertmanagerClient::new(url, client, Arc::clone(&self.metrics)).send_alerts(&intent.alerts).await
    }

    async fn send_webhook(&self, url: Url, intent: &DeliveryIntent) -> Result<(), NotificationError> {
        let client = self.pool.get_or_create(WEBHOOK_DEADLINE).await?;
        WebhookNotifier::new(url, client).notify(&NotificationBody::from_intent(intent)).await
    }

    async fn send_slack(&self, url: Url, intent: &DeliveryIntent) -> Result<(), NotificationError> {
        let client = self.pool.get_or_create(WEBHOOK_DEADLINE).await?;
        SlackNotifier::new(url, client, &self.slack_template)
            .notify(&NotificationBody::from_intent(intent), intent.resolved)
            .await
    }

    fn slack_send_due(&self, last_sent: Option<DateTime<Utc>>) -> bool {
        match last_sent {
            None => true,
            Some(sent) => (self.now)() > sent + self.slack_send_interval,
        }
    }
}
