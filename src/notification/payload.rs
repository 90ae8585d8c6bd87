//! The shared notification body for webhook-shaped destinations.

use std::collections::HashMap;

use serde::Serialize;

use super::DeliveryIntent;
use crate::models::Alert;

/// Body sent JSON-encoded to `webhook` destinations, compatible with
/// <https://prometheus.io/docs/alerting/latest/configuration/#webhook_config>.
/// Also the template context for Slack text rendering.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationBody {
    /// Payload schema version, always `"4"`.
    pub version: String,
    /// `firing` or `resolved`.
    pub status: String,
    /// Receiver name carried over from the heartbeat's batch.
    pub receiver: String,
    /// Identifier labels of the instance, post-override.
    pub group_labels: HashMap<String, String>,
    /// Labels of the sole synthetic alert.
    pub common_labels: HashMap<String, String>,
    /// Annotations of the sole synthetic alert.
    pub common_annotations: HashMap<String, String>,
    /// The synthetic alert, in a one-element list.
    pub alerts: Vec<Alert>,
}

impl NotificationBody {
    /// Builds the body for a delivery intent.
    pub fn from_intent(intent: &DeliveryIntent) -> Self {
        let status = if intent.resolved { "resolved" } else { "firing" };
        let first = intent.alerts.first();
        NotificationBody {
            version: "4".to_string(),
            status: status.to_string(),
            receiver: intent.receiver.clone(),
            group_labels: intent.group_labels.clone(),
            common_labels: first.map(|a| a.labels.clone()).unwrap_or_default(),
            common_annotations: first.map(|a| a.annotations.clone()).unwrap_or_default(),
            alerts: intent.alerts.clone(),
        }
    }
}
