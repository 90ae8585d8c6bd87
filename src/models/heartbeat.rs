//! Wire types for the Alertmanager webhook payload.
//!
//! A [`Message`] is the batch POSTed by Alertmanager to a webhook receiver;
//! it carries group-level labels and annotations shared by its child
//! [`Alert`]s. Lookups on a single alert fall back to the enclosing batch,
//! which is what [`AlertView`] provides without the child owning its parent.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A batch of alerts as delivered by the Alertmanager webhook, see
/// <https://prometheus.io/docs/alerting/latest/configuration/#webhook_config>
/// for field documentation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Message {
    /// Webhook payload schema version.
    pub version: String,
    /// Opaque key identifying the alert group upstream.
    pub group_key: String,
    /// `firing` or `resolved`.
    pub status: String,
    /// Name of the receiver that routed this batch.
    pub receiver: String,
    /// Labels common to the group.
    pub group_labels: HashMap<String, String>,
    /// Labels common to every alert in the batch.
    pub common_labels: HashMap<String, String>,
    /// Annotations common to every alert in the batch.
    pub common_annotations: HashMap<String, String>,
    /// Base URL the sending Alertmanager advertises for itself.
    #[serde(rename = "externalURL")]
    pub external_url: String,
    /// The alerts themselves, in upstream order.
    pub alerts: Vec<Alert>,
}

/// A single alert, either received inside a [`Message`] or synthesised for
/// outbound delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Alert {
    /// `firing` or `resolved`.
    pub status: String,
    /// Labels of this alert only; see [`AlertView`] for merged lookup.
    pub labels: HashMap<String, String>,
    /// Annotations of this alert only.
    pub annotations: HashMap<String, String>,
    /// When the alert began firing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    /// When the alert ended (or is projected to end).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    /// URL of the entity that generated the alert.
    #[serde(rename = "generatorURL")]
    pub generator_url: String,
}

impl Alert {
    /// Returns an empty alert in the firing state, the starting point for
    /// synthesised outbound alerts.
    pub fn firing() -> Self {
        Alert { status: "firing".to_string(), ..Default::default() }
    }
}

/// A borrowed view of one alert inside its enclosing batch.
///
/// The batch owns the alerts; the view only lives long enough to answer
/// label/annotation lookups with the three-tier fallback. Callers that need
/// to keep data beyond the batch's lifetime copy the merged maps out.
#[derive(Clone, Copy)]
pub struct AlertView<'a> {
    alert: &'a Alert,
    parent: &'a Message,
}

impl<'a> AlertView<'a> {
    /// Pairs an alert with the batch it arrived in.
    pub fn new(alert: &'a Alert, parent: &'a Message) -> Self {
        AlertView { alert, parent }
    }

    /// Status of the alert itself.
    pub fn status(&self) -> &'a str {
        &self.alert.status
    }

    /// Receiver name of the enclosing batch.
    pub fn receiver(&self) -> &'a str {
        &self.parent.receiver
    }

    /// External URL advertised by the sending Alertmanager.
    pub fn external_url(&self) -> &'a str {
        &self.parent.external_url
    }

    /// Generator URL of the alert itself.
    pub fn generator_url(&self) -> &'a str {
        &self.alert.generator_url
    }

    /// Looks up a label: the alert's own labels win, then the batch's common
    /// labels, then its group labels.
    pub fn label(&self, key: &str) -> Option<&'a str> {
        self.alert
            .labels
            .get(key)
            .or_else(|| self.parent.common_labels.get(key))
            .or_else(|| self.parent.group_labels.get(key))
            .map(String::as_str)
    }

    /// Like [`label`](Self::label) but substitutes `default` when absent.
    pub fn label_or(&self, key: &str, default: &'a str) -> &'a str {
        self.label(key).unwrap_or(default)
    }

    /// Returns the full label map, merged across all three tiers with the
    /// alert's own values taking precedence.
    pub fn labels(&self) -> HashMap<String, String> {
        let mut merged = self.parent.group_labels.clone();
        merged.extend(self.parent.common_labels.clone());
        merged.extend(self.alert.labels.clone());
        merged
    }

    /// Looks up an annotation: the alert's own annotations win, then the
    /// batch's common annotations. Group-level annotations do not exist in
    /// the payload, so there is no third tier.
    pub fn annotation(&self, key: &str) -> Option<&'a str> {
        self.alert
            .annotations
            .get(key)
            .or_else(|| self.parent.common_annotations.get(key))
            .map(String::as_str)
    }

    /// Like [`annotation`](Self::annotation) but substitutes `default` when
    /// absent.
    pub fn annotation_or(&self, key: &str, default: &'a str) -> &'a str {
        self.annotation(key).unwrap_or(default)
    }

    /// Returns the merged annotation map, the alert's own values taking
    /// precedence over the batch's.
    pub fn annotations(&self) -> HashMap<String, String> {
        let mut merged = self.parent.common_annotations.clone();
        merged.extend(self.alert.annotations.clone());
        merged
    }
}
