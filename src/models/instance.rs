//! The per-instance state record tracked between heartbeats.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Everything the service remembers about one heartbeat source.
///
/// A record is replaced wholesale on every heartbeat; the reconciler carries
/// the episode-tracking fields (`activated_at`, `resolved_at`, `last_sent`,
/// `last_error`) over from the previous record. `None` in the optional
/// timestamps means "never happened".
#[derive(Debug, Clone)]
pub struct TrackedInstance {
    /// When the next expected heartbeat becomes overdue. Rolled forward to
    /// `now + activation window` on every heartbeat.
    pub activate_at: DateTime<Utc>,
    /// When the current firing episode first produced a notification.
    pub activated_at: Option<DateTime<Utc>>,
    /// When the most recent firing episode ended.
    pub resolved_at: Option<DateTime<Utc>>,
    /// When the most recent outbound notification (any channel) went out.
    pub last_sent: Option<DateTime<Utc>>,
    /// Last delivery error, surfaced on the status page.
    pub last_error: Option<String>,

    /// Alertname to stamp on outbound alerts.
    pub alert_name: String,
    /// Receiver name of the batch the heartbeat arrived in.
    pub receiver: String,
    /// Destination URLs, optionally `kind+` prefixed.
    pub destinations: Vec<String>,
    /// `k=v` label overrides applied to outbound alerts.
    pub override_labels: Vec<String>,

    /// Merged labels of the most recent heartbeat, the template for outbound
    /// alert labels. Copied out of the batch so it is not retained.
    pub last_labels: HashMap<String, String>,
    /// Merged annotations of the most recent heartbeat.
    pub last_annotations: HashMap<String, String>,
    /// Generator URL of the heartbeat itself (the upstream graph link).
    pub generator_url: String,
}

impl TrackedInstance {
    /// True once the activation deadline has passed, i.e. the heartbeat is
    /// overdue and the instance is in a firing episode.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now > self.activate_at
    }
}
