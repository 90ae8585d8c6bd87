//! Heartbeat identity and per-instance configuration extraction.
//!
//! A heartbeat configures its own monitoring through `msd_*` annotations;
//! everything here reads those annotations (with their defaults) and
//! produces the instance key plus a fresh [`TrackedInstance`] record.

use chrono::{DateTime, Duration, Utc};

use crate::config::CheckerSettings;
use crate::models::{AlertView, TrackedInstance};

/// Identifier labels used when a heartbeat does not name its own via
/// `msd_identifiers`.
pub(crate) const DEFAULT_IDENTIFIERS: &str = "job namespace cluster";

const DEFAULT_ALERT_NAME: &str = "NoAlertConnectivity";
const DEFAULT_OVERRIDE_LABELS: &str = "severity=critical";

/// Splits an annotation value into words, allowing lines to be commented.
///
/// Input like `"foo bar baz"` or `"foo\n#x\nbar baz"` both yield
/// `[foo, bar, baz]`: lines are trimmed, empty and `#`-prefixed lines are
/// dropped, and the remainder splits on single spaces. Duplicates and order
/// are preserved.
pub(crate) fn split_annotation(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for line in s.split('\n') {
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        tokens.extend(text.split(' ').map(str::to_string));
    }
    tokens
}

/// Builds the canonical instance key for a heartbeat: each identifier label
/// as `name="value"` (empty value when the label is absent), sorted and
/// space-joined. Heartbeats agreeing on identifiers and values collapse to
/// one tracked instance.
pub(crate) fn instance_key(view: &AlertView<'_>) -> String {
    let identifiers = view.annotation_or("msd_identifiers", DEFAULT_IDENTIFIERS);
    let mut ids: Vec<String> = split_annotation(identifiers)
        .iter()
        .map(|id| format!("{}={:?}", id, view.label_or(id, "")))
        .collect();
    ids.sort();
    ids.join(" ")
}

/// Derives the key and a fresh instance record from a heartbeat.
///
/// The record's episode-tracking fields start empty; the reconciler carries
/// them over from any previous record for the same key. Only configuration
/// and the copied label/annotation template come from the heartbeat itself.
pub(crate) fn extract(
    view: &AlertView<'_>,
    now: DateTime<Utc>,
    settings: &CheckerSettings,
) -> (String, TrackedInstance) {
    let key = instance_key(view);

    let alert_name = view.annotation_or("msd_alertname", DEFAULT_ALERT_NAME).to_string();
    let override_labels =
        split_annotation(view.annotation_or("msd_override_labels", DEFAULT_OVERRIDE_LABELS));
    // The sending Alertmanager's own URL is the best available default --
    // users really should specify multiple destinations for reliability.
    let destinations = split_annotation(view.annotation_or("msd_alertmanagers", view.external_url()));

    let activation = match view.annotation("msd_activation") {
        None => settings.default_activation,
        Some(raw) => match humantime::parse_duration(raw) {
            Ok(parsed) => Duration::from_std(parsed).unwrap_or(settings.default_activation),
            Err(err) => {
                tracing::warn!(
                    value = raw,
                    error = %err,
                    "failed to parse msd_activation, using the default window"
                );
                settings.default_activation
            }
        },
    };

    let instance = TrackedInstance {
        activate_at: now + activation,
        activated_at: None,
        resolved_at: None,
        last_sent: None,
        last_error: None,
        alert_name,
        receiver: view.receiver().to_string(),
        destinations,
        override_labels,
        last_labels: view.labels(),
        last_annotations: view.annotations(),
        generator_url: view.generator_url().to_string(),
    };

    (key, instance)
}
