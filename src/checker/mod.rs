//! The reconciliation engine.
//!
//! One long-lived task owns all registry mutation. It multiplexes three
//! event sources: heartbeats handed over synchronously by the intake
//! handler, a fixed 5 s tick that computes activation/resolve/expiry
//! transitions, and a health-probe channel whose round-trip proves the loop
//! is alive. Deliveries decided on a tick fan out one task per instance and
//! are joined before the loop continues, so ingest order per key is never
//! reordered around a tick.

mod annotations;
mod registry;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

pub use registry::Registry;

use crate::config::CheckerSettings;
use crate::models::{Alert, AlertView, TrackedInstance};
use crate::notification::error::NotificationError;
use crate::notification::{DeliveryIntent, DispatchOutcome, Notifier};
use crate::NowFn;

/// Upper bound on one instance's delivery fan-out within a tick.
const DELIVERY_DEADLINE: std::time::Duration = std::time::Duration::from_secs(60);

const ANNOTATION_PREFIX: &str = "msda_";

/// Errors surfaced to the intake handler.
#[derive(Debug, Error)]
pub enum CheckerError {
    /// The reconciler task is gone; nothing can accept heartbeats.
    #[error("reconciler is not running")]
    Stopped,
}

struct HeartbeatUpdate {
    key: String,
    instance: TrackedInstance,
}

/// The reconciler. One instance per process; see [`AlertChecker::spawn`].
pub struct AlertChecker {
    registry: Arc<Registry>,
    notifier: Arc<Notifier>,
    settings: CheckerSettings,
    external_url: String,
    now: NowFn,
}

/// Cheap handle for talking to a running reconciler from request handlers.
#[derive(Clone)]
pub struct CheckerHandle {
    ingest_tx: mpsc::Sender<HeartbeatUpdate>,
    health_tx: mpsc::Sender<oneshot::Sender<()>>,
    settings: CheckerSettings,
    now: NowFn,
}

impl CheckerHandle {
    /// Receives a single heartbeat from the intake endpoint.
    ///
    /// Heartbeats whose status is `resolved` are dropped here: the service
    /// only cares about its own activation timeout, and upstream is expected
    /// to configure `send_resolved: false` anyway. The send to the
    /// reconciler is synchronous, which gives the intake natural
    /// back-pressure and makes the health probe meaningful.
    pub async fn handle_heartbeat(&self, view: AlertView<'_>) -> Result<(), CheckerError> {
        if view.status() == "resolved" {
            return Ok(());
        }
        let (key, instance) = annotations::extract(&view, (self.now)(), &self.settings);
        self.ingest_tx
            .send(HeartbeatUpdate { key, instance })
            .await
            .map_err(|_| CheckerError::Stopped)
    }

    /// Round-trips a probe through the reconciler loop. Returns `false` only
    /// when the loop has terminated; a wedged loop leaves the caller waiting
    /// so its own request timeout fires.
    pub async fn healthy(&self) -> bool {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.health_tx.send(ack_tx).await.is_err() {
            return false;
        }
        ack_rx.await.is_ok()
    }
}

impl AlertChecker {
    /// Creates a reconciler over the given registry and notifier.
    /// `external_url` is stamped on outbound alerts as their generator URL.
    pub fn new(
        registry: Arc<Registry>,
        notifier: Arc<Notifier>,
        settings: CheckerSettings,
        external_url: String,
    ) -> Self {
        AlertChecker { registry, notifier, settings, external_url, now: Arc::new(Utc::now) }
    }

    /// Replaces the wall clock, for tests driving fake time.
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn with_now(mut self, now: NowFn) -> Self {
        self.now = now;
        self
    }

    /// Starts the reconciler task and returns the handle request handlers
    /// use to reach it.
    pub fn spawn(self: Arc<Self>) -> CheckerHandle {
        let (ingest_tx, ingest_rx) = mpsc::channel(1);
        let (health_tx, health_rx) = mpsc::channel(1);
        let handle = CheckerHandle {
            ingest_tx,
            health_tx,
            settings: self.settings.clone(),
            now: Arc::clone(&self.now),
        };
        tokio::spawn(self.run(ingest_rx, health_rx));
        handle
    }

    async fn run(
        self: Arc<Self>,
        mut ingest_rx: mpsc::Receiver<HeartbeatUpdate>,
        mut health_rx: mpsc::Receiver<oneshot::Sender<()>>,
    ) {
        let mut tick = tokio::time::interval(self.settings.tick_period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let now = (self.now)();
                    self.check_monitored(now).await;
                }
                Some(update) = ingest_rx.recv() => {
                    self.apply_heartbeat(update.key, update.instance);
                }
                Some(ack) = health_rx.recv() => {
                    // The probe only needs the round-trip; an aborted waiter
                    // is fine.
                    let _ = ack.send(());
                }
            }
        }
    }

    /// Inserts or replaces one instance record. Must stay fast: it runs on
    /// the reconciler task between ticks.
    fn apply_heartbeat(&self, key: String, mut instance: TrackedInstance) {
        let now = (self.now)();
        let mut entries = self.registry.write();
        match entries.get(&key) {
            None => {
                tracing::info!(
                    key = %key,
                    activate_at = %instance.activate_at,
                    destinations = ?instance.destinations,
                    "new instance"
                );
            }
            Some(previous) => {
                // A notification went out after the last activation deadline
                // iff the instance was firing; a fresh heartbeat then means
                // the episode just resolved.
                if previous.last_sent.is_some_and(|sent| sent > previous.activate_at) {
                    instance.resolved_at = Some(now);
                    tracing::info!(key = %key, "alert resolved for instance");
                } else {
                    instance.resolved_at = previous.resolved_at;
                }
                instance.activated_at = previous.activated_at;
                instance.last_sent = previous.last_sent;
                instance.last_error = previous.last_error.clone();
            }
        }
        entries.insert(key, instance);
        let len = entries.len();
        drop(entries);
        self.registry.sync_gauge(len);
    }

    /// One reconciliation pass: decide deliveries, expire stale entries,
    /// fan the deliveries out and record their outcomes.
    async fn check_monitored(&self, now: DateTime<Utc>) {
        let mut to_alert: Vec<(String, DeliveryIntent)> = Vec::new();
        {
            let mut entries = self.registry.write();
            let mut expired = Vec::new();
            for (key, instance) in entries.iter_mut() {
                let active = now > instance.activate_at;
                let send_resolved = instance
                    .resolved_at
                    .is_some_and(|resolved| now < resolved + self.settings.resolve_repeat);
                if !(active || send_resolved) {
                    continue;
                }

                if instance.last_sent.is_none_or(|sent| now > sent + self.settings.send_interval) {
                    tracing::debug!(key = %key, active, send_resolved, "notification due");
                    // A fresh firing episode: the deadline moved past the
                    // last recorded activation.
                    if active
                        && instance.activated_at.is_none_or(|at| instance.activate_at > at)
                    {
                        instance.activated_at = Some(now);
                    }
                    to_alert.push((key.clone(), self.build_intent(now, instance)));
                }

                // Expiry is decided after the delivery decision so a dying
                // instance still gets its final notification this pass.
                if now > instance.activate_at + self.settings.expiry_window {
                    expired.push(key.clone());
                }
            }
            if !expired.is_empty() {
                for key in &expired {
                    entries.remove(key);
                    tracing::info!(key = %key, "instance expired");
                }
                let len = entries.len();
                drop(entries);
                self.registry.sync_gauge(len);
            }
        }

        if to_alert.is_empty() {
            return;
        }

        // One worker per instance; workers never share an entry, so the only
        // synchronisation needed is the registry lock around the write-back.
        let mut deliveries = JoinSet::new();
        for (key, intent) in to_alert {
            let notifier = Arc::clone(&self.notifier);
            deliveries.spawn(async move {
                let outcome =
                    match tokio::time::timeout(DELIVERY_DEADLINE, notifier.dispatch(&intent)).await {
                        Ok(outcome) => outcome,
                        Err(_) => DispatchOutcome {
                            delivered: 0,
                            last_error: Some(NotificationError::Timeout),
                        },
                    };
                (key, outcome)
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = deliveries.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => tracing::error!(error = %err, "delivery worker failed"),
            }
        }

        let mut entries = self.registry.write();
        for (key, outcome) in outcomes {
            // The entry may have expired above; its final notification was
            // still attempted.
            if let Some(instance) = entries.get_mut(&key) {
                // Partial success both advances last_sent and records the
                // error: one reachable destination is enough to stay live.
                if outcome.made_progress() {
                    instance.last_sent = Some(now);
                }
                if let Some(err) = outcome.last_error {
                    instance.last_error = Some(err.to_string());
                }
            }
        }
    }

    /// Builds the outbound notification for one instance.
    fn build_intent(&self, now: DateTime<Utc>, instance: &TrackedInstance) -> DeliveryIntent {
        let mut alert = Alert::firing();

        // The heartbeat's labels are the template; its severity and
        // alertname give way to the configured ones.
        for (k, v) in &instance.last_labels {
            if k == "severity" || k == "alertname" {
                continue;
            }
            alert.labels.insert(k.clone(), v.clone());
        }
        alert.labels.insert("alertname".to_string(), instance.alert_name.clone());
        for override_label in &instance.override_labels {
            if let Some((k, v)) = override_label.split_once('=') {
                alert.labels.insert(k.to_string(), v.to_string());
            }
        }

        // msda_-prefixed heartbeat annotations project onto the outbound
        // alert with the prefix stripped.
        for (k, v) in &instance.last_annotations {
            match k.strip_prefix(ANNOTATION_PREFIX) {
                Some(name) if !name.is_empty() => {
                    alert.annotations.insert(name.to_string(), v.clone());
                }
                _ => {}
            }
        }

        // Group labels are computed over the outbound labels so overrides
        // (e.g. severity) are reflected.
        let identifiers = instance
            .last_annotations
            .get("msd_identifiers")
            .map(String::as_str)
            .unwrap_or(annotations::DEFAULT_IDENTIFIERS);
        let mut group_labels = std::collections::HashMap::new();
        for id in annotations::split_annotation(identifiers) {
            if let Some(value) = alert.labels.get(&id) {
                group_labels.insert(id, value.clone());
            }
        }

        alert.generator_url = self.external_url.clone();

        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        let resolved = if now > instance.activate_at {
            alert.status = "firing".to_string();
            alert.starts_at = Some(instance.activate_at);
            alert.ends_at = Some(instance.activate_at + self.settings.expiry_window);
            false
        } else {
            alert.status = "resolved".to_string();
            alert.starts_at = Some(instance.activated_at.unwrap_or(epoch));
            alert.ends_at = Some(instance.resolved_at.unwrap_or(epoch));
            true
        };

        DeliveryIntent {
            destinations: instance.destinations.clone(),
            receiver: instance.receiver.clone(),
            last_sent: instance.last_sent,
            resolved,
            group_labels,
            alerts: vec![alert],
        }
    }
}
