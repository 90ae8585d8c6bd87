//! Process-wide Prometheus metrics.
//!
//! All metric handles live in one [`AppMetrics`] struct created at startup
//! and shared behind an `Arc`; the `/metrics` endpoint serves
//! [`AppMetrics::encode`].

use std::fmt;
use std::sync::Arc;

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// Label set carrying a single `type` label, used by the error counters.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ErrorTypeLabels {
    kind: String,
}

impl ErrorTypeLabels {
    /// Labels for the given error type.
    pub fn new(kind: &str) -> Self {
        ErrorTypeLabels { kind: kind.to_string() }
    }
}

// Hand-rolled so the label is named `type`, which is not a usable field name.
impl EncodeLabelSet for ErrorTypeLabels {
    fn encode(&self, mut encoder: LabelSetEncoder) -> Result<(), fmt::Error> {
        ("type", self.kind.as_str()).encode(encoder.encode_label())
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
struct BuildInfoLabels {
    version: String,
}

/// The service's metric handles plus the registry that exposes them.
pub struct AppMetrics {
    registry: Arc<Registry>,
    /// Alert batches received on the intake endpoint.
    pub hook_received: Counter,
    /// Intake failures by type (`wrong_method`, `decode`, `handler`).
    pub hook_errors: Family<ErrorTypeLabels, Counter>,
    /// Current number of tracked instances.
    pub monitored_instances: Gauge,
    /// Outbound Alertmanager notification attempts.
    pub alertmanager_sent: Counter,
    /// Outbound Alertmanager failures by type.
    pub alertmanager_errors: Family<ErrorTypeLabels, Counter>,
}

impl AppMetrics {
    /// Content-Type for the Prometheus text exposition format.
    pub const CONTENT_TYPE: &'static str = "text/plain; version=0.0.4; charset=utf-8";

    /// Creates and registers every metric the service exports.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let hook_received = Counter::default();
        registry.register(
            "prommsd_alerthook_received",
            "Alert batches received on the webhook endpoint",
            hook_received.clone(),
        );

        let hook_errors = Family::<ErrorTypeLabels, Counter>::default();
        registry.register(
            "prommsd_alerthook_errors",
            "Webhook receive failures by type",
            hook_errors.clone(),
        );

        let monitored_instances = Gauge::default();
        registry.register(
            "prommsd_alertcheck_monitored_instances",
            "Number of heartbeat sources currently tracked",
            monitored_instances.clone(),
        );

        let alertmanager_sent = Counter::default();
        registry.register(
            "prommsd_alertmanager_sent",
            "Notifications sent to Alertmanager destinations",
            alertmanager_sent.clone(),
        );

        let alertmanager_errors = Family::<ErrorTypeLabels, Counter>::default();
        registry.register(
            "prommsd_alertmanager_errors",
            "Alertmanager notification failures by type",
            alertmanager_errors.clone(),
        );

        let build_info = Family::<BuildInfoLabels, Gauge>::default();
        registry.register("prommsd_build_info", "Build information", build_info.clone());
        build_info
            .get_or_create(&BuildInfoLabels { version: env!("CARGO_PKG_VERSION").to_string() })
            .set(1);

        // Expose the known error series at zero so absence is visible.
        for kind in ["wrong_method", "decode", "handler"] {
            hook_errors.get_or_create(&ErrorTypeLabels::new(kind));
        }
        for kind in ["json_encode", "make_request", "http_send", "http_response"] {
            alertmanager_errors.get_or_create(&ErrorTypeLabels::new(kind));
        }

        AppMetrics {
            registry: Arc::new(registry),
            hook_received,
            hook_errors,
            monitored_instances,
            alertmanager_sent,
            alertmanager_errors,
        }
    }

    /// Renders all metrics in the Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("failed to encode prometheus metrics");
            return String::new();
        }
        buffer
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}
