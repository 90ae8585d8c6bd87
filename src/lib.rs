#![warn(missing_docs)]
//! PromMSD is a safety device for a Prometheus monitoring stack. It inverts
//! the usual alerting contract: monitored sources are expected to deliver a
//! heartbeat alert continuously, and when a heartbeat stops arriving for
//! longer than its activation window this service raises an alert of its
//! own — to Alertmanagers, plain webhooks or Slack-style chat hooks — and
//! sends a matching resolve once the heartbeat resumes.
//!
//! All state is in memory. A restart forgets every tracked instance until
//! heartbeats re-register them, which is intentional: reliability comes from
//! running independent replicas, not from durable local state.

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub mod checker;
pub mod config;
pub mod http_client;
pub mod http_server;
pub mod metrics;
pub mod models;
pub mod notification;

/// Source of wall-clock time. Injectable so tests can drive fake time
/// through the reconciler and the notifier rate limiting.
pub type NowFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;
