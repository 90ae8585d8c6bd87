//! Error types for outbound notification delivery.

use thiserror::Error;

use crate::http_client::HttpClientPoolError;

/// Everything that can go wrong delivering a notification to one
/// destination. Recorded on the instance for the status page; never fatal.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// A `kind+` URL prefix named a delivery kind we do not implement.
    #[error("unknown alert delivery kind {kind} (in {url:?})")]
    UnknownKind {
        /// The unrecognised kind prefix.
        kind: String,
        /// The destination URL it was found in.
        url: String,
    },

    /// The notification payload could not be encoded as JSON.
    #[error("failed to encode notification payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// The HTTP request could not be sent (connect failure, timeout, ...).
    #[error("request error: {0}")]
    Request(#[from] reqwest_middleware::Error),

    /// The destination answered with a non-success status.
    #[error("response {0}")]
    Response(reqwest::StatusCode),

    /// The client pool could not produce a client.
    #[error(transparent)]
    Pool(#[from] HttpClientPoolError),

    /// The per-tick delivery deadline elapsed before all destinations were
    /// attempted.
    #[error("delivery timed out")]
    Timeout,
}
