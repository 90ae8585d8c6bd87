//! HTTP server module: the webhook intake, health, metrics and status
//! surfaces.

mod alert;
mod error;
mod status;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;

use alert::alert;
pub use error::ApiError;
use status::{modify, status, StatusPage};

use crate::checker::{CheckerHandle, Registry};
use crate::metrics::AppMetrics;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct ApiState {
    /// The table of tracked instances, read for status and written for the
    /// modify surface.
    pub registry: Arc<Registry>,
    /// Handle to the running reconciler.
    pub checker: CheckerHandle,
    /// The application metrics.
    pub metrics: Arc<AppMetrics>,
    status: Arc<StatusPage>,
}

impl ApiState {
    /// Builds the state shared by every handler.
    pub fn new(registry: Arc<Registry>, checker: CheckerHandle, metrics: Arc<AppMetrics>) -> Self {
        ApiState { registry, checker, metrics, status: Arc::new(StatusPage::new()) }
    }
}

/// `GET /-/healthy`: 200 `ok` while the reconciler answers its probe.
async fn healthy(State(state): State<ApiState>) -> Response {
    if state.checker.healthy().await {
        (StatusCode::OK, "ok").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy").into_response()
    }
}

/// `GET /metrics`: Prometheus text exposition.
async fn metrics(State(state): State<ApiState>) -> Response {
    ([(header::CONTENT_TYPE, AppMetrics::CONTENT_TYPE)], state.metrics.encode()).into_response()
}

/// Builds the service's router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/alert", any(alert))
        .route("/modify", any(modify))
        .route("/metrics", get(metrics))
        .route("/-/healthy", get(healthy))
        .with_state(state)
}

/// Binds the listen address and serves until a shutdown signal arrives.
pub async fn run_server(bind_address: &str, state: ApiState) {
    let listener =
        tokio::net::TcpListener::bind(bind_address).await.expect("failed to bind listen address");

    tracing::info!("HTTP server listening on {}", bind_address);

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
