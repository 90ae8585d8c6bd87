//! The webhook intake endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};

use super::{ApiError, ApiState};
use crate::metrics::ErrorTypeLabels;
use crate::models::{AlertView, Message};

/// Receives an Alertmanager webhook batch on `POST /alert` and hands every
/// contained alert to the reconciler. `HEAD` and `OPTIONS` succeed empty;
/// any other non-POST method is a client error.
pub(super) async fn alert(
    State(state): State<ApiState>,
    method: Method,
    body: Bytes,
) -> Response {
    if method == Method::HEAD || method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    state.metrics.hook_received.inc();

    if method != Method::POST {
        state.metrics.hook_errors.get_or_create(&ErrorTypeLabels::new("wrong_method")).inc();
        return ApiError::BadRequest("expected alert to be POSTed".to_string()).into_response();
    }

    let message: Message = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(err) => {
            state.metrics.hook_errors.get_or_create(&ErrorTypeLabels::new("decode")).inc();
            tracing::warn!(error = %err, "error decoding alert");
            return ApiError::BadRequest(err.to_string()).into_response();
        }
    };

    // Dispatch every alert even if one fails; the first failure decides the
    // response.
    let mut first_error = None;
    for (index, contained) in message.alerts.iter().enumerate() {
        let view = AlertView::new(contained, &message);
        if let Err(err) = state.checker.handle_heartbeat(view).await {
            tracing::error!(
                group_key = %message.group_key,
                index,
                error = %err,
                "error handling alert"
            );
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
    }

    match first_error {
        Some(err) => {
            state.metrics.hook_errors.get_or_create(&ErrorTypeLabels::new("handler")).inc();
            ApiError::InternalServerError(err.to_string()).into_response()
        }
        None => StatusCode::OK.into_response(),
    }
}
