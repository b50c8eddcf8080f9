//! LINE webhook route.

use {
    axum::{extract::State, http::StatusCode},
    bytes::Bytes,
    linecord_line::WebhookPayload,
    tracing::{debug, error},
};

use crate::state::AppState;

/// Accept one webhook batch.
///
/// Responds 200 once every dispatch of the batch has settled, whatever the
/// individual outcomes. An unparseable body or a panic during dispatch
/// yields 500, after the unaffected deliveries have settled.
pub async fn webhook_handler(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "failed to parse webhook payload");
            return StatusCode::INTERNAL_SERVER_ERROR;
        },
    };

    if payload.events.is_empty() {
        debug!(destination = ?payload.destination, "webhook verification request");
        return StatusCode::OK;
    }

    let events = payload.into_raw_messages();
    let fanout = state.fanout.clone();
    match tokio::spawn(async move { fanout.handle_batch(events).await }).await {
        Ok(report) if report.panics > 0 => {
            error!(panics = report.panics, "webhook batch settled with adapter panics");
            StatusCode::INTERNAL_SERVER_ERROR
        },
        Ok(report) => {
            debug!(?report, "webhook batch settled");
            StatusCode::OK
        },
        Err(e) => {
            error!(error = %e, "webhook batch processing failed");
            StatusCode::INTERNAL_SERVER_ERROR
        },
    }
}
