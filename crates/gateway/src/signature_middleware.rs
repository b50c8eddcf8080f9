use {
    axum::{
        body::Body,
        extract::State,
        http::{Request, StatusCode},
        middleware::Next,
        response::{IntoResponse, Json, Response},
    },
    linecord_line::{SIGNATURE_HEADER, verify_signature},
    secrecy::ExposeSecret,
    tracing::warn,
};

use crate::state::AppState;

/// Largest webhook body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Middleware that rejects webhook calls without a valid `x-line-signature`.
///
/// The body is buffered to compute the HMAC and then handed on unchanged.
/// When no channel secret is configured all requests pass through.
pub async fn require_line_signature(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(secret) = state.channel_secret.as_ref() else {
        return next.run(request).await;
    };

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to read webhook body");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        },
    };

    let valid = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|sig| verify_signature(&bytes, sig, secret.expose_secret()));
    if !valid {
        warn!("rejecting webhook with missing or invalid signature");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "invalid signature"})),
        )
            .into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
