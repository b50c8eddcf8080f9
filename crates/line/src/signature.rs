//! Webhook signature verification.

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    hmac::{Hmac, Mac},
    sha2::Sha256,
    tracing::warn,
};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Base64 HMAC-SHA256 of `body` keyed with the channel secret.
pub fn compute_signature(body: &[u8], channel_secret: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify the `x-line-signature` header against the raw request body.
pub fn verify_signature(body: &[u8], signature_header: &str, channel_secret: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature_header.trim()) else {
        warn!("invalid signature header format (not base64)");
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("failed to create HMAC");
            return false;
        },
    };
    mac.update(body);

    // verify_slice compares in constant time.
    mac.verify_slice(&expected).is_ok()
}
