//! LINE Messaging API adapter.
//!
//! Inbound: webhook payload model and `x-line-signature` verification.
//! Outbound: broadcast to every friend of the official account, and
//! retrieval of user-sent image content.

pub mod outbound;
pub mod signature;
pub mod types;

pub use {
    outbound::LineClient,
    signature::{SIGNATURE_HEADER, compute_signature, verify_signature},
    types::{ContentProvider, Event, EventMessage, EventSource, WebhookPayload},
};
