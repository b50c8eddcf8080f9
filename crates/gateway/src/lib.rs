//! HTTP gateway for the bridge.
//!
//! Serves the LINE webhook (behind signature verification) and a health
//! endpoint, and wires the Discord client, relay queue and fan-out together.

pub mod server;
pub mod signature_middleware;
pub mod state;
pub mod webhook;

pub use {
    server::{build_app, start_gateway},
    state::AppState,
};
