use std::sync::Arc;

use {
    linecord_relay::{InboundFanout, RelayQueue},
    secrecy::Secret,
};

/// Shared state for every route.
#[derive(Clone)]
pub struct AppState {
    pub fanout: Arc<InboundFanout>,
    pub relay: RelayQueue,
    /// Channel secret for webhook signatures. `None` disables verification.
    pub channel_secret: Option<Arc<Secret<String>>>,
    pub version: &'static str,
}

impl AppState {
    pub fn new(fanout: InboundFanout, relay: RelayQueue) -> Self {
        Self {
            fanout: Arc::new(fanout),
            relay,
            channel_secret: None,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub fn with_channel_secret(mut self, secret: Secret<String>) -> Self {
        self.channel_secret = Some(Arc::new(secret));
        self
    }
}
