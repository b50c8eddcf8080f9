//! Discord side of the bridge.
//!
//! [`DiscordHandler`] relays messages from the source channel into the LINE
//! relay queue. [`DiscordOutbound`] posts LINE content into Discord channels.

pub mod handler;
pub mod outbound;

use {
    anyhow::Context as _,
    linecord_config::DiscordConfig,
    linecord_relay::RelayQueue,
    secrecy::ExposeSecret,
    serenity::Client,
};

pub use {
    handler::{DiscordHandler, to_raw_message},
    outbound::{DiscordOutbound, MESSAGE_LIMIT},
};

/// Build a gateway client whose handler feeds `relay`.
///
/// The client is not started; call `Client::start` on it.
pub async fn build_client(config: &DiscordConfig, relay: RelayQueue) -> anyhow::Result<Client> {
    let handler = DiscordHandler::new(config.channel_id.clone(), config.strip_mentions, relay);
    Client::builder(config.token.expose_secret(), DiscordHandler::intents())
        .event_handler(handler)
        .await
        .context("failed to build discord client")
}
