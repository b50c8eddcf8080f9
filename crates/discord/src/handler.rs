//! Discord event handler for serenity.
//!
//! Receives gateway events and relays messages from the source channel to
//! LINE through the relay queue.

use {
    serenity::{
        all::{Context, EventHandler, GatewayIntents, GuildId, Message, Ready},
        async_trait,
    },
    tracing::{debug, info},
};

use {
    linecord_common::Direction,
    linecord_relay::{Normalizer, RawAttachment, RawMessage, RelayQueue},
};

/// Handler for Discord gateway events.
pub struct DiscordHandler {
    channel_id: String,
    normalizer: Normalizer,
    relay: RelayQueue,
}

impl DiscordHandler {
    pub fn new(channel_id: impl Into<String>, strip_mentions: bool, relay: RelayQueue) -> Self {
        let channel_id: String = channel_id.into();
        Self {
            channel_id: channel_id.trim().to_string(),
            normalizer: Normalizer::new(strip_mentions),
            relay,
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }

    /// Only human messages from the source channel are relayed. Skipping bots
    /// also keeps the bridge from echoing its own LINE relays back.
    fn accepts(&self, author_is_bot: bool, channel_id: &str) -> bool {
        !author_is_bot && channel_id == self.channel_id
    }

    /// Normalize and enqueue one message. Returns the number of units queued.
    pub fn relay(&self, raw: &RawMessage) -> usize {
        let units = self.normalizer.normalize(raw, Direction::DiscordToLine);
        if units.is_empty() {
            debug!(message_id = ?raw.id, "discord message has nothing to relay");
            return 0;
        }
        let count = units.len();
        self.relay.enqueue_batch(units);
        debug!(message_id = ?raw.id, units = count, "discord message queued for line");
        count
    }
}

/// Platform-neutral view of a Discord message.
pub fn to_raw_message(msg: &Message) -> RawMessage {
    RawMessage {
        id: Some(msg.id.to_string()),
        author: Some(msg.author.name.clone()),
        body: Some(msg.content.clone()),
        attachments: msg
            .attachments
            .iter()
            .map(|a| {
                RawAttachment::hosted(
                    a.url.as_str(),
                    a.content_type.clone(),
                    Some(a.filename.clone()),
                )
            })
            .collect(),
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            channel_id = %self.channel_id,
            "discord bot ready"
        );
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let channel_id = msg.channel_id.to_string();
        if !self.accepts(msg.author.bot, &channel_id) {
            return;
        }
        self.relay(&to_raw_message(&msg));
    }

    async fn cache_ready(&self, _ctx: Context, guilds: Vec<GuildId>) {
        debug!(guild_count = guilds.len(), "discord cache ready");
    }
}
