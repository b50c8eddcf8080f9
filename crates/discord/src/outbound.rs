use std::sync::Arc;

use {
    async_trait::async_trait,
    serenity::{
        all::{ChannelId, CreateAttachment, CreateMessage},
        http::Http,
    },
    tracing::debug,
};

use {
    linecord_channels::{ChannelOutbound, Error, ImagePayload, Result},
    linecord_common::text::chunk_text,
};

/// Maximum characters in one Discord message.
pub const MESSAGE_LIMIT: usize = 2000;

/// Outbound sender for Discord channels.
#[derive(Clone)]
pub struct DiscordOutbound {
    http: Arc<Http>,
}

impl DiscordOutbound {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    async fn send(&self, channel: ChannelId, message: CreateMessage) -> Result<()> {
        channel
            .send_message(self.http.as_ref(), message)
            .await
            .map(|_| ())
            .map_err(|e| Error::external(format!("discord send to {channel}"), e))
    }
}

fn parse_channel_id(channel_id: &str) -> Result<ChannelId> {
    match channel_id.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(ChannelId::new(id)),
        _ => Err(Error::invalid_input(format!(
            "invalid discord channel id '{channel_id}'"
        ))),
    }
}

#[async_trait]
impl ChannelOutbound for DiscordOutbound {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<()> {
        let channel = parse_channel_id(channel_id)?;
        for chunk in chunk_text(text, MESSAGE_LIMIT) {
            self.send(channel, CreateMessage::new().content(chunk)).await?;
        }
        Ok(())
    }

    async fn send_image(&self, channel_id: &str, image: &ImagePayload) -> Result<()> {
        let channel = parse_channel_id(channel_id)?;
        let message = match image {
            // Discord unfurls bare image links.
            ImagePayload::Url(url) => CreateMessage::new().content(url.as_str()),
            ImagePayload::Upload { filename, data } => CreateMessage::new().add_file(
                CreateAttachment::bytes(data.to_vec(), filename.as_str()),
            ),
        };
        self.send(channel, message).await?;
        debug!(channel_id, "discord image sent");
        Ok(())
    }
}
