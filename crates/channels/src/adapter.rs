use {async_trait::async_trait, bytes::Bytes, linecord_common::MessageUnit};

use crate::Result;

/// An image ready to be posted to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Publicly reachable URL.
    Url(String),
    /// Raw bytes re-uploaded as a named attachment.
    Upload { filename: String, data: Bytes },
}

impl ImagePayload {
    pub fn upload(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::Upload {
            filename: filename.into(),
            data: data.into(),
        }
    }
}

/// Send messages into a specific channel (Discord side).
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<()>;
    async fn send_image(&self, channel_id: &str, image: &ImagePayload) -> Result<()>;
}

/// Broadcast units to every subscriber (LINE side).
///
/// The slice carries every unit produced from a single source event; it is
/// one delivery attempt from the caller's point of view.
#[async_trait]
pub trait BroadcastOutbound: Send + Sync {
    async fn broadcast(&self, units: &[MessageUnit]) -> Result<()>;
}

/// Fetch the binary content attached to a source message.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_content(&self, message_id: &str) -> Result<Bytes>;
}
