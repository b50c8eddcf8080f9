//! LINE REST client: broadcast and message content retrieval.

use {
    async_trait::async_trait,
    bytes::Bytes,
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
    tracing::{debug, warn},
};

use {
    linecord_channels::{BroadcastOutbound, ContentFetcher, Error, Result},
    linecord_common::{ImageRef, MessageUnit, text::chunk_text},
    linecord_config::LineConfig,
};

/// Maximum characters in one text message.
pub const TEXT_LIMIT: usize = 5000;
/// Maximum messages in one broadcast request.
pub const MESSAGES_PER_REQUEST: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(
    tag = "type",
    rename_all = "lowercase",
    rename_all_fields = "camelCase"
)]
enum LineMessage {
    Text {
        text: String,
    },
    Image {
        original_content_url: String,
        preview_image_url: String,
    },
}

#[derive(Serialize)]
struct BroadcastRequest<'a> {
    messages: &'a [LineMessage],
}

/// Client for the LINE Messaging API.
#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    access_token: Secret<String>,
    api_base_url: String,
    data_api_base_url: String,
    include_author: bool,
}

impl LineClient {
    pub fn new(
        access_token: Secret<String>,
        api_base_url: impl Into<String>,
        data_api_base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            data_api_base_url: data_api_base_url.into().trim_end_matches('/').to_string(),
            include_author: false,
        }
    }

    pub fn from_config(config: &LineConfig) -> Self {
        Self::new(
            config.channel_access_token.clone(),
            config.api_base_url.as_str(),
            config.data_api_base_url.as_str(),
        )
        .with_include_author(config.include_author)
    }

    /// Prefix broadcast text with the Discord author.
    pub fn with_include_author(mut self, include_author: bool) -> Self {
        self.include_author = include_author;
        self
    }

    fn to_messages(&self, units: &[MessageUnit]) -> Vec<LineMessage> {
        let mut messages = Vec::with_capacity(units.len());
        for unit in units {
            match unit {
                MessageUnit::Text(text) => {
                    let rendered = text.render(self.include_author);
                    messages.extend(
                        chunk_text(&rendered, TEXT_LIMIT)
                            .into_iter()
                            .map(|text| LineMessage::Text { text }),
                    );
                },
                MessageUnit::Image(image) => match image.image() {
                    ImageRef::Url { original, preview } => messages.push(LineMessage::Image {
                        original_content_url: original.clone(),
                        preview_image_url: preview.clone(),
                    }),
                    ImageRef::Content { message_id } => {
                        warn!(
                            content_id = %message_id,
                            "image without a public URL cannot be broadcast, skipping"
                        );
                    },
                },
            }
        }
        messages
    }

    async fn post_broadcast(&self, messages: &[LineMessage]) -> Result<()> {
        let url = format!("{}/v2/bot/message/broadcast", self.api_base_url);
        let resp = self
            .http
            .post(url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&BroadcastRequest { messages })
            .send()
            .await
            .map_err(|e| Error::external("line broadcast request", e))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::api(status, body));
        }
        Ok(())
    }
}

#[async_trait]
impl BroadcastOutbound for LineClient {
    /// Broadcast all units as one delivery attempt. More than
    /// [`MESSAGES_PER_REQUEST`] messages are sent as consecutive requests;
    /// the first failing request aborts the rest.
    async fn broadcast(&self, units: &[MessageUnit]) -> Result<()> {
        let messages = self.to_messages(units);
        if messages.is_empty() {
            return Err(Error::invalid_input("nothing broadcastable in batch"));
        }
        for chunk in messages.chunks(MESSAGES_PER_REQUEST) {
            self.post_broadcast(chunk).await?;
        }
        debug!(messages = messages.len(), "line broadcast sent");
        Ok(())
    }
}

#[async_trait]
impl ContentFetcher for LineClient {
    async fn fetch_content(&self, message_id: &str) -> Result<Bytes> {
        let url = format!(
            "{}/v2/bot/message/{message_id}/content",
            self.data_api_base_url
        );
        let resp = self
            .http
            .get(url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| Error::external("line content request", e))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::api(status, body));
        }
        resp.bytes()
            .await
            .map_err(|e| Error::external("line content body", e))
    }
}
