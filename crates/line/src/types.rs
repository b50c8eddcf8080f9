//! LINE webhook payload types.
//!
//! Only the fields the bridge reads are modelled; everything else is ignored
//! by serde.

use {
    linecord_relay::{RawAttachment, RawMessage},
    serde::Deserialize,
    tracing::{debug, warn},
};

/// Body of a webhook request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    /// User ID of the bot that received the events.
    #[serde(default)]
    pub destination: Option<String>,
    /// Kept untyped so one malformed event cannot fail the whole batch.
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

impl WebhookPayload {
    /// Relayable events in delivery order. Malformed and unsupported events
    /// are dropped.
    pub fn into_raw_messages(self) -> Vec<RawMessage> {
        self.events
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value::<Event>(value) {
                Ok(event) => event.to_raw_message(),
                Err(e) => {
                    warn!(index, error = %e, "skipping malformed webhook event");
                    None
                },
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub message: Option<EventMessage>,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub webhook_event_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "contentProvider")]
    pub content_provider: Option<ContentProvider>,
}

/// Where the binary of an image message lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentProvider {
    /// `line` or `external`.
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default)]
    pub original_content_url: Option<String>,
}

impl EventMessage {
    /// Public URL of an image hosted outside LINE, if any.
    fn external_url(&self) -> Option<&str> {
        self.content_provider
            .as_ref()
            .filter(|p| p.provider_type == "external")
            .and_then(|p| p.original_content_url.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

impl Event {
    fn user_id(&self) -> Option<String> {
        self.source.as_ref().and_then(|s| s.user_id.clone())
    }

    /// Convert a text or image message event; `None` for anything else.
    pub fn to_raw_message(&self) -> Option<RawMessage> {
        if self.event_type != "message" {
            debug!(event_type = %self.event_type, "skipping non-message event");
            return None;
        }
        let Some(message) = self.message.as_ref() else {
            debug!("skipping message event without a message");
            return None;
        };

        let mut raw = RawMessage {
            id: Some(message.id.clone()),
            author: self.user_id(),
            ..Default::default()
        };
        match message.message_type.as_str() {
            "text" => raw.body = message.text.clone(),
            "image" => raw.attachments.push(match message.external_url() {
                Some(url) => RawAttachment::hosted(url, Some("image/jpeg".into()), None),
                None => RawAttachment::line_image(&message.id),
            }),
            other => {
                debug!(message_id = %message.id, message_type = other, "skipping unsupported message type");
                return None;
            },
        }
        Some(raw)
    }
}
