//! Config schema types (server, discord, line, relay).

use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub discord: DiscordConfig,
    pub line: LineConfig,
    pub relay: RelayConfig,
}

/// HTTP listener for the LINE webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub webhook_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
            webhook_path: "/webhook".into(),
        }
    }
}

/// Discord bot and channel routing.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Channel relayed to LINE, and primary destination for LINE messages.
    pub channel_id: String,

    /// Secondary destinations for LINE messages. Empty disables fan-out.
    pub fanout_channel_ids: Vec<String>,

    /// Strip `<@user>`, `<@&role>` and `<#channel>` tokens before relaying.
    pub strip_mentions: bool,

    /// Prefix text relayed to Discord with the LINE user ID.
    pub include_author: bool,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .field("channel_id", &self.channel_id)
            .field("fanout_channel_ids", &self.fanout_channel_ids)
            .field("strip_mentions", &self.strip_mentions)
            .field("include_author", &self.include_author)
            .finish()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            channel_id: String::new(),
            fanout_channel_ids: Vec::new(),
            strip_mentions: true,
            include_author: true,
        }
    }
}

/// LINE Messaging API channel.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Long-lived channel access token.
    #[serde(serialize_with = "serialize_secret")]
    pub channel_access_token: Secret<String>,

    /// Channel secret used to verify `x-line-signature`.
    #[serde(serialize_with = "serialize_secret")]
    pub channel_secret: Secret<String>,

    pub api_base_url: String,

    /// Host serving message content (images, files).
    pub data_api_base_url: String,

    /// Prefix text relayed to LINE with the Discord username.
    pub include_author: bool,

    /// Reject webhook calls whose signature does not match.
    pub verify_signature: bool,
}

impl std::fmt::Debug for LineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineConfig")
            .field("channel_access_token", &"[REDACTED]")
            .field("channel_secret", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("data_api_base_url", &self.data_api_base_url)
            .field("include_author", &self.include_author)
            .field("verify_signature", &self.verify_signature)
            .finish()
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_access_token: Secret::new(String::new()),
            channel_secret: Secret::new(String::new()),
            api_base_url: "https://api.line.me".into(),
            data_api_base_url: "https://api-data.line.me".into(),
            include_author: true,
            verify_signature: true,
        }
    }
}

/// Outbound relay pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Pause after every LINE broadcast attempt (ms).
    pub pacing_ms: u64,
}

impl RelayConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { pacing_ms: 200 }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
