//! Startup validation of a loaded [`BridgeConfig`].

use secrecy::ExposeSecret;

use crate::schema::BridgeConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "discord.channel_id"
    pub path: &'static str,
    pub message: String,
}

impl Diagnostic {
    fn error(path: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            path,
            message: message.into(),
        }
    }

    fn warning(path: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            path,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
    }
}

/// Check everything the bridge needs before it can start.
pub fn validate(config: &BridgeConfig) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    if config.discord.token.expose_secret().trim().is_empty() {
        out.push(Diagnostic::error("discord.token", "Discord bot token is required"));
    }
    let primary = config.discord.channel_id.trim();
    check_snowflake(&mut out, "discord.channel_id", primary, true);
    for id in &config.discord.fanout_channel_ids {
        let id = id.trim();
        check_snowflake(&mut out, "discord.fanout_channel_ids", id, false);
        if !id.is_empty() && id == primary {
            out.push(Diagnostic::warning(
                "discord.fanout_channel_ids",
                format!("channel {id} is already the primary channel and will be skipped"),
            ));
        }
    }

    if config
        .line
        .channel_access_token
        .expose_secret()
        .trim()
        .is_empty()
    {
        out.push(Diagnostic::error(
            "line.channel_access_token",
            "LINE channel access token is required",
        ));
    }
    if config.line.verify_signature {
        if config.line.channel_secret.expose_secret().trim().is_empty() {
            out.push(Diagnostic::error(
                "line.channel_secret",
                "LINE channel secret is required to verify webhook signatures",
            ));
        }
    } else {
        out.push(Diagnostic::warning(
            "line.verify_signature",
            "webhook signature verification is disabled; anyone can post to the webhook",
        ));
    }

    if config.relay.pacing_ms == 0 {
        out.push(Diagnostic::error(
            "relay.pacing_ms",
            "pacing interval must be greater than zero",
        ));
    }
    if !config.server.webhook_path.starts_with('/') {
        out.push(Diagnostic::error(
            "server.webhook_path",
            "webhook path must start with '/'",
        ));
    }

    out
}

/// Returns `true` if any diagnostic is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

fn check_snowflake(out: &mut Vec<Diagnostic>, path: &'static str, value: &str, required: bool) {
    if value.is_empty() {
        if required {
            out.push(Diagnostic::error(path, "channel ID is required"));
        }
        return;
    }
    if value.parse::<u64>().map_or(true, |id| id == 0) {
        out.push(Diagnostic::error(
            path,
            format!("'{value}' is not a Discord channel ID"),
        ));
    }
}
