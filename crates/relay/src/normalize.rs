//! Conversion of platform messages into [`MessageUnit`]s.

use {
    linecord_common::{Direction, ImageRef, ImageUnit, MessageUnit, TextUnit},
    tracing::debug,
};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Platform-neutral view of a source message, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    /// Source message ID, used in logs.
    pub id: Option<String>,
    /// Display identifier of the sender.
    pub author: Option<String>,
    pub body: Option<String>,
    /// Attachments in source order.
    pub attachments: Vec<RawAttachment>,
}

impl RawMessage {
    pub fn text(author: Option<String>, body: impl Into<String>) -> Self {
        Self {
            author,
            body: Some(body.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttachment {
    /// Declared MIME type, if the platform reports one.
    pub content_type: Option<String>,
    pub filename: Option<String>,
    pub source: AttachmentSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// The binary is hosted at a public URL.
    Hosted { url: String },
    /// The binary has to be fetched from the platform by message ID.
    Content { message_id: String },
}

impl RawAttachment {
    /// A hosted attachment (Discord CDN).
    pub fn hosted(
        url: impl Into<String>,
        content_type: Option<String>,
        filename: Option<String>,
    ) -> Self {
        Self {
            content_type,
            filename,
            source: AttachmentSource::Hosted { url: url.into() },
        }
    }

    /// An image whose bytes live behind the LINE content API.
    pub fn line_image(message_id: impl Into<String>) -> Self {
        Self {
            content_type: Some("image/jpeg".into()),
            filename: None,
            source: AttachmentSource::Content {
                message_id: message_id.into(),
            },
        }
    }

    /// Whether the attachment is an image.
    ///
    /// The declared content type wins; without one the filename extension
    /// decides.
    pub fn is_image(&self) -> bool {
        if let Some(content_type) = self.content_type.as_deref() {
            return content_type
                .trim()
                .to_ascii_lowercase()
                .starts_with("image/");
        }
        self.filename
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .is_some_and(|(_, ext)| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }
}

/// Turns raw messages into units according to per-direction text policy.
///
/// Discord → LINE text has mention tokens stripped (when enabled) and is
/// trimmed. LINE → Discord text passes through unchanged. In both
/// directions a blank body yields no text unit.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    strip_mentions: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Normalizer {
    pub fn new(strip_mentions: bool) -> Self {
        Self { strip_mentions }
    }

    /// Units for `raw`: the text first (if any), then images in attachment
    /// order.
    pub fn normalize(&self, raw: &RawMessage, direction: Direction) -> Vec<MessageUnit> {
        let mut units = Vec::with_capacity(1 + raw.attachments.len());

        if let Some(body) = raw.body.as_deref() {
            let text = match direction {
                Direction::DiscordToLine => self.discord_text(body),
                Direction::LineToDiscord => body.to_string(),
            };
            if let Some(unit) = TextUnit::new(text, raw.author.clone()) {
                units.push(MessageUnit::Text(unit));
            }
        }

        for attachment in &raw.attachments {
            if !attachment.is_image() {
                debug!(
                    message_id = ?raw.id,
                    %direction,
                    content_type = ?attachment.content_type,
                    "skipping non-image attachment"
                );
                continue;
            }
            let image = match &attachment.source {
                AttachmentSource::Hosted { url } => ImageRef::hosted(url.as_str()),
                AttachmentSource::Content { message_id } => ImageRef::content(message_id.as_str()),
            };
            units.push(MessageUnit::Image(ImageUnit::new(image, raw.author.clone())));
        }

        units
    }

    fn discord_text(&self, body: &str) -> String {
        if self.strip_mentions {
            strip_mentions(body).trim().to_string()
        } else {
            body.trim().to_string()
        }
    }
}

/// Remove Discord mention tokens: `<@id>`, `<@!id>`, `<@&role>`, `<#channel>`.
pub fn strip_mentions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match mention_len(candidate) {
            Some(len) => rest = &candidate[len..],
            None => {
                out.push('<');
                rest = &candidate[1..];
            },
        }
    }
    out.push_str(rest);
    out
}

/// Byte length of the mention token at the start of `s`, if there is one.
fn mention_len(s: &str) -> Option<usize> {
    let body = match s.strip_prefix("<@") {
        Some(b) => b
            .strip_prefix('!')
            .or_else(|| b.strip_prefix('&'))
            .unwrap_or(b),
        None => s.strip_prefix("<#")?,
    };
    let digits = body.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || body.as_bytes().get(digits) != Some(&b'>') {
        return None;
    }
    Some(s.len() - body.len() + digits + 1)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn png(url: &str) -> RawAttachment {
        RawAttachment::hosted(url, Some("image/png".into()), Some("a.png".into()))
    }

    #[rstest]
    #[case("<@123> hi", " hi")]
    #[case("<@!123>hi", "hi")]
    #[case("ping <@&42> and <#99>", "ping  and ")]
    #[case("a < b <@x> <@> <#>", "a < b <@x> <@> <#>")]
    #[case("unterminated <@123", "unterminated <@123")]
    fn strips_mention_tokens(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_mentions(input), expected);
    }

    #[test]
    fn plain_text_passes_unchanged() {
        let raw = RawMessage::text(Some("alice".into()), "hello world");
        let units = Normalizer::default().normalize(&raw, Direction::DiscordToLine);
        assert_eq!(units.len(), 1);
        let MessageUnit::Text(text) = &units[0] else {
            panic!("expected text unit");
        };
        assert_eq!(text.text(), "hello world");
        assert_eq!(text.author(), Some("alice"));
    }

    #[test]
    fn mention_only_message_yields_nothing() {
        let raw = RawMessage::text(None, "  <@1234567890>  ");
        let units = Normalizer::default().normalize(&raw, Direction::DiscordToLine);
        assert!(units.is_empty());
    }

    #[test]
    fn mentions_kept_when_stripping_disabled() {
        let raw = RawMessage::text(None, "<@1> hi");
        let units = Normalizer::new(false).normalize(&raw, Direction::DiscordToLine);
        let MessageUnit::Text(text) = &units[0] else {
            panic!("expected text unit");
        };
        assert_eq!(text.text(), "<@1> hi");
    }

    #[test]
    fn line_text_is_not_stripped_or_trimmed() {
        let raw = RawMessage::text(Some("U1".into()), " <@1> hi ");
        let units = Normalizer::default().normalize(&raw, Direction::LineToDiscord);
        let MessageUnit::Text(text) = &units[0] else {
            panic!("expected text unit");
        };
        assert_eq!(text.text(), " <@1> hi ");
    }

    #[test]
    fn text_and_two_images_yield_three_units_in_order() {
        let raw = RawMessage {
            id: Some("1".into()),
            author: Some("alice".into()),
            body: Some("look".into()),
            attachments: vec![png("https://cdn/a.png"), png("https://cdn/b.png")],
        };
        let units = Normalizer::default().normalize(&raw, Direction::DiscordToLine);
        assert_eq!(units.len(), 3);
        assert!(units[0].is_text());
        assert_eq!(
            units[1],
            MessageUnit::Image(ImageUnit::new(
                ImageRef::hosted("https://cdn/a.png"),
                Some("alice".into())
            ))
        );
        assert_eq!(
            units[2],
            MessageUnit::Image(ImageUnit::new(
                ImageRef::hosted("https://cdn/b.png"),
                Some("alice".into())
            ))
        );
    }

    #[test]
    fn image_only_message_has_no_text_unit() {
        let raw = RawMessage {
            body: Some(String::new()),
            attachments: vec![png("https://cdn/a.png")],
            ..Default::default()
        };
        let units = Normalizer::default().normalize(&raw, Direction::DiscordToLine);
        assert_eq!(units.len(), 1);
        assert!(units[0].is_image());
    }

    #[test]
    fn non_image_attachments_are_skipped() {
        let raw = RawMessage {
            attachments: vec![
                RawAttachment::hosted("https://cdn/a.pdf", Some("application/pdf".into()), None),
                RawAttachment::hosted("https://cdn/b.jpg", None, Some("b.JPG".into())),
                RawAttachment::hosted("https://cdn/c", None, Some("notes.txt".into())),
            ],
            ..Default::default()
        };
        let units = Normalizer::default().normalize(&raw, Direction::DiscordToLine);
        assert_eq!(units, vec![MessageUnit::Image(ImageUnit::new(
            ImageRef::hosted("https://cdn/b.jpg"),
            None
        ))]);
    }

    #[test]
    fn line_image_becomes_content_handle() {
        let raw = RawMessage {
            id: Some("m1".into()),
            attachments: vec![RawAttachment::line_image("m1")],
            ..Default::default()
        };
        let units = Normalizer::default().normalize(&raw, Direction::LineToDiscord);
        assert_eq!(units, vec![MessageUnit::Image(ImageUnit::new(
            ImageRef::content("m1"),
            None
        ))]);
    }
}
