use serde::Serialize;

/// Which way a message is travelling through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Discord channel → LINE broadcast.
    DiscordToLine,
    /// LINE webhook → Discord channels.
    LineToDiscord,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DiscordToLine => "discord_to_line",
            Self::LineToDiscord => "line_to_discord",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized, platform-agnostic piece of content.
///
/// A unit is exactly one text or exactly one image. A source message that
/// carries text and N images becomes 1 + N units, text first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageUnit {
    Text(TextUnit),
    Image(ImageUnit),
}

impl MessageUnit {
    pub fn author(&self) -> Option<&str> {
        match self {
            Self::Text(t) => t.author(),
            Self::Image(i) => i.author(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }
}

/// A text unit. The body is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextUnit {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
}

impl TextUnit {
    /// Build a text unit, or `None` when the text is blank.
    pub fn new(text: impl Into<String>, author: Option<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }
        Some(Self { text, author })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Text as it appears on the receiving platform.
    ///
    /// With `include_author` set and an author known, the body is prefixed
    /// with `"<author>: "`.
    pub fn render(&self, include_author: bool) -> String {
        match self.author.as_deref() {
            Some(author) if include_author && !author.is_empty() => {
                format!("{author}: {}", self.text)
            },
            _ => self.text.clone(),
        }
    }
}

/// Where the binary for an image unit lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageRef {
    /// Already hosted; usable as-is by the receiving platform.
    Url { original: String, preview: String },
    /// Must be fetched (authenticated) from the source platform before it can
    /// be forwarded. The handle is the source message ID.
    Content { message_id: String },
}

impl ImageRef {
    /// A hosted image where the preview is the original itself.
    pub fn hosted(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::Url {
            preview: url.clone(),
            original: url,
        }
    }

    pub fn content(message_id: impl Into<String>) -> Self {
        Self::Content {
            message_id: message_id.into(),
        }
    }
}

/// An image unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageUnit {
    image: ImageRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
}

impl ImageUnit {
    pub fn new(image: ImageRef, author: Option<String>) -> Self {
        Self { image, author }
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }
}

/// Result of one delivery attempt.
///
/// Failed deliveries are dropped, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    Dropped(String),
}

impl DeliveryOutcome {
    pub fn dropped(reason: impl std::fmt::Display) -> Self {
        Self::Dropped(reason.to_string())
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        assert!(TextUnit::new("", None).is_none());
        assert!(TextUnit::new("  \n\t", Some("alice".into())).is_none());
        assert!(TextUnit::new(" hi ", None).is_some());
    }

    #[test]
    fn text_is_kept_verbatim() {
        let unit = TextUnit::new("  spaced  ", None).unwrap();
        assert_eq!(unit.text(), "  spaced  ");
    }

    #[test]
    fn render_prefixes_author_when_enabled() {
        let unit = TextUnit::new("hello world", Some("alice".into())).unwrap();
        assert_eq!(unit.render(true), "alice: hello world");
        assert_eq!(unit.render(false), "hello world");
    }

    #[test]
    fn render_without_author_ignores_policy() {
        let unit = TextUnit::new("hello", None).unwrap();
        assert_eq!(unit.render(true), "hello");
    }

    #[test]
    fn hosted_image_uses_same_url_for_preview() {
        let image = ImageRef::hosted("https://cdn.example.com/a.png");
        assert_eq!(image, ImageRef::Url {
            original: "https://cdn.example.com/a.png".into(),
            preview: "https://cdn.example.com/a.png".into(),
        });
    }

    #[test]
    fn unit_serializes_with_kind_tag() {
        let unit = MessageUnit::Image(ImageUnit::new(ImageRef::content("m1"), None));
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["kind"], "image");
        assert_eq!(json["image"]["type"], "content");
        assert_eq!(json["image"]["message_id"], "m1");
    }

    #[test]
    fn dropped_outcome_carries_reason() {
        let outcome = DeliveryOutcome::dropped("HTTP 429");
        assert!(!outcome.is_delivered());
        assert_eq!(outcome, DeliveryOutcome::Dropped("HTTP 429".into()));
    }
}
