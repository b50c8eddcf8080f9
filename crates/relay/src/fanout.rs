//! Concurrent dispatch of LINE webhook batches to Discord channels.
//!
//! Every event in a batch is handled concurrently. Within an event, every
//! destination channel is handled concurrently, while the units for one
//! destination go out in order (text first, then images). A failure at one
//! destination is logged and never affects the others, the remaining units,
//! or the remaining events.

use std::{collections::HashSet, panic::AssertUnwindSafe, sync::Arc};

use {
    futures::{FutureExt, future::join_all},
    linecord_channels::{ChannelOutbound, ContentFetcher, ImagePayload},
    linecord_common::{Direction, ImageRef, MessageUnit},
    serde::Serialize,
    tracing::{debug, info, warn},
};

use crate::normalize::{Normalizer, RawMessage};

/// Per-batch delivery counts, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub events: usize,
    /// Successful sends, counted per destination.
    pub sent: usize,
    /// Failed sends, counted per destination.
    pub failed: usize,
    /// Events that produced no deliverable units.
    pub skipped: usize,
    /// Adapter panics caught while delivering. Each also counts as a failure.
    pub panics: usize,
}

impl BatchReport {
    fn merge(mut self, other: Self) -> Self {
        self.events += other.events;
        self.sent += other.sent;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.panics += other.panics;
        self
    }

    fn panicked(events: usize) -> Self {
        Self {
            events,
            failed: 1,
            panics: 1,
            ..Default::default()
        }
    }
}

/// A unit resolved to the exact payload posted to Discord.
#[derive(Debug, Clone)]
enum Outgoing {
    Text(String),
    Image(ImagePayload),
}

impl Outgoing {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
        }
    }
}

pub struct InboundFanout {
    destinations: Vec<String>,
    outbound: Arc<dyn ChannelOutbound>,
    fetcher: Arc<dyn ContentFetcher>,
    normalizer: Normalizer,
    include_author: bool,
}

impl InboundFanout {
    /// `primary` is always the first destination. Secondaries are appended in
    /// order; blanks and duplicates are skipped.
    pub fn new(
        primary: impl Into<String>,
        secondaries: impl IntoIterator<Item = String>,
        outbound: Arc<dyn ChannelOutbound>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        let primary: String = primary.into();
        let primary = primary.trim().to_string();
        let mut seen = HashSet::new();
        seen.insert(primary.clone());
        let mut destinations = vec![primary];
        for id in secondaries {
            let id = id.trim().to_string();
            if !id.is_empty() && seen.insert(id.clone()) {
                destinations.push(id);
            }
        }
        Self {
            destinations,
            outbound,
            fetcher,
            normalizer: Normalizer::default(),
            include_author: false,
        }
    }

    /// Prefix relayed text with the LINE sender.
    pub fn with_include_author(mut self, include_author: bool) -> Self {
        self.include_author = include_author;
        self
    }

    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    /// Deliver every event of a webhook batch. Returns once all deliveries
    /// have settled; individual failures are only reflected in the report.
    pub async fn handle_batch(&self, events: Vec<RawMessage>) -> BatchReport {
        let count = events.len();
        let report = join_all(events.iter().map(|event| self.guarded_event(event)))
            .await
            .into_iter()
            .fold(BatchReport::default(), BatchReport::merge);
        info!(
            events = count,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            panics = report.panics,
            "line batch relayed"
        );
        report
    }

    /// A panic while resolving one event is contained to that event.
    async fn guarded_event(&self, event: &RawMessage) -> BatchReport {
        match AssertUnwindSafe(self.handle_event(event))
            .catch_unwind()
            .await
        {
            Ok(report) => report,
            Err(_) => {
                warn!(message_id = ?event.id, "line event handling panicked");
                BatchReport::panicked(1)
            },
        }
    }

    async fn handle_event(&self, event: &RawMessage) -> BatchReport {
        let mut report = BatchReport {
            events: 1,
            ..Default::default()
        };

        let units = self.normalizer.normalize(event, Direction::LineToDiscord);
        let outgoing = self.resolve(event, &units).await;
        if outgoing.is_empty() {
            debug!(message_id = ?event.id, "event has nothing to relay");
            report.skipped = 1;
            return report;
        }

        join_all(
            self.destinations
                .iter()
                .map(|channel_id| self.guarded_send_all(channel_id, event, &outgoing)),
        )
        .await
        .into_iter()
        .fold(report, BatchReport::merge)
    }

    /// A panicking adapter call ends delivery to that destination only.
    async fn guarded_send_all(
        &self,
        channel_id: &str,
        event: &RawMessage,
        outgoing: &[Outgoing],
    ) -> BatchReport {
        match AssertUnwindSafe(self.send_all(channel_id, event, outgoing))
            .catch_unwind()
            .await
        {
            Ok((sent, failed)) => BatchReport {
                sent,
                failed,
                ..Default::default()
            },
            Err(_) => {
                warn!(channel_id, message_id = ?event.id, "discord adapter panicked");
                BatchReport::panicked(0)
            },
        }
    }

    /// Turn units into payloads. Content-backed images are fetched once here
    /// and reused for every destination.
    async fn resolve(&self, event: &RawMessage, units: &[MessageUnit]) -> Vec<Outgoing> {
        let mut outgoing = Vec::with_capacity(units.len());
        for unit in units {
            match unit {
                MessageUnit::Text(text) => {
                    outgoing.push(Outgoing::Text(text.render(self.include_author)));
                },
                MessageUnit::Image(image) => match image.image() {
                    ImageRef::Url { original, .. } => {
                        outgoing.push(Outgoing::Image(ImagePayload::Url(original.clone())));
                    },
                    ImageRef::Content { message_id } => {
                        match self.fetcher.fetch_content(message_id).await {
                            Ok(data) => outgoing.push(Outgoing::Image(ImagePayload::upload(
                                image_filename(),
                                data,
                            ))),
                            Err(e) => {
                                warn!(
                                    message_id = ?event.id,
                                    content_id = %message_id,
                                    error = %e,
                                    "failed to fetch line image content"
                                );
                            },
                        }
                    },
                },
            }
        }
        outgoing
    }

    async fn send_all(
        &self,
        channel_id: &str,
        event: &RawMessage,
        outgoing: &[Outgoing],
    ) -> (usize, usize) {
        let (mut sent, mut failed) = (0, 0);
        for item in outgoing {
            let result = match item {
                Outgoing::Text(text) => self.outbound.send_text(channel_id, text).await,
                Outgoing::Image(image) => self.outbound.send_image(channel_id, image).await,
            };
            match result {
                Ok(()) => sent += 1,
                Err(e) => {
                    failed += 1;
                    warn!(
                        channel_id,
                        message_id = ?event.id,
                        kind = item.kind(),
                        error = %e,
                        "failed to relay to discord channel"
                    );
                },
            }
        }
        (sent, failed)
    }
}

/// Filename for a re-uploaded LINE image.
fn image_filename() -> String {
    format!("image-{}.jpg", chrono::Utc::now().timestamp_millis())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use {
        async_trait::async_trait,
        bytes::Bytes,
        linecord_channels::{Error, Result},
    };

    use {super::*, crate::normalize::RawAttachment};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Sent {
        Text(String),
        Image(ImagePayload),
    }

    #[derive(Default)]
    struct MockDiscord {
        sent: Mutex<Vec<(String, Sent)>>,
        failing: HashSet<String>,
    }

    impl MockDiscord {
        fn failing(channel: &str) -> Self {
            Self {
                failing: HashSet::from([channel.to_string()]),
                ..Default::default()
            }
        }

        fn sent_to(&self, channel: &str) -> Vec<Sent> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| c == channel)
                .map(|(_, s)| s.clone())
                .collect()
        }

        fn record(&self, channel_id: &str, sent: Sent) -> Result<()> {
            if self.failing.contains(channel_id) {
                return Err(Error::unavailable("channel gone"));
            }
            self.sent.lock().unwrap().push((channel_id.to_string(), sent));
            Ok(())
        }
    }

    #[async_trait]
    impl ChannelOutbound for MockDiscord {
        async fn send_text(&self, channel_id: &str, text: &str) -> Result<()> {
            if text == "boom" {
                panic!("adapter bug");
            }
            self.record(channel_id, Sent::Text(text.to_string()))
        }

        async fn send_image(&self, channel_id: &str, image: &ImagePayload) -> Result<()> {
            self.record(channel_id, Sent::Image(image.clone()))
        }
    }

    #[derive(Default)]
    struct MockContent {
        fetches: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ContentFetcher for MockContent {
        async fn fetch_content(&self, message_id: &str) -> Result<Bytes> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::api(404, "not found"));
            }
            Ok(Bytes::from(format!("jpeg:{message_id}")))
        }
    }

    fn fanout(
        discord: Arc<MockDiscord>,
        content: Arc<MockContent>,
        secondaries: &[&str],
    ) -> InboundFanout {
        InboundFanout::new(
            "primary",
            secondaries.iter().map(|s| s.to_string()),
            discord,
            content,
        )
    }

    fn image_event(id: &str) -> RawMessage {
        RawMessage {
            id: Some(id.into()),
            author: Some("U1".into()),
            attachments: vec![RawAttachment::line_image(id)],
            ..Default::default()
        }
    }

    #[test]
    fn destinations_start_with_primary_and_dedupe() {
        let f = fanout(
            Arc::default(),
            Arc::default(),
            &["a", "primary", " ", "b", "a"],
        );
        assert_eq!(f.destinations(), ["primary", "a", "b"]);
    }

    #[test]
    fn destination_ids_are_trimmed() {
        let f = InboundFanout::new(
            " 1001 ",
            [" 2002".to_string(), "1001".to_string()],
            Arc::new(MockDiscord::default()),
            Arc::new(MockContent::default()),
        );
        assert_eq!(f.destinations(), ["1001", "2002"]);
    }

    #[tokio::test]
    async fn failing_secondary_does_not_affect_others() {
        let discord = Arc::new(MockDiscord::failing("broken"));
        let f = fanout(discord.clone(), Arc::default(), &["broken", "ok"]);

        let events = ["one", "two", "three"]
            .into_iter()
            .map(|t| RawMessage::text(Some("U1".into()), t))
            .collect();
        let report = f.handle_batch(events).await;

        assert_eq!(report.events, 3);
        assert_eq!(report.sent, 6);
        assert_eq!(report.failed, 3);
        let mut primary = discord.sent_to("primary");
        primary.sort_by_key(|s| format!("{s:?}"));
        assert_eq!(primary, vec![
            Sent::Text("one".into()),
            Sent::Text("three".into()),
            Sent::Text("two".into()),
        ]);
        assert_eq!(discord.sent_to("ok").len(), 3);
    }

    #[tokio::test]
    async fn panicking_send_does_not_cancel_siblings() {
        let discord = Arc::new(MockDiscord::default());
        let f = fanout(discord.clone(), Arc::default(), &["second"]);

        let report = f
            .handle_batch(vec![
                RawMessage::text(None, "boom"),
                RawMessage::text(None, "fine"),
            ])
            .await;

        assert_eq!(report.events, 2);
        assert_eq!(report.panics, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.sent, 2);
        for channel in ["primary", "second"] {
            assert_eq!(discord.sent_to(channel), vec![Sent::Text("fine".into())]);
        }
    }

    #[tokio::test]
    async fn image_is_fetched_once_and_sent_everywhere() {
        let discord = Arc::new(MockDiscord::default());
        let content = Arc::new(MockContent::default());
        let f = fanout(discord.clone(), content.clone(), &["second"]);

        let report = f.handle_batch(vec![image_event("m1")]).await;

        assert_eq!(content.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(report.sent, 2);
        for channel in ["primary", "second"] {
            let sent = discord.sent_to(channel);
            assert_eq!(sent.len(), 1);
            let Sent::Image(ImagePayload::Upload { filename, data }) = &sent[0] else {
                panic!("expected uploaded image");
            };
            assert!(filename.starts_with("image-"));
            assert!(filename.ends_with(".jpg"));
            assert_eq!(data, &Bytes::from("jpeg:m1"));
        }
    }

    #[tokio::test]
    async fn failed_fetch_skips_the_image_only() {
        let discord = Arc::new(MockDiscord::default());
        let content = Arc::new(MockContent {
            fail: true,
            ..Default::default()
        });
        let f = fanout(discord.clone(), content, &[]);

        let mut event = image_event("m2");
        event.body = Some("caption".into());
        let report = f.handle_batch(vec![event]).await;

        assert_eq!(report.sent, 1);
        assert_eq!(discord.sent_to("primary"), vec![Sent::Text("caption".into())]);
    }

    #[tokio::test]
    async fn text_goes_out_before_images_per_destination() {
        let discord = Arc::new(MockDiscord::default());
        let f = fanout(discord.clone(), Arc::default(), &[]);

        let mut event = image_event("m3");
        event.body = Some("look".into());
        f.handle_batch(vec![event]).await;

        let sent = discord.sent_to("primary");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], Sent::Text("look".into()));
        assert!(matches!(sent[1], Sent::Image(_)));
    }

    #[tokio::test]
    async fn author_prefix_follows_policy() {
        let discord = Arc::new(MockDiscord::default());
        let f = fanout(discord.clone(), Arc::default(), &[]).with_include_author(true);

        f.handle_batch(vec![RawMessage::text(Some("U1".into()), "hi")])
            .await;

        assert_eq!(discord.sent_to("primary"), vec![Sent::Text("U1: hi".into())]);
    }

    #[tokio::test]
    async fn empty_batch_and_blank_events_send_nothing() {
        let discord = Arc::new(MockDiscord::default());
        let f = fanout(discord.clone(), Arc::default(), &["second"]);

        assert_eq!(f.handle_batch(Vec::new()).await, BatchReport::default());

        let report = f
            .handle_batch(vec![RawMessage::text(None, "   ")])
            .await;
        assert_eq!(report.skipped, 1);
        assert!(discord.sent.lock().unwrap().is_empty());
    }
}
