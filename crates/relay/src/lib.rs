//! The bridge core.
//!
//! - [`normalize`] turns platform messages into [`MessageUnit`]s.
//! - [`queue`] serializes paced LINE broadcasts, one in flight at a time.
//! - [`fanout`] dispatches LINE webhook batches to every Discord destination.
//!
//! [`MessageUnit`]: linecord_common::MessageUnit

pub mod fanout;
pub mod normalize;
pub mod queue;

pub use {
    fanout::{BatchReport, InboundFanout},
    normalize::{AttachmentSource, Normalizer, RawAttachment, RawMessage, strip_mentions},
    queue::{RelayQueue, RelayStats},
};
