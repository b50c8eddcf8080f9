//! Channel adapter contracts.
//!
//! The relay core only talks to the two platforms through these traits:
//! Discord implements [`ChannelOutbound`], LINE implements
//! [`BroadcastOutbound`] and [`ContentFetcher`].

pub mod adapter;
pub mod error;

pub use {
    adapter::{BroadcastOutbound, ChannelOutbound, ContentFetcher, ImagePayload},
    error::{Error, Result},
};
