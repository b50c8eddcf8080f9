//! Shared types used across all linecord crates.

pub mod text;
pub mod types;

pub use types::{DeliveryOutcome, Direction, ImageRef, ImageUnit, MessageUnit, TextUnit};
