//! Host serial protocol: fixed-width mode bytes and key/value lines.
//!
//! Fire-and-forget.  Nothing is ever written back on the link; malformed
//! input is dropped and the previous state kept.

pub mod command;
pub mod decoder;

pub use command::{Command, Key, LedColour, Mode, Setting};
pub use decoder::{Decoded, DropReason, SerialCommandDecoder};
