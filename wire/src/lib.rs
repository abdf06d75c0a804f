//! Protocol constants, command framing and message headers for the qsnap client.
//!
//! This crate handles the framing of server-to-client messages: the leading
//! message header, command tags, the fixed snapshot header and the limits
//! applied before any length the server sends is trusted. It does not know
//! about entity or player state layouts.
//!
//! # Design Principles
//!
//! - **Shared constants** - Every capacity both ends must agree on lives in [`protocol`].
//! - **Bounded decoding** - Lengths are validated against [`Limits`] before use.
//! - **No domain knowledge** - This crate handles framing, not game logic.

mod command;
mod error;
mod header;
mod limits;
pub mod protocol;

pub use command::ServerCommand;
pub use error::{DecodeError, WireResult};
pub use header::{
    decode_message_header, decode_snapshot_header, encode_message_header, encode_snapshot_header,
    MessageHeader, SnapFlags, SnapshotHeader,
};
pub use limits::Limits;

/// Checks a received message against the size bound before parsing starts.
pub fn check_message_size(bytes: &[u8], limits: &Limits) -> WireResult<()> {
    if bytes.len() > limits.max_message_bytes {
        return Err(DecodeError::MessageTooLarge {
            actual: bytes.len(),
            limit: limits.max_message_bytes,
        });
    }
    Ok(())
}
