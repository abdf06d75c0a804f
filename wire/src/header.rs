//! Message and snapshot header layouts.

use bitstream::{BitReader, BitWriter};

use crate::error::WireResult;

/// Snapshot flags sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SnapFlags(u8);

impl SnapFlags {
    /// The server withheld this snapshot's predecessor to honor the client rate.
    pub const RATE_DELAYED: u8 = 1 << 0;

    /// The client is not yet active on the server (still loading).
    pub const NOT_ACTIVE: u8 = 1 << 1;

    /// Toggled on every server restart.
    pub const SERVERCOUNT: u8 = 1 << 2;

    /// Creates new flags from a raw value.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw flag bits.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Returns `true` if the server delayed the previous snapshot.
    #[must_use]
    pub const fn is_rate_delayed(self) -> bool {
        self.0 & Self::RATE_DELAYED != 0
    }

    /// Returns `true` if the client is not active on the server.
    #[must_use]
    pub const fn is_not_active(self) -> bool {
        self.0 & Self::NOT_ACTIVE != 0
    }

    /// Returns the server-count toggle bit.
    #[must_use]
    pub const fn server_count(self) -> bool {
        self.0 & Self::SERVERCOUNT != 0
    }
}

/// Fields preceding the command stream of every server message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Last client reliable command the server has seen.
    pub reliable_acknowledge: i32,
}

/// Fixed fields at the start of a snapshot record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Server time the snapshot is valid for, in milliseconds.
    pub server_time: i32,
    /// Distance back to the delta base message; zero means a full snapshot.
    pub delta_offset: u8,
    pub flags: SnapFlags,
}

impl SnapshotHeader {
    /// Returns the absolute sequence number of the delta base, or -1 when the
    /// snapshot is self-contained.
    #[must_use]
    pub const fn delta_num(&self, message_num: i32) -> i32 {
        if self.delta_offset == 0 {
            -1
        } else {
            message_num.wrapping_sub(self.delta_offset as i32)
        }
    }
}

/// Decodes the message header.
pub fn decode_message_header(reader: &mut BitReader<'_>) -> WireResult<MessageHeader> {
    Ok(MessageHeader {
        reliable_acknowledge: reader.read_i32()?,
    })
}

/// Encodes the message header.
pub fn encode_message_header(header: &MessageHeader, writer: &mut BitWriter) {
    writer.write_i32(header.reliable_acknowledge);
}

/// Decodes the fixed snapshot header that follows the snapshot command byte.
pub fn decode_snapshot_header(reader: &mut BitReader<'_>) -> WireResult<SnapshotHeader> {
    let server_time = reader.read_i32()?;
    let delta_offset = reader.read_u8()?;
    let flags = SnapFlags::from_raw(reader.read_u8()?);
    Ok(SnapshotHeader {
        server_time,
        delta_offset,
        flags,
    })
}

/// Encodes the fixed snapshot header.
pub fn encode_snapshot_header(header: &SnapshotHeader, writer: &mut BitWriter) {
    writer.write_i32(header.server_time);
    writer.write_u8(header.delta_offset);
    writer.write_u8(header.flags.raw());
}
