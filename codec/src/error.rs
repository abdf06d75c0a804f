//! Error types for codec operations.
//!
//! Every [`CodecError`] is fatal for the connection: the session drops all
//! per-connection state when one escapes. Problems that only invalidate a
//! single snapshot are reported as [`SnapshotRejection`](crate::SnapshotRejection)
//! instead and never surface here.

use std::fmt;

use wire::ServerCommand;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during message decoding or encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// Wire framing error.
    Wire(wire::DecodeError),

    /// Bitstream error (read past end of message).
    Bitstream(bitstream::BitError),

    /// A snapshot or baseline arrived before any gamestate.
    NotBootstrapped { command: ServerCommand },

    /// Entity number outside `[0, MAX_GENTITIES)` or equal to the sentinel.
    EntityNumberOutOfRange { number: u32 },

    /// Delta change count larger than the field table.
    InvalidChangeCount { count: u8, fields: usize },

    /// Field value does not fit its declared width.
    InvalidValue { field: String, value: u32, bits: u8 },

    /// Field block length does not match the table.
    FieldCountMismatch { expected: usize, actual: usize },

    /// Config string index outside the table.
    ConfigStringIndex { index: i32, max: usize },

    /// Config string data exceeded the gamestate buffer.
    GamestateOverflow { needed: usize, limit: usize },

    /// Area mask longer than the fixed mask size.
    AreaMaskTooLarge { len: usize, max: usize },

    /// The server refused a download.
    DownloadRefused { reason: String },

    /// Download chunk size out of range.
    DownloadChunkSize { size: i32, max: usize },

    /// Entities handed to the encoder are not strictly ascending.
    InvalidEntityOrder { previous: u16, current: u16 },

    /// A snapshot frame names more views than the protocol carries.
    TooManyViews { count: usize, max: usize },

    /// Client limits are inconsistent.
    InvalidLimits { reason: &'static str },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(e) => write!(f, "wire error: {e}"),
            Self::Bitstream(e) => write!(f, "bitstream error: {e}"),
            Self::NotBootstrapped { command } => {
                write!(f, "received unexpected {} before gamestate", command.name())
            }
            Self::EntityNumberOutOfRange { number } => {
                write!(f, "entity number out of range: {number}")
            }
            Self::InvalidChangeCount { count, fields } => {
                write!(f, "invalid delta change count {count} for {fields} fields")
            }
            Self::InvalidValue { field, value, bits } => {
                write!(f, "value {value:#x} for field '{field}' does not fit {bits} bits")
            }
            Self::FieldCountMismatch { expected, actual } => {
                write!(f, "field block has {actual} values, table has {expected}")
            }
            Self::ConfigStringIndex { index, max } => {
                write!(f, "configstring index {index} not below {max}")
            }
            Self::GamestateOverflow { needed, limit } => {
                write!(f, "gamestate chars exceeded: {needed} > {limit}")
            }
            Self::AreaMaskTooLarge { len, max } => {
                write!(f, "invalid size {len} for areamask (max {max})")
            }
            Self::DownloadRefused { reason } => write!(f, "download refused: {reason}"),
            Self::DownloadChunkSize { size, max } => {
                write!(f, "invalid size {size} for download chunk (max {max})")
            }
            Self::InvalidEntityOrder { previous, current } => {
                write!(f, "entity order invalid: {previous} then {current}")
            }
            Self::TooManyViews { count, max } => {
                write!(f, "snapshot frame has {count} views (max {max})")
            }
            Self::InvalidLimits { reason } => write!(f, "invalid client limits: {reason}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Wire(e) => Some(e),
            Self::Bitstream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wire::DecodeError> for CodecError {
    fn from(err: wire::DecodeError) -> Self {
        Self::Wire(err)
    }
}

impl From<bitstream::BitError> for CodecError {
    fn from(err: bitstream::BitError) -> Self {
        Self::Bitstream(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_not_bootstrapped() {
        let err = CodecError::NotBootstrapped {
            command: ServerCommand::Snapshot,
        };
        assert!(err.to_string().contains("svc_snapshot"));
    }

    #[test]
    fn error_display_change_count() {
        let err = CodecError::InvalidChangeCount {
            count: 60,
            fields: 51,
        };
        let msg = err.to_string();
        assert!(msg.contains("60"));
        assert!(msg.contains("51"));
    }

    #[test]
    fn error_from_bit_error() {
        let err: CodecError = bitstream::BitError::UnexpectedEof {
            requested: 8,
            available: 3,
        }
        .into();
        assert!(matches!(err, CodecError::Bitstream(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn error_from_wire_error() {
        let err: CodecError = wire::DecodeError::UnknownCommand { tag: 77 }.into();
        assert!(err.to_string().contains("77"));
    }
}
