//! Error types for wire format operations.

use std::fmt;

use bitstream::BitError;

/// Result type for wire format operations.
pub type WireResult<T> = Result<T, DecodeError>;

/// High-level decode errors for message framing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The message ran out of bits mid-field.
    Bitstream(BitError),

    /// Message is larger than the configured bound.
    MessageTooLarge { actual: usize, limit: usize },

    /// Unknown command byte encountered.
    UnknownCommand { tag: u8 },

    /// The message ended without an end-of-message command.
    MissingEof,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitstream(err) => write!(f, "read past end of server message: {err}"),
            Self::MessageTooLarge { actual, limit } => {
                write!(f, "message too large: {actual} bytes > {limit}")
            }
            Self::UnknownCommand { tag } => {
                write!(f, "illegible server message: unknown command byte {tag}")
            }
            Self::MissingEof => write!(f, "server message ended without end-of-message"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bitstream(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BitError> for DecodeError {
    fn from(err: BitError) -> Self {
        Self::Bitstream(err)
    }
}
