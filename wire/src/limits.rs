//! Configurable limits for bounded decoding.

use crate::protocol::{BIG_INFO_STRING, MAX_MSGLEN, MAX_STRING_CHARS, MAX_VOIP_PACKET};

/// Wire-level limits for message decoding.
///
/// These bound every length the server controls before the client trusts it.
/// Structure-level capacities (history depth, ring size) belong to the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum message size in bytes.
    pub max_message_bytes: usize,

    /// Bound for ordinary strings, terminator included.
    pub max_string_chars: usize,

    /// Bound for big info strings, terminator included.
    pub max_big_string_chars: usize,

    /// Voice payloads above this are skipped rather than queued.
    pub max_voip_packet_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_message_bytes: MAX_MSGLEN,
            max_string_chars: MAX_STRING_CHARS,
            max_big_string_chars: BIG_INFO_STRING,
            max_voip_packet_bytes: MAX_VOIP_PACKET,
        }
    }
}

impl Limits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_message_bytes: 4096,
            max_string_chars: 256,
            max_big_string_chars: 1024,
            max_voip_packet_bytes: 64,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_message_bytes: usize::MAX,
            max_string_chars: usize::MAX,
            max_big_string_chars: usize::MAX,
            max_voip_packet_bytes: usize::MAX,
        }
    }
}
