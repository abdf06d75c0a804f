//! Per-connection capacities.

use wire::protocol::{
    MAX_CONFIGSTRINGS, MAX_GAMESTATE_CHARS, MAX_RELIABLE_COMMANDS, MAX_SNAPSHOT_ENTITIES,
    MAX_SPLITVIEW, PACKET_BACKUP,
};

use crate::error::{CodecError, CodecResult};

/// Capacities of the structures a [`ClientSession`](crate::ClientSession) owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientLimits {
    /// Snapshot history depth, also the outgoing packet window.
    pub packet_backup: usize,
    /// Most entities one snapshot may carry.
    pub max_snapshot_entities: usize,
    /// Parse-entities ring capacity.
    pub parse_entities: usize,
    /// Number of config string slots.
    pub max_configstrings: usize,
    /// Size of the packed config string buffer, terminators included.
    pub max_gamestate_chars: usize,
    /// Reliable server command ring depth.
    pub max_reliable_commands: usize,
}

impl Default for ClientLimits {
    fn default() -> Self {
        Self {
            packet_backup: PACKET_BACKUP,
            max_snapshot_entities: MAX_SNAPSHOT_ENTITIES,
            parse_entities: MAX_SPLITVIEW * PACKET_BACKUP * MAX_SNAPSHOT_ENTITIES,
            max_configstrings: MAX_CONFIGSTRINGS,
            max_gamestate_chars: MAX_GAMESTATE_CHARS,
            max_reliable_commands: MAX_RELIABLE_COMMANDS,
        }
    }
}

impl ClientLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            packet_backup: 8,
            max_snapshot_entities: 16,
            parse_entities: MAX_SPLITVIEW * 8 * 16,
            max_configstrings: 64,
            max_gamestate_chars: 2048,
            max_reliable_commands: 8,
        }
    }

    /// Entities that must stay addressable behind the write counter for a
    /// base snapshot to be usable.
    #[must_use]
    pub const fn parse_entities_margin(&self) -> usize {
        self.parse_entities
            .saturating_sub(self.max_snapshot_entities * MAX_SPLITVIEW)
    }

    /// Checks that the capacities are usable together.
    pub fn validate(&self) -> CodecResult<()> {
        if self.packet_backup == 0 {
            return Err(CodecError::InvalidLimits {
                reason: "packet_backup must be non-zero",
            });
        }
        if self.max_snapshot_entities == 0 {
            return Err(CodecError::InvalidLimits {
                reason: "max_snapshot_entities must be non-zero",
            });
        }
        if self.parse_entities < self.max_snapshot_entities * MAX_SPLITVIEW {
            return Err(CodecError::InvalidLimits {
                reason: "parse_entities must hold one snapshot per split view",
            });
        }
        if self.max_reliable_commands == 0 {
            return Err(CodecError::InvalidLimits {
                reason: "max_reliable_commands must be non-zero",
            });
        }
        if self.max_gamestate_chars == 0 {
            return Err(CodecError::InvalidLimits {
                reason: "max_gamestate_chars must be non-zero",
            });
        }
        Ok(())
    }
}
