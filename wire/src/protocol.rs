//! Protocol-wide constants shared by server and client.
//!
//! These values are part of the wire contract: both ends must agree on them
//! or message framing breaks.

/// Bits used to send an entity number.
pub const GENTITYNUM_BITS: u8 = 10;

/// Number of addressable entities.
pub const MAX_GENTITIES: usize = 1 << GENTITYNUM_BITS;

/// Entity number that terminates a packet-entities list and marks removals.
pub const ENTITYNUM_NONE: u16 = (MAX_GENTITIES - 1) as u16;

/// Snapshots and outgoing packets remembered for delta decoding and ping.
pub const PACKET_BACKUP: usize = 32;

/// Local split-screen viewpoints carried by every snapshot.
pub const MAX_SPLITVIEW: usize = 4;

/// Highest server-side client number plus one.
pub const MAX_CLIENTS: usize = 64;

/// Entities a single snapshot may reference.
pub const MAX_SNAPSHOT_ENTITIES: usize = 256;

/// Config string slots.
pub const MAX_CONFIGSTRINGS: usize = 1024;

/// Bytes available for all config strings together.
pub const MAX_GAMESTATE_CHARS: usize = 16000;

/// Config string carrying the server info string.
pub const CS_SERVERINFO: usize = 0;

/// Config string carrying the system info string.
pub const CS_SYSTEMINFO: usize = 1;

/// Bytes of portal area visibility per split view.
pub const MAX_MAP_AREA_BYTES: usize = 32;

/// Ordinary string bound, terminator included.
pub const MAX_STRING_CHARS: usize = 1024;

/// Big info string bound, terminator included.
pub const BIG_INFO_STRING: usize = 8192;

/// Largest message the server sends.
pub const MAX_MSGLEN: usize = 16384;

/// Reliable server commands remembered by the client.
pub const MAX_RELIABLE_COMMANDS: usize = 64;

/// Bits of voice flags per voice packet.
pub const VOIP_FLAGCNT: u8 = 2;

/// Largest voice payload accepted before it is skipped.
pub const MAX_VOIP_PACKET: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_last_entity_number() {
        assert_eq!(usize::from(ENTITYNUM_NONE), MAX_GENTITIES - 1);
        assert_eq!(MAX_GENTITIES, 1024);
    }

    #[test]
    fn packet_backup_is_power_of_two() {
        assert!(PACKET_BACKUP.is_power_of_two());
    }
}
