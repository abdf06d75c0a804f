//! Snapshot delta decoding, history and gamestate bootstrap for the qsnap client.
//!
//! This is the main codec crate that ties together bitstream, wire, and schema
//! to turn a stream of lossy, delta-compressed server messages into a
//! sequence of complete snapshots.
//!
//! # Features
//!
//! - Entity and player-state delta decoding over declarative field tables
//! - Baseline table populated during bootstrap
//! - Parse-entities ring and snapshot history keyed by message number
//! - Packet-entities merge against a delta base
//! - Gamestate bootstrap, config strings and reliable server commands
//! - A per-connection [`ClientSession`] driving the dispatch loop
//! - A server-side [`ServerMessageWriter`] producing the same layout
//!
//! # Design Principles
//!
//! - **Correctness first** - All invariants are documented and tested.
//! - **Fatal versus recoverable** - [`CodecError`] drops the connection state,
//!   [`SnapshotRejection`] only discards one snapshot.
//! - **Byte-exact parsing** - Discarded snapshots are still read to the end so
//!   the rest of the message stays framed.

mod baseline;
mod delta;
mod download;
mod error;
mod gamestate;
mod history;
mod limits;
mod message;
mod packet_entities;
mod parse_ring;
mod session;
mod snapshot;
mod state;
mod types;
mod voip;

pub use baseline::{decode_baseline, BaselineTable};
pub use delta::{
    angle_from_quantized, angle_to_quantized, decode_entity_delta, decode_player_delta,
    encode_entity_delta, encode_player_delta, EntityDelta,
};
pub use download::{decode_download, encode_download, DownloadChunk, DownloadState};
pub use error::{CodecError, CodecResult};
pub use gamestate::{decode_gamestate, encode_gamestate, info_value_for_key, Bootstrap, GameState};
pub use history::{Snapshot, SnapshotHistory, ViewSlot};
pub use limits::ClientLimits;
pub use message::{DeltaBase, ServerMessageWriter, SnapshotFrame, ViewFrame};
pub use packet_entities::{decode_packet_entities, encode_packet_entities, first_order_violation};
pub use parse_ring::ParseEntities;
pub use session::{
    ClientSession, ConnectionState, IncomingMessage, MessageReport, SnapshotOutcome, UNKNOWN_PING,
};
pub use snapshot::{decode_snapshot, DecodedSnapshot, SnapshotContext, SnapshotRejection};
pub use state::{EntityState, FieldBlock, PlayerState};
pub use types::EntityNumber;
pub use voip::{decode_voip, encode_voip, VoipPacket};
pub use wire::Limits as WireLimits;
