//! Per-connection client state and the server message dispatch loop.

use std::collections::VecDeque;

use bitstream::BitReader;
use schema::{net_fields_hash, NetFields, COMMAND_TIME_FIELD};
use tracing::{debug, trace, warn};
use wire::protocol::{CS_SYSTEMINFO, MAX_SPLITVIEW};
use wire::{DecodeError, ServerCommand};

use crate::baseline::{decode_baseline, BaselineTable};
use crate::download::{decode_download, DownloadChunk, DownloadState};
use crate::error::{CodecError, CodecResult};
use crate::gamestate::{decode_gamestate, read_config_index, GameState};
use crate::history::{Snapshot, SnapshotHistory};
use crate::limits::ClientLimits;
use crate::parse_ring::ParseEntities;
use crate::snapshot::{decode_snapshot, DecodedSnapshot, SnapshotContext, SnapshotRejection};
use crate::state::EntityState;
use crate::types::EntityNumber;
use crate::voip::{decode_voip, VoipPacket};

/// Ping reported when no outgoing packet matches.
pub const UNKNOWN_PING: i32 = 999;

/// Connection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No gamestate yet; snapshots and baselines are protocol errors.
    AwaitingGamestate,
    /// Bootstrapped; snapshots decode against baselines and history.
    Active,
}

/// One message as delivered by the transport.
#[derive(Debug, Clone, Copy)]
pub struct IncomingMessage<'a> {
    /// Transport sequence number, used as the snapshot message number.
    pub sequence: i32,
    /// Local clock in milliseconds when the message arrived.
    pub realtime: i32,
    pub data: &'a [u8],
}

/// What happened to one snapshot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Committed {
        message_num: i32,
        delta_num: i32,
        entity_count: usize,
        ping: i32,
    },
    Discarded(SnapshotRejection),
}

/// Summary of one parsed message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageReport {
    pub reliable_acknowledge: i32,
    /// Command tags in the order they were read, `Eof` excluded.
    pub commands: Vec<ServerCommand>,
    pub snapshots: Vec<SnapshotOutcome>,
}

#[derive(Debug, Clone, Copy)]
struct OutgoingPacket {
    server_time: i32,
    realtime: i32,
}

/// Everything the client keeps per connection.
///
/// Fatal errors from [`parse_server_message`](Self::parse_server_message)
/// clear all of it and return the session to
/// [`ConnectionState::AwaitingGamestate`].
#[derive(Debug)]
pub struct ClientSession {
    entity_fields: NetFields,
    player_fields: NetFields,
    limits: ClientLimits,
    wire_limits: wire::Limits,
    state: ConnectionState,
    baselines: BaselineTable,
    parse_entities: ParseEntities,
    history: SnapshotHistory,
    game_state: GameState,
    server_id: i32,
    server_command_sequence: i32,
    server_commands: Vec<Option<(i32, String)>>,
    reliable_sequence: i32,
    reliable_acknowledge: i32,
    outgoing: Vec<Option<OutgoingPacket>>,
    outgoing_sequence: i32,
    local_clients: [Option<u8>; MAX_SPLITVIEW],
    new_snapshot: bool,
    download: DownloadState,
    voip: VecDeque<VoipPacket>,
}

impl ClientSession {
    /// Creates a session awaiting its gamestate.
    pub fn new(
        entity_fields: NetFields,
        player_fields: NetFields,
        limits: ClientLimits,
    ) -> CodecResult<Self> {
        limits.validate()?;
        Ok(Self {
            baselines: BaselineTable::new(entity_fields.len()),
            parse_entities: ParseEntities::new(limits.parse_entities),
            history: SnapshotHistory::new(limits.packet_backup),
            game_state: GameState::with_limits(&limits),
            server_commands: vec![None; limits.max_reliable_commands],
            outgoing: vec![None; limits.packet_backup],
            entity_fields,
            player_fields,
            limits,
            wire_limits: wire::Limits::default(),
            state: ConnectionState::AwaitingGamestate,
            server_id: 0,
            server_command_sequence: 0,
            reliable_sequence: 0,
            reliable_acknowledge: 0,
            outgoing_sequence: 0,
            local_clients: [None; MAX_SPLITVIEW],
            new_snapshot: false,
            download: DownloadState::default(),
            voip: VecDeque::new(),
        })
    }

    /// Replaces the wire-level limits.
    #[must_use]
    pub fn with_wire_limits(mut self, wire_limits: wire::Limits) -> Self {
        self.wire_limits = wire_limits;
        self
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub const fn limits(&self) -> &ClientLimits {
        &self.limits
    }

    #[must_use]
    pub const fn entity_fields(&self) -> &NetFields {
        &self.entity_fields
    }

    #[must_use]
    pub const fn player_fields(&self) -> &NetFields {
        &self.player_fields
    }

    /// Drops all per-connection state.
    pub fn reset(&mut self) {
        self.clear_world();
        self.state = ConnectionState::AwaitingGamestate;
        self.game_state = GameState::with_limits(&self.limits);
        self.server_id = 0;
        self.server_command_sequence = 0;
        self.server_commands.fill(None);
        self.reliable_sequence = 0;
        self.reliable_acknowledge = 0;
        self.outgoing.fill(None);
        self.outgoing_sequence = 0;
        self.local_clients = [None; MAX_SPLITVIEW];
        self.download.reset();
        self.voip.clear();
    }

    fn clear_world(&mut self) {
        self.baselines.reset();
        self.parse_entities.reset();
        self.history.reset();
        self.new_snapshot = false;
    }

    /// Records a packet sent to the server, for ping estimation.
    ///
    /// `server_time` is the server time the client had when sending.
    pub fn record_outgoing_packet(&mut self, sequence: i32, server_time: i32, realtime: i32) {
        let index = ring_index(sequence, self.outgoing.len());
        self.outgoing[index] = Some(OutgoingPacket {
            server_time,
            realtime,
        });
        self.outgoing_sequence = sequence.wrapping_add(1);
    }

    /// Sets the newest reliable client command sequence the client has sent.
    pub fn set_reliable_sequence(&mut self, sequence: i32) {
        self.reliable_sequence = sequence;
    }

    #[must_use]
    pub const fn reliable_acknowledge(&self) -> i32 {
        self.reliable_acknowledge
    }

    /// Parses one server message.
    ///
    /// On error all per-connection state has already been cleared.
    pub fn parse_server_message(
        &mut self,
        message: &IncomingMessage<'_>,
    ) -> CodecResult<MessageReport> {
        let result = self.parse_commands(message);
        if let Err(err) = &result {
            warn!(sequence = message.sequence, error = %err, "dropping connection state");
            self.reset();
        }
        result
    }

    fn parse_commands(&mut self, message: &IncomingMessage<'_>) -> CodecResult<MessageReport> {
        wire::check_message_size(message.data, &self.wire_limits)?;
        let mut reader = BitReader::new(message.data);
        let mut report = MessageReport::default();

        let header = wire::decode_message_header(&mut reader)?;
        let max_commands = i32::try_from(self.limits.max_reliable_commands).unwrap_or(i32::MAX);
        self.reliable_acknowledge =
            if header.reliable_acknowledge < self.reliable_sequence.wrapping_sub(max_commands) {
                self.reliable_sequence
            } else {
                header.reliable_acknowledge
            };
        report.reliable_acknowledge = self.reliable_acknowledge;

        loop {
            if reader.is_empty() {
                return Err(DecodeError::MissingEof.into());
            }
            let tag = reader.read_u8()?;
            let command = ServerCommand::from_raw(tag)
                .filter(|c| *c != ServerCommand::Bad)
                .ok_or(DecodeError::UnknownCommand { tag })?;
            if command == ServerCommand::Eof {
                trace!(bit = reader.bit_position(), "END OF MESSAGE");
                break;
            }
            trace!(bit = reader.bit_position(), command = command.name(), "command");
            report.commands.push(command);

            match command {
                ServerCommand::Nop => {}
                ServerCommand::Gamestate => self.parse_gamestate(&mut reader)?,
                ServerCommand::ConfigString => self.parse_config_string(&mut reader)?,
                ServerCommand::Baseline => {
                    self.require_active(command)?;
                    decode_baseline(&self.entity_fields, &mut self.baselines, &mut reader)?;
                }
                ServerCommand::ReliableCommand => self.parse_command_string(&mut reader)?,
                ServerCommand::Download => {
                    decode_download(&mut self.download, &mut reader, &self.wire_limits)?;
                }
                ServerCommand::Snapshot => {
                    self.require_active(command)?;
                    let outcome = self.parse_snapshot(message, &mut reader)?;
                    report.snapshots.push(outcome);
                }
                ServerCommand::Voip => {
                    if let Some(packet) =
                        decode_voip(&mut reader, &self.wire_limits, &self.local_clients)?
                    {
                        self.voip.push_back(packet);
                    }
                }
                ServerCommand::Bad | ServerCommand::Eof => {
                    return Err(DecodeError::UnknownCommand { tag }.into());
                }
            }
        }
        Ok(report)
    }

    fn require_active(&self, command: ServerCommand) -> CodecResult<()> {
        match self.state {
            ConnectionState::Active => Ok(()),
            ConnectionState::AwaitingGamestate => Err(CodecError::NotBootstrapped { command }),
        }
    }

    fn parse_gamestate(&mut self, reader: &mut BitReader<'_>) -> CodecResult<()> {
        self.clear_world();
        let bootstrap = decode_gamestate(reader, &self.wire_limits, &self.limits)?;

        self.server_command_sequence = bootstrap.server_command_sequence;
        self.game_state = bootstrap.game_state;
        self.server_id = self.game_state.server_id();
        self.local_clients = bootstrap.client_nums;
        self.state = ConnectionState::Active;
        debug!(
            server_id = self.server_id,
            entity_fields = format_args!("{:016x}", net_fields_hash(&self.entity_fields)),
            player_fields = format_args!("{:016x}", net_fields_hash(&self.player_fields)),
            "bootstrapped"
        );
        Ok(())
    }

    fn parse_config_string(&mut self, reader: &mut BitReader<'_>) -> CodecResult<()> {
        let index = read_config_index(reader, &self.limits)?;
        let value = reader.read_string(self.wire_limits.max_big_string_chars)?;
        if self.game_state.replace(index, &value)? && index == CS_SYSTEMINFO {
            self.server_id = self.game_state.server_id();
        }
        Ok(())
    }

    fn parse_command_string(&mut self, reader: &mut BitReader<'_>) -> CodecResult<()> {
        let sequence = reader.read_i32()?;
        let text = reader.read_string(self.wire_limits.max_string_chars)?;
        if self.server_command_sequence >= sequence {
            trace!(sequence, "duplicate server command");
            return Ok(());
        }
        self.server_command_sequence = sequence;
        let index = ring_index(sequence, self.server_commands.len());
        self.server_commands[index] = Some((sequence, text));
        Ok(())
    }

    fn parse_snapshot(
        &mut self,
        message: &IncomingMessage<'_>,
        reader: &mut BitReader<'_>,
    ) -> CodecResult<SnapshotOutcome> {
        let ctx = SnapshotContext {
            entity_fields: &self.entity_fields,
            player_fields: &self.player_fields,
            limits: &self.limits,
            baselines: &self.baselines,
            parse_entities: &self.parse_entities,
            history: &self.history,
        };
        let decoded = decode_snapshot(&ctx, message.sequence, self.server_command_sequence, reader)?;
        if let Some(reason) = decoded.rejection {
            warn!(message_num = message.sequence, %reason, "discarding snapshot");
            return Ok(SnapshotOutcome::Discarded(reason));
        }
        Ok(self.commit_snapshot(decoded, message.realtime))
    }

    fn commit_snapshot(&mut self, decoded: DecodedSnapshot, realtime: i32) -> SnapshotOutcome {
        let DecodedSnapshot {
            mut snapshot,
            entities,
            ..
        } = decoded;

        if let Some(base) = self.history.get(snapshot.delta_num).filter(|_| snapshot.is_delta()) {
            for (slot, (old, new)) in base.views.iter().zip(&snapshot.views).enumerate() {
                if old.client_num != new.client_num {
                    debug!(slot, from = ?old.client_num, to = ?new.client_num, "local client changed");
                    self.local_clients[slot] = new.client_num;
                }
            }
        }

        snapshot.parse_entities_start = self.parse_entities.next_index();
        snapshot.entity_count = entities.len();
        for entity in entities {
            self.parse_entities.append(entity);
        }
        snapshot.ping = self.estimate_ping(&snapshot, realtime);

        debug!(
            snapshot = snapshot.message_num,
            delta = snapshot.delta_num,
            ping = snapshot.ping,
            entities = snapshot.entity_count,
            "committed"
        );
        let outcome = SnapshotOutcome::Committed {
            message_num: snapshot.message_num,
            delta_num: snapshot.delta_num,
            entity_count: snapshot.entity_count,
            ping: snapshot.ping,
        };
        self.history.commit(snapshot);
        self.new_snapshot = true;
        outcome
    }

    /// Scans sent packets from the newest backward for the first one the
    /// snapshot's command time has caught up with.
    fn estimate_ping(&self, snapshot: &Snapshot, realtime: i32) -> i32 {
        let command_time = self
            .player_fields
            .index_of(COMMAND_TIME_FIELD)
            .zip(snapshot.player_states.first())
            .map_or(snapshot.server_time, |(index, ps)| ps.fields.int(index));

        let len = self.outgoing.len();
        (0..len)
            .filter_map(|i| {
                let sequence = self
                    .outgoing_sequence
                    .wrapping_sub(1)
                    .wrapping_sub(i32::try_from(i).unwrap_or(i32::MAX));
                self.outgoing[ring_index(sequence, len)]
            })
            .find(|packet| command_time >= packet.server_time)
            .map_or(UNKNOWN_PING, |packet| realtime.wrapping_sub(packet.realtime))
    }

    /// Returns `true` once per newly committed snapshot.
    pub fn take_new_snapshot(&mut self) -> bool {
        std::mem::take(&mut self.new_snapshot)
    }

    /// Returns the most recently committed snapshot.
    #[must_use]
    pub fn latest_snapshot(&self) -> Option<&Snapshot> {
        self.history.latest()
    }

    /// Returns the snapshot for `message_num` if it is still valid.
    #[must_use]
    pub fn snapshot(&self, message_num: i32) -> Option<&Snapshot> {
        self.history.get(message_num)
    }

    #[must_use]
    pub const fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    /// Iterates over the entities of a committed snapshot.
    ///
    /// Entities that have been overwritten in the ring are skipped.
    pub fn snapshot_entities<'a>(
        &'a self,
        snapshot: &Snapshot,
    ) -> impl Iterator<Item = &'a EntityState> + 'a {
        self.parse_entities
            .span(snapshot.parse_entities_start, snapshot.entity_count)
    }

    /// Returns a parse-entities record by logical index.
    #[must_use]
    pub fn parse_entity(&self, index: u64) -> Option<&EntityState> {
        self.parse_entities.get(index)
    }

    #[must_use]
    pub fn baseline(&self, number: EntityNumber) -> Option<&EntityState> {
        self.baselines.get(number)
    }

    #[must_use]
    pub const fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Returns config string `index`.
    #[must_use]
    pub fn config_string(&self, index: usize) -> Option<&str> {
        self.game_state.get(index)
    }

    #[must_use]
    pub const fn server_id(&self) -> i32 {
        self.server_id
    }

    /// Newest reliable server command sequence received.
    #[must_use]
    pub const fn server_command_sequence(&self) -> i32 {
        self.server_command_sequence
    }

    /// Returns the reliable server command with `sequence` if it is still stored.
    #[must_use]
    pub fn server_command(&self, sequence: i32) -> Option<&str> {
        let index = ring_index(sequence, self.server_commands.len());
        match &self.server_commands[index] {
            Some((stored, text)) if *stored == sequence => Some(text),
            _ => None,
        }
    }

    /// Server client number of each local split view.
    #[must_use]
    pub const fn local_clients(&self) -> &[Option<u8>; MAX_SPLITVIEW] {
        &self.local_clients
    }

    #[must_use]
    pub const fn download(&self) -> &DownloadState {
        &self.download
    }

    /// Drains queued download chunks.
    pub fn take_download_chunks(&mut self) -> Vec<DownloadChunk> {
        self.download.take_chunks()
    }

    /// Drains queued voice packets.
    pub fn take_voip_packets(&mut self) -> Vec<VoipPacket> {
        self.voip.drain(..).collect()
    }
}

fn ring_index(sequence: i32, len: usize) -> usize {
    i64::from(sequence).rem_euclid(len.max(1) as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::FieldCodec;

    fn session() -> ClientSession {
        let entity_fields = NetFields::builder()
            .field("a", FieldCodec::uint(8))
            .build()
            .unwrap();
        let player_fields = NetFields::builder()
            .field(COMMAND_TIME_FIELD, FieldCodec::sint(32))
            .build()
            .unwrap();
        ClientSession::new(entity_fields, player_fields, ClientLimits::for_testing())
            .unwrap()
            .with_wire_limits(wire::Limits::for_testing())
    }

    fn message(data: &[u8]) -> IncomingMessage<'_> {
        IncomingMessage {
            sequence: 1,
            realtime: 0,
            data,
        }
    }

    #[test]
    fn starts_awaiting_gamestate() {
        let s = session();
        assert_eq!(s.state(), ConnectionState::AwaitingGamestate);
        assert!(s.latest_snapshot().is_none());
    }

    #[test]
    fn nop_then_eof() {
        let mut s = session();
        let data = [0, 0, 0, 7, 1, 8];
        let report = s.parse_server_message(&message(&data)).unwrap();
        assert_eq!(report.reliable_acknowledge, 7);
        assert_eq!(report.commands, vec![ServerCommand::Nop]);
    }

    #[test]
    fn missing_eof_is_fatal() {
        let mut s = session();
        let err = s.parse_server_message(&message(&[0, 0, 0, 0, 1])).unwrap_err();
        assert_eq!(err, CodecError::Wire(DecodeError::MissingEof));
    }

    #[test]
    fn bad_tag_is_fatal() {
        let mut s = session();
        let err = s.parse_server_message(&message(&[0, 0, 0, 0, 0])).unwrap_err();
        assert_eq!(err, CodecError::Wire(DecodeError::UnknownCommand { tag: 0 }));
        let err = s.parse_server_message(&message(&[0, 0, 0, 0, 42])).unwrap_err();
        assert_eq!(err, CodecError::Wire(DecodeError::UnknownCommand { tag: 42 }));
    }

    #[test]
    fn snapshot_before_gamestate_is_fatal() {
        let mut s = session();
        let err = s.parse_server_message(&message(&[0, 0, 0, 0, 7])).unwrap_err();
        assert_eq!(
            err,
            CodecError::NotBootstrapped {
                command: ServerCommand::Snapshot
            }
        );
    }

    #[test]
    fn stale_acknowledge_is_clamped() {
        let mut s = session();
        s.set_reliable_sequence(100);
        let report = s.parse_server_message(&message(&[0, 0, 0, 5, 8])).unwrap();
        assert_eq!(report.reliable_acknowledge, 100);
    }

    #[test]
    fn ring_index_wraps_negative() {
        assert_eq!(ring_index(-1, 8), 7);
        assert_eq!(ring_index(9, 8), 1);
    }
}
