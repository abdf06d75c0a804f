//! Server-side message writer.
//!
//! Produces messages in exactly the layout [`ClientSession`](crate::ClientSession)
//! reads. Used by tests, benches and the demo synthesizer.

use bitstream::BitWriter;
use schema::NetFields;
use wire::protocol::{MAX_MAP_AREA_BYTES, MAX_SPLITVIEW};
use wire::{MessageHeader, ServerCommand, SnapFlags, SnapshotHeader};

use crate::baseline::BaselineTable;
use crate::delta::{encode_entity_delta, encode_player_delta};
use crate::download::encode_download;
use crate::error::{CodecError, CodecResult};
use crate::gamestate::{encode_gamestate, GameState};
use crate::packet_entities::encode_packet_entities;
use crate::state::{EntityState, PlayerState};
use crate::voip::{encode_voip, VoipPacket};

/// One local view of a snapshot as the server sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFrame {
    pub client_num: u8,
    pub area_mask: Vec<u8>,
    pub player_state: PlayerState,
}

/// Server-side content of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotFrame {
    pub server_time: i32,
    pub flags: SnapFlags,
    /// At most [`MAX_SPLITVIEW`] views; view `i` is sent in slot `i`.
    pub views: Vec<ViewFrame>,
    /// Strictly ascending by number.
    pub entities: Vec<EntityState>,
}

/// A frame the client is known to have, and how many messages ago it was sent.
#[derive(Debug, Clone, Copy)]
pub struct DeltaBase<'a> {
    pub frame: &'a SnapshotFrame,
    pub offset: u8,
}

/// Builds one server message.
#[derive(Debug)]
pub struct ServerMessageWriter<'a> {
    entity_fields: &'a NetFields,
    player_fields: &'a NetFields,
    writer: BitWriter,
}

impl<'a> ServerMessageWriter<'a> {
    /// Starts a message with its reliable acknowledge header.
    #[must_use]
    pub fn new(
        entity_fields: &'a NetFields,
        player_fields: &'a NetFields,
        reliable_acknowledge: i32,
    ) -> Self {
        let mut writer = BitWriter::new();
        wire::encode_message_header(
            &MessageHeader {
                reliable_acknowledge,
            },
            &mut writer,
        );
        Self {
            entity_fields,
            player_fields,
            writer,
        }
    }

    fn tag(&mut self, command: ServerCommand) {
        self.writer.write_u8(command.raw());
    }

    pub fn nop(&mut self) -> &mut Self {
        self.tag(ServerCommand::Nop);
        self
    }

    pub fn gamestate(
        &mut self,
        server_command_sequence: i32,
        game_state: &GameState,
        client_nums: &[Option<u8>; MAX_SPLITVIEW],
    ) -> CodecResult<&mut Self> {
        self.tag(ServerCommand::Gamestate);
        encode_gamestate(server_command_sequence, game_state, client_nums, &mut self.writer)?;
        Ok(self)
    }

    pub fn config_string(&mut self, index: u16, value: &str) -> &mut Self {
        self.tag(ServerCommand::ConfigString);
        self.writer.write_i16(index as i16);
        self.writer.write_string(value);
        self
    }

    /// Writes a baseline as a forced delta from the all-zero state.
    pub fn baseline(&mut self, state: &EntityState) -> CodecResult<&mut Self> {
        self.tag(ServerCommand::Baseline);
        let zero = EntityState::zeroed(state.number, self.entity_fields.len());
        encode_entity_delta(self.entity_fields, &zero, Some(state), true, &mut self.writer)?;
        Ok(self)
    }

    pub fn server_command(&mut self, sequence: i32, text: &str) -> &mut Self {
        self.tag(ServerCommand::ReliableCommand);
        self.writer.write_i32(sequence);
        self.writer.write_string(text);
        self
    }

    /// Writes a snapshot, delta compressed against `base` when given.
    ///
    /// New entities are sent against `baselines`.
    pub fn snapshot(
        &mut self,
        frame: &SnapshotFrame,
        base: Option<DeltaBase<'_>>,
        baselines: &BaselineTable,
    ) -> CodecResult<&mut Self> {
        if frame.views.len() > MAX_SPLITVIEW {
            return Err(CodecError::TooManyViews {
                count: frame.views.len(),
                max: MAX_SPLITVIEW,
            });
        }
        self.tag(ServerCommand::Snapshot);
        wire::encode_snapshot_header(
            &SnapshotHeader {
                server_time: frame.server_time,
                delta_offset: base.map_or(0, |b| b.offset),
                flags: frame.flags,
            },
            &mut self.writer,
        );

        self.writer.write_u8(frame.views.len() as u8);
        for slot in 0..MAX_SPLITVIEW {
            match frame.views.get(slot) {
                Some(view) => {
                    let len = view.area_mask.len().min(MAX_MAP_AREA_BYTES);
                    self.writer.write_u8(slot as u8);
                    self.writer.write_u8(view.client_num);
                    self.writer.write_u8(len as u8);
                    self.writer.write_data(&view.area_mask[..len]);
                }
                None => {
                    self.writer.write_u8(u8::MAX);
                    self.writer.write_u8(u8::MAX);
                    self.writer.write_u8(0);
                }
            }
        }

        for (slot, view) in frame.views.iter().enumerate() {
            let from = base
                .and_then(|b| b.frame.views.get(slot))
                .map(|v| &v.player_state);
            encode_player_delta(self.player_fields, from, &view.player_state, &mut self.writer)?;
        }

        let from = base.map_or(&[][..], |b| b.frame.entities.as_slice());
        encode_packet_entities(
            self.entity_fields,
            from,
            &frame.entities,
            baselines,
            &mut self.writer,
        )?;
        Ok(self)
    }

    pub fn download(&mut self, block: u16, total_size: Option<i32>, data: &[u8]) -> &mut Self {
        self.tag(ServerCommand::Download);
        encode_download(block, total_size, data, &mut self.writer);
        self
    }

    pub fn voip(&mut self, packet: &VoipPacket) -> CodecResult<&mut Self> {
        self.tag(ServerCommand::Voip);
        encode_voip(packet, &mut self.writer)?;
        Ok(self)
    }

    /// Writes the end-of-message tag and returns the bytes.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.tag(ServerCommand::Eof);
        self.writer.finish()
    }
}
