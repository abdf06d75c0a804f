//! Deterministic demo synthesis.

use codec::{
    BaselineTable, CodecResult, DeltaBase, EntityNumber, EntityState, GameState, PlayerState,
    ServerMessageWriter, SnapshotFrame, ViewFrame,
};
use schema::{NetFields, COMMAND_TIME_FIELD};
use wire::protocol::{CS_SERVERINFO, CS_SYSTEMINFO, MAX_CONFIGSTRINGS, MAX_GAMESTATE_CHARS};

use crate::demo::DemoMessage;

/// Shape of a synthesized demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthConfig {
    /// Snapshot messages after the gamestate.
    pub frames: usize,
    pub entities: u16,
    /// Milliseconds between snapshots.
    pub frame_msec: i32,
    /// A full snapshot is sent every this many frames.
    pub keyframe_interval: usize,
    /// Leave every n-th snapshot out of the stream, as if lost.
    pub drop_every: Option<usize>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            frames: 64,
            entities: 32,
            frame_msec: 50,
            keyframe_interval: 16,
            drop_every: None,
        }
    }
}

struct Layout {
    origin_x: usize,
    origin_y: usize,
    etype: usize,
    model: usize,
    anim_frame: usize,
    command_time: usize,
    player_x: usize,
}

impl Layout {
    fn new(entity_fields: &NetFields, player_fields: &NetFields) -> Self {
        let entity = |name: &str| entity_fields.index_of(name).unwrap_or(0);
        let player = |name: &str| player_fields.index_of(name).unwrap_or(0);
        Self {
            origin_x: entity("pos.trBase[0]"),
            origin_y: entity("pos.trBase[1]"),
            etype: entity("eType"),
            model: entity("modelindex"),
            anim_frame: entity("frame"),
            command_time: player(COMMAND_TIME_FIELD),
            player_x: player("origin[0]"),
        }
    }
}

/// Builds a gamestate message followed by `config.frames` snapshot messages
/// over the stock field tables.
pub fn synthesize(config: &SynthConfig) -> CodecResult<Vec<DemoMessage>> {
    let entity_fields = schema::entity_fields();
    let player_fields = schema::player_fields();
    let layout = Layout::new(&entity_fields, &player_fields);

    let mut game_state = GameState::new(MAX_CONFIGSTRINGS, MAX_GAMESTATE_CHARS);
    game_state.set(CS_SERVERINFO, "\\mapname\\synth\\sv_hostname\\qsnap")?;
    game_state.set(CS_SYSTEMINFO, "\\sv_serverid\\1")?;

    let mut baselines = BaselineTable::new(entity_fields.len());
    let mut writer = ServerMessageWriter::new(&entity_fields, &player_fields, 0);
    writer.gamestate(0, &game_state, &[Some(0), None, None, None])?;
    for index in 0..config.entities {
        let mut state = EntityState::zeroed(EntityNumber::new(index + 1), entity_fields.len());
        state.fields.set_word(layout.etype, u32::from(index % 4) + 1);
        state.fields.set_word(layout.model, u32::from(index % 8) + 1);
        writer.baseline(&state)?;
        baselines.set(state)?;
    }
    let mut messages = vec![DemoMessage {
        sequence: 1,
        data: writer.finish(),
    }];

    let mut previous: Option<SnapshotFrame> = None;
    for frame_index in 0..config.frames {
        let sequence = i32::try_from(frame_index).unwrap_or(i32::MAX - 2) + 2;
        let server_time = 1000 + sequence * config.frame_msec;
        let frame = build_frame(
            config,
            &layout,
            &player_fields,
            &baselines,
            frame_index,
            server_time,
        );

        let keyframe =
            config.keyframe_interval == 0 || frame_index % config.keyframe_interval == 0;
        let base = previous
            .as_ref()
            .filter(|_| !keyframe)
            .map(|prev| DeltaBase {
                frame: prev,
                offset: 1,
            });
        let mut writer = ServerMessageWriter::new(&entity_fields, &player_fields, 0);
        writer.snapshot(&frame, base, &baselines)?;
        let data = writer.finish();

        let dropped = config
            .drop_every
            .is_some_and(|n| n > 0 && (frame_index + 1) % n == 0);
        if !dropped {
            messages.push(DemoMessage { sequence, data });
        }
        previous = Some(frame);
    }
    Ok(messages)
}

fn build_frame(
    config: &SynthConfig,
    layout: &Layout,
    player_fields: &NetFields,
    baselines: &BaselineTable,
    frame_index: usize,
    server_time: i32,
) -> SnapshotFrame {
    let step = frame_index as f32;
    let entities = (0..config.entities)
        // one entity in seven leaves the view each frame
        .filter(|index| usize::from(*index) % 7 != frame_index % 7)
        .filter_map(|index| {
            let number = EntityNumber::new(index + 1);
            let mut state = baselines.get(number)?.clone();
            state.fields.set_float(layout.origin_x, f32::from(index) * 64.0 + step * 4.0);
            state.fields.set_float(layout.origin_y, f32::from(index % 5) * 32.0);
            if index % 3 == 0 {
                state.fields.set_word(layout.anim_frame, (frame_index % 20) as u32);
            }
            Some(state)
        })
        .collect();

    let mut player_state = PlayerState::zeroed(player_fields.len());
    player_state.fields.set_int(layout.command_time, server_time - 8);
    player_state.fields.set_float(layout.player_x, step * 10.0);

    SnapshotFrame {
        server_time,
        views: vec![ViewFrame {
            client_num: 0,
            area_mask: vec![0xFF; 4],
            player_state,
        }],
        entities,
        ..SnapshotFrame::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::{ClientLimits, ClientSession, IncomingMessage, SnapshotOutcome};

    fn run(messages: &[DemoMessage]) -> Vec<SnapshotOutcome> {
        let mut session = ClientSession::new(
            schema::entity_fields(),
            schema::player_fields(),
            ClientLimits::default(),
        )
        .unwrap();
        messages
            .iter()
            .flat_map(|m| {
                session
                    .parse_server_message(&IncomingMessage {
                        sequence: m.sequence,
                        realtime: 0,
                        data: &m.data,
                    })
                    .unwrap()
                    .snapshots
            })
            .collect()
    }

    #[test]
    fn clean_stream_commits_every_frame() {
        let config = SynthConfig {
            frames: 20,
            entities: 12,
            ..SynthConfig::default()
        };
        let messages = synthesize(&config).unwrap();
        assert_eq!(messages.len(), 21);
        let outcomes = run(&messages);
        assert_eq!(outcomes.len(), 20);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, SnapshotOutcome::Committed { .. })));
    }

    #[test]
    fn lost_message_discards_the_next_delta() {
        let config = SynthConfig {
            frames: 10,
            entities: 4,
            keyframe_interval: 100,
            drop_every: Some(5),
            ..SynthConfig::default()
        };
        let messages = synthesize(&config).unwrap();
        // frames 4 and 9 dropped
        assert_eq!(messages.len(), 1 + 8);
        let outcomes = run(&messages);
        assert!(matches!(outcomes[4], SnapshotOutcome::Discarded(_)));
        assert!(matches!(outcomes[3], SnapshotOutcome::Committed { .. }));
    }
}
