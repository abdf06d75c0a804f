use codec::{
    BaselineTable, ClientLimits, ClientSession, CodecError, ConnectionState, EntityNumber,
    EntityState, GameState, IncomingMessage, ServerMessageWriter, SnapshotFrame,
};
use proptest::prelude::*;
use schema::NetFields;

fn tables() -> (NetFields, NetFields) {
    (schema::entity_fields(), schema::player_fields())
}

fn session() -> ClientSession {
    let (entity_fields, player_fields) = tables();
    ClientSession::new(entity_fields, player_fields, ClientLimits::for_testing())
        .unwrap()
        .with_wire_limits(wire::Limits::for_testing())
}

fn bootstrap_bytes() -> Vec<u8> {
    let (entity_fields, player_fields) = tables();
    let mut gs = GameState::new(64, 2048);
    gs.set(1, "\\sv_serverid\\1").unwrap();
    let mut writer = ServerMessageWriter::new(&entity_fields, &player_fields, 0);
    writer.gamestate(0, &gs, &[Some(0), None, None, None]).unwrap();
    let mut baseline = EntityState::zeroed(EntityNumber::new(3), entity_fields.len());
    baseline.fields.set_word(11, 4);
    writer.baseline(&baseline).unwrap();
    writer.finish()
}

fn snapshot_bytes() -> Vec<u8> {
    let (entity_fields, player_fields) = tables();
    let frame = SnapshotFrame {
        server_time: 100,
        entities: vec![EntityState::zeroed(EntityNumber::new(3), entity_fields.len())],
        ..SnapshotFrame::default()
    };
    let baselines = BaselineTable::new(entity_fields.len());
    let mut writer = ServerMessageWriter::new(&entity_fields, &player_fields, 0);
    writer.snapshot(&frame, None, &baselines).unwrap();
    writer.finish()
}

fn feed(session: &mut ClientSession, sequence: i32, data: &[u8]) -> Result<(), CodecError> {
    session
        .parse_server_message(&IncomingMessage {
            sequence,
            realtime: 0,
            data,
        })
        .map(|_| ())
}

#[test]
fn truncated_snapshot_resets_session() {
    let mut s = session();
    feed(&mut s, 1, &bootstrap_bytes()).unwrap();
    feed(&mut s, 2, &snapshot_bytes()).unwrap();
    assert!(s.latest_snapshot().is_some());

    let bytes = snapshot_bytes();
    let err = feed(&mut s, 3, &bytes[..bytes.len() - 2]).unwrap_err();
    assert!(matches!(err, CodecError::Bitstream(_) | CodecError::Wire(_)));
    assert_eq!(s.state(), ConnectionState::AwaitingGamestate);
    assert!(s.latest_snapshot().is_none());
    assert!(s.baseline(EntityNumber::new(3)).unwrap().fields.is_zero());
    assert_eq!(s.server_id(), 0);

    // A fresh gamestate brings the session back.
    feed(&mut s, 4, &bootstrap_bytes()).unwrap();
    feed(&mut s, 5, &snapshot_bytes()).unwrap();
    assert_eq!(s.latest_snapshot().unwrap().message_num, 5);
}

#[test]
fn oversized_area_mask_resets_session() {
    let mut s = session();
    feed(&mut s, 1, &bootstrap_bytes()).unwrap();

    let mut bytes = vec![0, 0, 0, 0, 7];
    bytes.extend_from_slice(&[0, 0, 0, 100]); // server time
    bytes.push(0); // delta offset
    bytes.push(0); // flags
    bytes.push(1); // player states
    bytes.extend_from_slice(&[0, 0, 33]);
    bytes.extend_from_slice(&[0; 40]);
    let err = feed(&mut s, 2, &bytes).unwrap_err();
    assert!(matches!(err, CodecError::AreaMaskTooLarge { len: 33, .. }));
    assert_eq!(s.state(), ConnectionState::AwaitingGamestate);
}

#[test]
fn baseline_before_gamestate_is_fatal() {
    let mut s = session();
    let err = feed(&mut s, 1, &[0, 0, 0, 0, 4, 0, 0, 8]).unwrap_err();
    assert!(matches!(err, CodecError::NotBootstrapped { .. }));
}

#[test]
fn oversized_message_is_rejected() {
    let mut s = session();
    let big = vec![1u8; wire::Limits::for_testing().max_message_bytes + 1];
    let err = feed(&mut s, 1, &big).unwrap_err();
    assert!(matches!(
        err,
        CodecError::Wire(wire::DecodeError::MessageTooLarge { .. })
    ));
}

proptest! {
    #[test]
    fn garbage_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut s = session();
        feed(&mut s, 1, &bootstrap_bytes()).unwrap();
        if feed(&mut s, 2, &data).is_err() {
            prop_assert_eq!(s.state(), ConnectionState::AwaitingGamestate);
            prop_assert!(s.latest_snapshot().is_none());
        }
    }

    #[test]
    fn truncation_at_any_point_is_fatal(cut in 0usize..64) {
        let bytes = snapshot_bytes();
        let cut = cut.min(bytes.len() - 1);
        let mut s = session();
        feed(&mut s, 1, &bootstrap_bytes()).unwrap();
        prop_assert!(feed(&mut s, 2, &bytes[..cut]).is_err());
        prop_assert_eq!(s.state(), ConnectionState::AwaitingGamestate);
    }
}
