#![no_main]

use codec::{ClientLimits, ClientSession, IncomingMessage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(mut session) = ClientSession::new(
        schema::entity_fields(),
        schema::player_fields(),
        ClientLimits::default(),
    ) else {
        return;
    };

    // Split the input into a stream of messages with ascending sequences.
    let mut idx = 0usize;
    let mut sequence = 1;
    while idx < data.len() && idx < 16384 {
        let len = (data[idx] as usize % 200).saturating_add(1);
        idx += 1;
        let end = (idx + len).min(data.len());
        let _ = session.parse_server_message(&IncomingMessage {
            sequence,
            realtime: sequence * 16,
            data: &data[idx..end],
        });
        let _ = session.take_new_snapshot();
        idx = end;
        sequence += 1;
    }
});
