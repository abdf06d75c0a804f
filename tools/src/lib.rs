//! Inspection and decoding tools for recorded qsnap server message streams.
//!
//! This crate provides utilities for understanding what the client pipeline
//! does with a stream of server messages:
//!
//! - Read and write demo files (recorded message streams)
//! - Run a stream through a [`codec::ClientSession`] and summarize each message
//! - Expand committed snapshots into named field values
//! - Print field tables with their fingerprints
//! - Synthesize deterministic demos for testing and benchmarking
//!
//! # Design Principles
//!
//! - **First-class tooling** - These tools are part of the product, not afterthoughts.
//! - **Human-readable output** - Make it easy to understand what the codec is doing.

mod demo;
mod report;
mod synth;

pub use demo::{read_demo, write_demo, DemoMessage};
pub use report::{
    decode_messages, describe_fields, format_decode_pretty, format_inspect, inspect_messages,
    named_fields, DecodeOutput, DecodedEntity, DecodedSnapshot, DecodedView, InspectReport,
    MessageError, MessageSummary, SnapshotSummary,
};
pub use synth::{synthesize, SynthConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use codec::{ClientLimits, ClientSession, ServerMessageWriter, VoipPacket};

    fn session() -> ClientSession {
        ClientSession::new(
            schema::entity_fields(),
            schema::player_fields(),
            ClientLimits::default(),
        )
        .unwrap()
    }

    fn demo() -> Vec<DemoMessage> {
        synthesize(&SynthConfig {
            frames: 6,
            entities: 5,
            ..SynthConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn inspect_counts_snapshots() {
        let report = inspect_messages(&mut session(), &demo());
        assert_eq!(report.messages.len(), 7);
        assert_eq!(report.committed, 6);
        assert_eq!(report.discarded, 0);
        assert_eq!(report.errors, 0);
        assert_eq!(report.server_id, 1);
        assert_eq!(report.retained_snapshots, vec![2, 3, 4, 5, 6, 7]);
        assert_eq!(report.messages[0].commands[0], "svc_gamestate");

        let text = format_inspect(&report);
        assert!(text.contains("committed: 6"));
    }

    #[test]
    fn inspect_survives_garbage() {
        let mut messages = demo();
        messages.insert(
            3,
            DemoMessage {
                sequence: 99,
                data: vec![0, 0, 0, 0, 200],
            },
        );
        let report = inspect_messages(&mut session(), &messages);
        assert!(report.messages[3].error.is_some());
        // the session is reset and every later snapshot fails until a new gamestate
        assert_eq!(report.errors, 5);
        assert_eq!(report.committed, 2);
        assert!(report.messages[4..].iter().all(|m| m.error.is_some()));
        assert_eq!(report.server_id, 0);
    }

    #[test]
    fn download_and_voice_queues_are_drained() {
        let entity_fields = schema::entity_fields();
        let player_fields = schema::player_fields();
        let mut writer = ServerMessageWriter::new(&entity_fields, &player_fields, 0);
        writer.download(0, Some(3), b"abc");
        writer
            .voip(&VoipPacket {
                sender: 5,
                generation: 1,
                sequence: 9,
                flags: 0,
                frames: vec![vec![7; 4]],
            })
            .unwrap();
        let mut messages = demo();
        messages.push(DemoMessage {
            sequence: 8,
            data: writer.finish(),
        });

        let mut session = session();
        let report = inspect_messages(&mut session, &messages);
        let last = report.messages.last().unwrap();
        assert!(last.error.is_none());
        assert_eq!(last.download_chunks, 1);
        assert_eq!(last.voip_packets, 1);
        assert_eq!(session.download().pending(), 0);
        assert!(session.take_voip_packets().is_empty());
        assert!(format_inspect(&report).contains("voip packets: 1"));

        let mut session = self::session();
        let output = decode_messages(&mut session, &messages);
        assert_eq!(output.download_chunks, 1);
        assert_eq!(output.voip_packets, 1);
        assert_eq!(session.download().pending(), 0);
    }

    #[test]
    fn decode_names_fields() {
        let output = decode_messages(&mut session(), &demo());
        assert_eq!(output.snapshots.len(), 6);
        assert!(output.errors.is_empty());
        assert_eq!(
            output.config_strings.get(&1).map(String::as_str),
            Some("\\sv_serverid\\1")
        );
        let first = &output.snapshots[0];
        assert_eq!(first.views.len(), 1);
        assert!(first.views[0].player_state.contains_key("commandTime"));
        assert!(first.entities.iter().all(|e| e.fields.contains_key("eType")));

        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"message_num\":2"));
        assert!(format_decode_pretty(&output).contains("snapshot 2"));
    }

    #[test]
    fn describe_stock_table() {
        let text = describe_fields(&schema::player_fields());
        assert!(text.starts_with("48 fields"));
        assert!(text.contains("angle(16)"));
    }

    #[test]
    fn demo_file_roundtrip() {
        let messages = demo();
        let bytes = write_demo(&messages);
        assert_eq!(read_demo(&bytes, wire::protocol::MAX_MSGLEN).unwrap(), messages);
    }
}
