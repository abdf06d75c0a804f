//! Running recorded messages through a client session and summarizing them.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use codec::{
    ClientSession, CodecResult, FieldBlock, IncomingMessage, MessageReport, SnapshotOutcome,
};
use schema::{net_fields_hash, FieldCodec, NetFields};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::demo::DemoMessage;

/// Per-message summary produced by [`inspect_messages`].
#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub sequence: i32,
    pub bytes: usize,
    pub commands: Vec<&'static str>,
    pub snapshots: Vec<SnapshotSummary>,
    pub download_chunks: usize,
    pub voip_packets: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SnapshotSummary {
    Committed {
        message_num: i32,
        delta_num: i32,
        entity_count: usize,
        ping: i32,
    },
    Discarded {
        reason: String,
    },
}

impl From<&SnapshotOutcome> for SnapshotSummary {
    fn from(outcome: &SnapshotOutcome) -> Self {
        match outcome {
            SnapshotOutcome::Committed {
                message_num,
                delta_num,
                entity_count,
                ping,
            } => Self::Committed {
                message_num: *message_num,
                delta_num: *delta_num,
                entity_count: *entity_count,
                ping: *ping,
            },
            SnapshotOutcome::Discarded(reason) => Self::Discarded {
                reason: reason.to_string(),
            },
        }
    }
}

/// Totals over a whole stream.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub entity_fields_hash: String,
    pub player_fields_hash: String,
    pub total_bytes: usize,
    pub committed: usize,
    pub discarded: usize,
    pub errors: usize,
    pub server_id: i32,
    /// Message numbers still valid in the history at the end of the stream.
    pub retained_snapshots: Vec<i32>,
    pub messages: Vec<MessageSummary>,
}

/// Demos carry no receive times, so every message arrives at time 0.
fn feed(session: &mut ClientSession, message: &DemoMessage) -> CodecResult<MessageReport> {
    session.parse_server_message(&IncomingMessage {
        sequence: message.sequence,
        realtime: 0,
        data: &message.data,
    })
}

/// Empties the download and voice queues so a long stream does not
/// accumulate them. Returns how many chunks and packets were queued.
fn drain_queues(session: &mut ClientSession) -> (usize, usize) {
    let chunks = session.download().pending();
    session.take_download_chunks();
    (chunks, session.take_voip_packets().len())
}

/// Parses every message and records what each one contained.
///
/// A fatal error resets the session, exactly as a live client would, and
/// parsing continues with the next message.
pub fn inspect_messages(session: &mut ClientSession, messages: &[DemoMessage]) -> InspectReport {
    let mut report = InspectReport {
        entity_fields_hash: format!("{:016x}", net_fields_hash(session.entity_fields())),
        player_fields_hash: format!("{:016x}", net_fields_hash(session.player_fields())),
        total_bytes: 0,
        committed: 0,
        discarded: 0,
        errors: 0,
        server_id: 0,
        retained_snapshots: Vec::new(),
        messages: Vec::with_capacity(messages.len()),
    };

    for message in messages {
        report.total_bytes += message.data.len();
        let summary = match feed(session, message) {
            Ok(parsed) => {
                let (download_chunks, voip_packets) = drain_queues(session);
                let snapshots: Vec<SnapshotSummary> =
                    parsed.snapshots.iter().map(SnapshotSummary::from).collect();
                for snapshot in &snapshots {
                    match snapshot {
                        SnapshotSummary::Committed { .. } => report.committed += 1,
                        SnapshotSummary::Discarded { .. } => report.discarded += 1,
                    }
                }
                MessageSummary {
                    sequence: message.sequence,
                    bytes: message.data.len(),
                    commands: parsed.commands.iter().map(|c| c.name()).collect(),
                    snapshots,
                    download_chunks,
                    voip_packets,
                    error: None,
                }
            }
            Err(err) => {
                debug!(sequence = message.sequence, error = %err, "message failed");
                report.errors += 1;
                MessageSummary {
                    sequence: message.sequence,
                    bytes: message.data.len(),
                    commands: Vec::new(),
                    snapshots: Vec::new(),
                    download_chunks: 0,
                    voip_packets: 0,
                    error: Some(err.to_string()),
                }
            }
        };
        report.messages.push(summary);
    }
    report.server_id = session.server_id();
    report.retained_snapshots = session
        .history()
        .iter()
        .map(|snapshot| snapshot.message_num)
        .collect();
    report
}

/// Human-readable form of an [`InspectReport`].
#[must_use]
pub fn format_inspect(report: &InspectReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "entity fields: {} player fields: {}",
        report.entity_fields_hash, report.player_fields_hash
    );
    let _ = writeln!(
        out,
        "messages: {} bytes: {} committed: {} discarded: {} errors: {} server id: {}",
        report.messages.len(),
        report.total_bytes,
        report.committed,
        report.discarded,
        report.errors,
        report.server_id
    );
    let _ = writeln!(out, "retained snapshots: {:?}", report.retained_snapshots);
    for message in &report.messages {
        let _ = write!(
            out,
            "  #{:<6} {:>5} bytes  {}",
            message.sequence,
            message.bytes,
            message.commands.join(" ")
        );
        if message.download_chunks > 0 {
            let _ = write!(out, "  download chunks: {}", message.download_chunks);
        }
        if message.voip_packets > 0 {
            let _ = write!(out, "  voip packets: {}", message.voip_packets);
        }
        if let Some(error) = &message.error {
            let _ = write!(out, "  ERROR: {error}");
        }
        let _ = writeln!(out);
        for snapshot in &message.snapshots {
            match snapshot {
                SnapshotSummary::Committed {
                    message_num,
                    delta_num,
                    entity_count,
                    ping,
                } => {
                    let _ = writeln!(
                        out,
                        "           snapshot:{message_num} delta:{delta_num} entities:{entity_count} ping:{ping}"
                    );
                }
                SnapshotSummary::Discarded { reason } => {
                    let _ = writeln!(out, "           discarded: {reason}");
                }
            }
        }
    }
    out
}

/// One decoded entity with its non-zero fields by name.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedEntity {
    pub number: u16,
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecodedView {
    pub slot: usize,
    pub client_num: u8,
    pub player_state: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecodedSnapshot {
    pub message_num: i32,
    pub delta_num: i32,
    pub server_time: i32,
    pub ping: i32,
    pub views: Vec<DecodedView>,
    pub entities: Vec<DecodedEntity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageError {
    pub sequence: i32,
    pub error: String,
}

/// Full decode of a stream.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecodeOutput {
    pub config_strings: BTreeMap<usize, String>,
    pub snapshots: Vec<DecodedSnapshot>,
    pub download_chunks: usize,
    pub voip_packets: usize,
    pub errors: Vec<MessageError>,
}

/// Parses every message and expands each committed snapshot by field name.
pub fn decode_messages(session: &mut ClientSession, messages: &[DemoMessage]) -> DecodeOutput {
    let mut output = DecodeOutput::default();
    for message in messages {
        let parsed = match feed(session, message) {
            Ok(parsed) => parsed,
            Err(err) => {
                output.errors.push(MessageError {
                    sequence: message.sequence,
                    error: err.to_string(),
                });
                continue;
            }
        };
        let (download_chunks, voip_packets) = drain_queues(session);
        output.download_chunks += download_chunks;
        output.voip_packets += voip_packets;
        for outcome in parsed.snapshots {
            let SnapshotOutcome::Committed { message_num, .. } = outcome else {
                continue;
            };
            if let Some(snapshot) = expand_snapshot(session, message_num) {
                output.snapshots.push(snapshot);
            }
        }
    }
    output.config_strings = session
        .game_state()
        .iter()
        .map(|(index, value)| (index, value.to_owned()))
        .collect();
    output
}

fn expand_snapshot(session: &ClientSession, message_num: i32) -> Option<DecodedSnapshot> {
    let snapshot = session.snapshot(message_num)?;
    let views = (0..snapshot.views.len())
        .filter_map(|slot| {
            let client_num = snapshot.views[slot].client_num?;
            let ps = snapshot.view_player_state(slot)?;
            Some(DecodedView {
                slot,
                client_num,
                player_state: named_fields(session.player_fields(), &ps.fields),
            })
        })
        .collect();
    let entities = session
        .snapshot_entities(snapshot)
        .map(|entity| DecodedEntity {
            number: entity.number.raw(),
            fields: named_fields(session.entity_fields(), &entity.fields),
        })
        .collect();
    Some(DecodedSnapshot {
        message_num: snapshot.message_num,
        delta_num: snapshot.delta_num,
        server_time: snapshot.server_time,
        ping: snapshot.ping,
        views,
        entities,
    })
}

/// Renders the non-zero fields of a block by name.
#[must_use]
pub fn named_fields(fields: &NetFields, block: &FieldBlock) -> BTreeMap<String, Value> {
    fields
        .iter()
        .enumerate()
        .filter(|(index, _)| block.word(*index) != 0)
        .map(|(index, def)| (def.name.clone(), field_value(def.codec, block.word(index))))
        .collect()
}

fn field_value(codec: FieldCodec, word: u32) -> Value {
    match codec {
        FieldCodec::UInt { .. } => json!(word),
        FieldCodec::SInt { .. } => json!(word as i32),
        FieldCodec::Float | FieldCodec::Angle { .. } => json!(f32::from_bits(word)),
    }
}

/// Human-readable form of a [`DecodeOutput`].
#[must_use]
pub fn format_decode_pretty(output: &DecodeOutput) -> String {
    let mut out = String::new();
    for (index, value) in &output.config_strings {
        let _ = writeln!(out, "cs {index:>4}: {value}");
    }
    for snapshot in &output.snapshots {
        let _ = writeln!(
            out,
            "snapshot {} (delta {}) time {} ping {}",
            snapshot.message_num, snapshot.delta_num, snapshot.server_time, snapshot.ping
        );
        for view in &snapshot.views {
            let _ = writeln!(out, "  view {} client {}", view.slot, view.client_num);
            for (name, value) in &view.player_state {
                let _ = writeln!(out, "    {name} = {value}");
            }
        }
        for entity in &snapshot.entities {
            let _ = writeln!(out, "  entity {}", entity.number);
            for (name, value) in &entity.fields {
                let _ = writeln!(out, "    {name} = {value}");
            }
        }
    }
    for error in &output.errors {
        let _ = writeln!(out, "error in message {}: {}", error.sequence, error.error);
    }
    out
}

/// Tabulates a field table with its fingerprint.
#[must_use]
pub fn describe_fields(fields: &NetFields) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} fields, hash {:016x}, max delta {} bits",
        fields.len(),
        net_fields_hash(fields),
        fields.max_delta_bits()
    );
    for (index, def) in fields.iter().enumerate() {
        let codec = match def.codec {
            FieldCodec::UInt { bits } => format!("uint({bits})"),
            FieldCodec::SInt { bits } => format!("sint({bits})"),
            FieldCodec::Float => "float".to_owned(),
            FieldCodec::Angle { bits } => format!("angle({bits})"),
        };
        let _ = writeln!(out, "{index:>4}  {:<24} {codec}", def.name);
    }
    out
}
