//! Snapshot decoding.
//!
//! A snapshot is always read to its last bit so the rest of the message stays
//! framed, even when its delta base turns out to be unusable. Whether it may
//! be committed is reported separately as a [`SnapshotRejection`].

use std::fmt;

use bitstream::BitReader;
use schema::NetFields;
use tracing::{trace, warn};
use wire::protocol::{MAX_CLIENTS, MAX_MAP_AREA_BYTES, MAX_SPLITVIEW};

use crate::baseline::BaselineTable;
use crate::delta::decode_player_delta;
use crate::error::{CodecError, CodecResult};
use crate::history::{Snapshot, SnapshotHistory, ViewSlot};
use crate::limits::ClientLimits;
use crate::packet_entities::{decode_packet_entities, first_order_violation};
use crate::parse_ring::ParseEntities;
use crate::session::UNKNOWN_PING;
use crate::state::{EntityState, PlayerState};

/// Why a fully parsed snapshot was not committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotRejection {
    /// The base slot was never filled or has been invalidated.
    DeltaFromInvalidFrame { delta_num: i32 },
    /// The base slot now holds a different message.
    DeltaFrameTooOld { delta_num: i32, found: i32 },
    /// The base frame's entities may already be overwritten in the ring.
    ParseEntitiesTooOld { delta_num: i32, distance: u64, margin: usize },
    /// More entities than one snapshot may carry.
    TooManyEntities { count: usize, max: usize },
    /// Entity numbers in the merged list are not strictly ascending.
    EntityOrder { previous: u16, current: u16 },
}

impl fmt::Display for SnapshotRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeltaFromInvalidFrame { delta_num } => {
                write!(f, "delta from invalid frame {delta_num}")
            }
            Self::DeltaFrameTooOld { delta_num, found } => {
                write!(f, "delta frame {delta_num} too old (slot holds {found})")
            }
            Self::ParseEntitiesTooOld {
                delta_num,
                distance,
                margin,
            } => write!(
                f,
                "delta frame {delta_num} parse entities too old: {distance} > {margin}"
            ),
            Self::TooManyEntities { count, max } => {
                write!(f, "too many snapshot entities: {count} > {max}")
            }
            Self::EntityOrder { previous, current } => {
                write!(f, "snapshot entities out of order: {previous} then {current}")
            }
        }
    }
}

/// Read-only state a snapshot is decoded against.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotContext<'a> {
    pub entity_fields: &'a NetFields,
    pub player_fields: &'a NetFields,
    pub limits: &'a ClientLimits,
    pub baselines: &'a BaselineTable,
    pub parse_entities: &'a ParseEntities,
    pub history: &'a SnapshotHistory,
}

/// A parsed snapshot staged for commit.
#[derive(Debug, Clone)]
pub struct DecodedSnapshot {
    /// The record to store; `parse_entities_start` is the ring position the
    /// entities will occupy if committed now.
    pub snapshot: Snapshot,
    /// Entities in ascending order, not yet in the ring.
    pub entities: Vec<EntityState>,
    /// Set when the snapshot must be discarded.
    pub rejection: Option<SnapshotRejection>,
}

/// Decodes the body of a snapshot command.
///
/// Fatal errors (truncated message, oversized area mask, bad change count)
/// are returned as `Err`. Everything else yields a staged snapshot.
pub fn decode_snapshot(
    ctx: &SnapshotContext<'_>,
    message_num: i32,
    server_command_num: i32,
    reader: &mut BitReader<'_>,
) -> CodecResult<DecodedSnapshot> {
    let header = wire::decode_snapshot_header(reader)?;
    let delta_num = header.delta_num(message_num);

    let (base, mut rejection) = if delta_num <= 0 {
        (None, None)
    } else {
        match check_base(ctx, delta_num) {
            Ok(base) => (Some(base), None),
            Err(reason) => (None, Some(reason)),
        }
    };

    let mut num_player_states = usize::from(reader.read_u8()?);
    if num_player_states > MAX_SPLITVIEW {
        warn!(
            got = num_player_states,
            max = MAX_SPLITVIEW,
            "clamping snapshot player state count"
        );
        num_player_states = MAX_SPLITVIEW;
    }

    let mut views = [ViewSlot::default(); MAX_SPLITVIEW];
    for view in &mut views {
        let lc_index = reader.read_u8()?;
        let client_num = reader.read_u8()?;
        if usize::from(lc_index) < num_player_states && usize::from(client_num) < MAX_CLIENTS {
            view.lc_index = Some(lc_index);
            view.client_num = Some(client_num);
        }
        let len = usize::from(reader.read_u8()?);
        if len > MAX_MAP_AREA_BYTES {
            return Err(CodecError::AreaMaskTooLarge {
                len,
                max: MAX_MAP_AREA_BYTES,
            });
        }
        reader.read_data(&mut view.area_mask[..len])?;
    }

    trace!(bit = reader.bit_position(), "playerstate");
    let mut player_states = vec![PlayerState::zeroed(ctx.player_fields.len()); num_player_states];
    for (index, view) in views.iter().enumerate() {
        let (Some(lc), Some(client_num)) = (view.lc_index, view.client_num) else {
            continue;
        };
        let from = base.and_then(|b| b.view_player_state(index));
        player_states[usize::from(lc)] =
            decode_player_delta(ctx.player_fields, from, client_num, reader)?;
    }

    trace!(bit = reader.bit_position(), "packet entities");
    let base_entities: Vec<&EntityState> = base
        .map(|b| {
            ctx.parse_entities
                .span(b.parse_entities_start, b.entity_count)
                .collect()
        })
        .unwrap_or_default();
    let entities =
        decode_packet_entities(ctx.entity_fields, &base_entities, ctx.baselines, reader)?;

    if rejection.is_none() && entities.len() > ctx.limits.max_snapshot_entities {
        rejection = Some(SnapshotRejection::TooManyEntities {
            count: entities.len(),
            max: ctx.limits.max_snapshot_entities,
        });
    }
    if rejection.is_none() {
        if let Some((previous, current)) = first_order_violation(&entities) {
            rejection = Some(SnapshotRejection::EntityOrder {
                previous: previous.raw(),
                current: current.raw(),
            });
        }
    }

    let snapshot = Snapshot {
        valid: rejection.is_none(),
        message_num,
        delta_num,
        flags: header.flags,
        server_time: header.server_time,
        server_command_num,
        ping: UNKNOWN_PING,
        views,
        player_states,
        parse_entities_start: ctx.parse_entities.next_index(),
        entity_count: entities.len(),
    };
    Ok(DecodedSnapshot {
        snapshot,
        entities,
        rejection,
    })
}

fn check_base<'a>(
    ctx: &SnapshotContext<'a>,
    delta_num: i32,
) -> Result<&'a Snapshot, SnapshotRejection> {
    let Some(base) = ctx.history.slot(delta_num).filter(|s| s.valid) else {
        return Err(SnapshotRejection::DeltaFromInvalidFrame { delta_num });
    };
    if base.message_num != delta_num {
        return Err(SnapshotRejection::DeltaFrameTooOld {
            delta_num,
            found: base.message_num,
        });
    }
    let distance = ctx
        .parse_entities
        .next_index()
        .saturating_sub(base.parse_entities_start);
    let margin = ctx.limits.parse_entities_margin();
    if distance > margin as u64 {
        return Err(SnapshotRejection::ParseEntitiesTooOld {
            delta_num,
            distance,
            margin,
        });
    }
    Ok(base)
}
