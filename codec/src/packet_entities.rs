//! Packet-entities list: a sorted merge of a base frame with server deltas.

use bitstream::{BitReader, BitWriter};
use schema::NetFields;
use tracing::trace;

use crate::baseline::BaselineTable;
use crate::delta::{decode_entity_delta, encode_entity_delta, EntityDelta};
use crate::error::{CodecError, CodecResult};
use crate::state::EntityState;
use crate::types::EntityNumber;

/// Decodes a packet-entities list against `base`.
///
/// `base` must be sorted by entity number. The server names entities in
/// ascending order, each decoded against the base entity of the same number
/// or, if the base has none, against its baseline. Base entities the server
/// does not name are carried over unchanged. The list ends with
/// [`EntityNumber::NONE`].
///
/// The output is only ascending if the server's numbers were; callers check
/// with [`first_order_violation`].
pub fn decode_packet_entities(
    fields: &NetFields,
    base: &[&EntityState],
    baselines: &BaselineTable,
    reader: &mut BitReader<'_>,
) -> CodecResult<Vec<EntityState>> {
    let mut old = base.iter().copied().peekable();
    let mut out = Vec::with_capacity(base.len());

    loop {
        let number = EntityNumber::new(reader.read_bits(EntityNumber::BITS)? as u16);
        if number.is_none() {
            break;
        }

        while let Some(unchanged) = old.next_if(|o| o.number < number) {
            trace!(bit = reader.bit_position(), number = unchanged.number.raw(), "unchanged");
            out.push(unchanged.clone());
        }

        let delta = if let Some(from) = old.next_if(|o| o.number == number) {
            trace!(bit = reader.bit_position(), number = number.raw(), "delta");
            decode_entity_delta(fields, from, number, reader)?
        } else {
            trace!(bit = reader.bit_position(), number = number.raw(), "baseline");
            let from = baselines
                .get(number)
                .ok_or(CodecError::EntityNumberOutOfRange {
                    number: u32::from(number.raw()),
                })?;
            decode_entity_delta(fields, from, number, reader)?
        };
        match delta {
            EntityDelta::Present(state) => out.push(state),
            EntityDelta::Removed => trace!(number = number.raw(), "removed"),
        }
    }

    for unchanged in old {
        trace!(bit = reader.bit_position(), number = unchanged.number.raw(), "unchanged");
        out.push(unchanged.clone());
    }
    Ok(out)
}

/// Encodes the transition from `from` to `to` as a packet-entities list.
///
/// Both lists must be strictly ascending. Entities only in `to` are sent
/// against their baseline, entities only in `from` are removed and
/// unchanged entities are omitted.
pub fn encode_packet_entities(
    fields: &NetFields,
    from: &[EntityState],
    to: &[EntityState],
    baselines: &BaselineTable,
    writer: &mut BitWriter,
) -> CodecResult<()> {
    ensure_ascending(from)?;
    ensure_ascending(to)?;

    let mut old = from.iter().peekable();
    let mut new = to.iter().peekable();
    loop {
        match (old.peek(), new.peek()) {
            (None, None) => break,
            (Some(o), Some(n)) if o.number == n.number => {
                encode_entity_delta(fields, o, Some(n), false, writer)?;
                old.next();
                new.next();
            }
            (Some(o), Some(n)) if o.number > n.number => {
                encode_added(fields, n, baselines, writer)?;
                new.next();
            }
            (None, Some(n)) => {
                encode_added(fields, n, baselines, writer)?;
                new.next();
            }
            (Some(o), _) => {
                encode_entity_delta(fields, o, None, false, writer)?;
                old.next();
            }
        }
    }
    writer.write_bits(u32::from(EntityNumber::NONE.raw()), EntityNumber::BITS)?;
    Ok(())
}

fn encode_added(
    fields: &NetFields,
    state: &EntityState,
    baselines: &BaselineTable,
    writer: &mut BitWriter,
) -> CodecResult<()> {
    let base = baselines
        .get(state.number)
        .ok_or(CodecError::EntityNumberOutOfRange {
            number: u32::from(state.number.raw()),
        })?;
    encode_entity_delta(fields, base, Some(state), true, writer)
}

fn ensure_ascending(entities: &[EntityState]) -> CodecResult<()> {
    match first_order_violation(entities) {
        Some((previous, current)) => Err(CodecError::InvalidEntityOrder {
            previous: previous.raw(),
            current: current.raw(),
        }),
        None => Ok(()),
    }
}

/// Returns the first adjacent pair that is not strictly ascending.
#[must_use]
pub fn first_order_violation(entities: &[EntityState]) -> Option<(EntityNumber, EntityNumber)> {
    entities
        .windows(2)
        .find(|pair| pair[0].number >= pair[1].number)
        .map(|pair| (pair[0].number, pair[1].number))
}
