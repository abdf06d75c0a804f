//! Field-table driven delta encoding and decoding.
//!
//! One routine serves entity and player state alike; only the table differs.
//! A record is a `changed` bit, then (if set) a change count byte, a mask of
//! that many bits and one value per set bit in table order. Entity records
//! are preceded by a `remove` bit.

use bitstream::{BitReader, BitWriter};
use schema::{FieldCodec, FieldDef, NetFields};

use crate::error::{CodecError, CodecResult};
use crate::state::{EntityState, FieldBlock, PlayerState};
use crate::types::EntityNumber;

const FLOAT_INT_BITS: u8 = 13;
const FLOAT_INT_BIAS: i64 = 1 << (FLOAT_INT_BITS - 1);

/// Result of decoding one entity delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityDelta {
    /// The entity exists in the new frame.
    Present(EntityState),
    /// The server removed the entity.
    Removed,
}

/// Decodes an entity delta against `base`.
///
/// The entity number has already been read by the caller. The base must be
/// supplied: a baseline, a previous frame's entity, or an all-zero state.
pub fn decode_entity_delta(
    fields: &NetFields,
    base: &EntityState,
    number: EntityNumber,
    reader: &mut BitReader<'_>,
) -> CodecResult<EntityDelta> {
    if reader.read_bit()? {
        return Ok(EntityDelta::Removed);
    }
    let block = decode_fields(fields, &base.fields, reader)?;
    Ok(EntityDelta::Present(EntityState {
        number,
        fields: block,
    }))
}

/// Decodes a player-state delta. A missing base decodes against all zeros.
pub fn decode_player_delta(
    fields: &NetFields,
    base: Option<&PlayerState>,
    client_num: u8,
    reader: &mut BitReader<'_>,
) -> CodecResult<PlayerState> {
    let block = match base {
        Some(base) => decode_fields(fields, &base.fields, reader)?,
        None => decode_fields(fields, &FieldBlock::zeroed(fields.len()), reader)?,
    };
    Ok(PlayerState {
        client_num,
        fields: block,
    })
}

/// Encodes an entity delta from `from` to `to`, number included.
///
/// `to == None` writes a removal of `from`. An unchanged entity writes
/// nothing unless `force` is set.
pub fn encode_entity_delta(
    fields: &NetFields,
    from: &EntityState,
    to: Option<&EntityState>,
    force: bool,
    writer: &mut BitWriter,
) -> CodecResult<()> {
    let Some(to) = to else {
        writer.write_bits(u32::from(from.number.raw()), EntityNumber::BITS)?;
        writer.write_bit(true);
        return Ok(());
    };
    if to.number.is_none() {
        return Err(CodecError::EntityNumberOutOfRange {
            number: u32::from(to.number.raw()),
        });
    }
    ensure_field_count(fields, &from.fields)?;
    ensure_field_count(fields, &to.fields)?;

    let last_changed = last_changed(&from.fields, &to.fields);
    if last_changed == 0 && !force {
        return Ok(());
    }
    writer.write_bits(u32::from(to.number.raw()), EntityNumber::BITS)?;
    writer.write_bit(false);
    write_changes(fields, &from.fields, &to.fields, last_changed, writer)
}

/// Encodes a player-state delta. A missing base encodes against all zeros.
pub fn encode_player_delta(
    fields: &NetFields,
    from: Option<&PlayerState>,
    to: &PlayerState,
    writer: &mut BitWriter,
) -> CodecResult<()> {
    ensure_field_count(fields, &to.fields)?;
    let zero;
    let from = match from {
        Some(from) => {
            ensure_field_count(fields, &from.fields)?;
            &from.fields
        }
        None => {
            zero = FieldBlock::zeroed(fields.len());
            &zero
        }
    };
    let last_changed = last_changed(from, &to.fields);
    write_changes(fields, from, &to.fields, last_changed, writer)
}

fn decode_fields(
    fields: &NetFields,
    base: &FieldBlock,
    reader: &mut BitReader<'_>,
) -> CodecResult<FieldBlock> {
    ensure_field_count(fields, base)?;
    let mut out = base.clone();
    if !reader.read_bit()? {
        return Ok(out);
    }

    let count = reader.read_u8()?;
    if usize::from(count) > fields.len() {
        return Err(CodecError::InvalidChangeCount {
            count,
            fields: fields.len(),
        });
    }
    let mask = read_mask(reader, usize::from(count))?;
    for (index, def) in fields.iter().enumerate().take(mask.len()) {
        if mask[index] {
            out.set_word(index, read_value(def.codec, reader)?);
        }
    }
    Ok(out)
}

fn read_mask(reader: &mut BitReader<'_>, bits: usize) -> CodecResult<Vec<bool>> {
    let mut mask = Vec::with_capacity(bits);
    for _ in 0..bits {
        mask.push(reader.read_bit()?);
    }
    Ok(mask)
}

fn read_value(codec: FieldCodec, reader: &mut BitReader<'_>) -> CodecResult<u32> {
    if !reader.read_bit()? {
        return Ok(0);
    }
    let word = match codec {
        FieldCodec::UInt { bits } => reader.read_bits(bits)?,
        FieldCodec::SInt { bits } => reader.read_signed_bits(bits)? as u32,
        FieldCodec::Float => {
            if reader.read_bit()? {
                reader.read_bits(32)?
            } else {
                let biased = i64::from(reader.read_bits(FLOAT_INT_BITS)?);
                ((biased - FLOAT_INT_BIAS) as f32).to_bits()
            }
        }
        FieldCodec::Angle { bits } => angle_from_quantized(reader.read_bits(bits)?, bits).to_bits(),
    };
    Ok(word)
}

fn last_changed(from: &FieldBlock, to: &FieldBlock) -> usize {
    from.as_slice()
        .iter()
        .zip(to.as_slice())
        .rposition(|(a, b)| a != b)
        .map_or(0, |index| index + 1)
}

fn write_changes(
    fields: &NetFields,
    from: &FieldBlock,
    to: &FieldBlock,
    last_changed: usize,
    writer: &mut BitWriter,
) -> CodecResult<()> {
    if last_changed == 0 {
        writer.write_bit(false);
        return Ok(());
    }
    writer.write_bit(true);
    // last_changed <= fields.len() <= MAX_FIELDS
    writer.write_u8(last_changed as u8);
    for index in 0..last_changed {
        writer.write_bit(from.word(index) != to.word(index));
    }
    for (index, def) in fields.iter().enumerate().take(last_changed) {
        if from.word(index) != to.word(index) {
            write_value(def, to.word(index), writer)?;
        }
    }
    Ok(())
}

fn write_value(def: &FieldDef, word: u32, writer: &mut BitWriter) -> CodecResult<()> {
    if word == 0 {
        writer.write_bit(false);
        return Ok(());
    }
    writer.write_bit(true);
    match def.codec {
        FieldCodec::UInt { bits } => {
            if bits < 32 && word >= (1u32 << bits) {
                return Err(invalid_value(def, word, bits));
            }
            writer.write_bits(word, bits)?;
        }
        FieldCodec::SInt { bits } => {
            writer
                .write_signed_bits(word as i32, bits)
                .map_err(|_| invalid_value(def, word, bits))?;
        }
        FieldCodec::Float => {
            let value = f32::from_bits(word);
            let truncated = value as i32;
            let biased = i64::from(truncated) + FLOAT_INT_BIAS;
            if (truncated as f32).to_bits() == word && (0..1 << FLOAT_INT_BITS).contains(&biased) {
                writer.write_bit(false);
                writer.write_bits(biased as u32, FLOAT_INT_BITS)?;
            } else {
                writer.write_bit(true);
                writer.write_bits(word, 32)?;
            }
        }
        FieldCodec::Angle { bits } => {
            writer.write_bits(angle_to_quantized(f32::from_bits(word), bits), bits)?;
        }
    }
    Ok(())
}

fn invalid_value(def: &FieldDef, value: u32, bits: u8) -> CodecError {
    CodecError::InvalidValue {
        field: def.name.clone(),
        value,
        bits,
    }
}

fn ensure_field_count(fields: &NetFields, block: &FieldBlock) -> CodecResult<()> {
    if block.len() != fields.len() {
        return Err(CodecError::FieldCountMismatch {
            expected: fields.len(),
            actual: block.len(),
        });
    }
    Ok(())
}

/// Quantizes an angle in degrees to `bits`, wrapping around a full turn.
#[must_use]
pub fn angle_to_quantized(degrees: f32, bits: u8) -> u32 {
    let steps = (1u32 << bits) as f32;
    let mask = (1u32 << bits) - 1;
    ((degrees * steps / 360.0) as i32 as u32) & mask
}

/// Expands a quantized angle back to degrees.
#[must_use]
pub fn angle_from_quantized(quantized: u32, bits: u8) -> f32 {
    quantized as f32 * (360.0 / (1u32 << bits) as f32)
}
