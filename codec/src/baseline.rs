//! Entity baseline table.

use bitstream::BitReader;
use schema::NetFields;
use tracing::trace;
use wire::protocol::MAX_GENTITIES;

use crate::delta::{decode_entity_delta, EntityDelta};
use crate::error::{CodecError, CodecResult};
use crate::state::EntityState;
use crate::types::EntityNumber;

/// Default entity states, indexed directly by entity number.
///
/// Filled by baseline commands after a gamestate and otherwise read-only.
/// Numbers never set read back as all-zero records.
#[derive(Debug, Clone)]
pub struct BaselineTable {
    entries: Vec<EntityState>,
    field_count: usize,
}

impl BaselineTable {
    /// Creates a zeroed table for entities with `field_count` fields.
    #[must_use]
    pub fn new(field_count: usize) -> Self {
        let entries = (0..MAX_GENTITIES)
            .map(|n| EntityState::zeroed(EntityNumber::new(n as u16), field_count))
            .collect();
        Self {
            entries,
            field_count,
        }
    }

    /// Returns the number of slots (always `MAX_GENTITIES`).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the baseline for `number`.
    #[must_use]
    pub fn get(&self, number: EntityNumber) -> Option<&EntityState> {
        self.entries.get(number.index())
    }

    /// Stores a baseline at its own number.
    pub fn set(&mut self, state: EntityState) -> CodecResult<()> {
        let slot = self.entries.get_mut(state.number.index()).ok_or(
            CodecError::EntityNumberOutOfRange {
                number: u32::from(state.number.raw()),
            },
        )?;
        if state.fields.len() != self.field_count {
            return Err(CodecError::FieldCountMismatch {
                expected: self.field_count,
                actual: state.fields.len(),
            });
        }
        *slot = state;
        Ok(())
    }

    /// Zeroes every slot.
    pub fn reset(&mut self) {
        for (n, entry) in self.entries.iter_mut().enumerate() {
            *entry = EntityState::zeroed(EntityNumber::new(n as u16), self.field_count);
        }
    }
}

/// Reads one baseline command body and stores the result.
///
/// The delta is decoded against an all-zero state. A removal clears the slot.
pub fn decode_baseline(
    fields: &NetFields,
    table: &mut BaselineTable,
    reader: &mut BitReader<'_>,
) -> CodecResult<EntityNumber> {
    let raw = reader.read_bits(EntityNumber::BITS)?;
    let number =
        EntityNumber::try_new(raw).ok_or(CodecError::EntityNumberOutOfRange { number: raw })?;
    let zero = EntityState::zeroed(number, fields.len());
    let state = match decode_entity_delta(fields, &zero, number, reader)? {
        EntityDelta::Present(state) => state,
        EntityDelta::Removed => zero,
    };
    trace!(number = number.raw(), "baseline");
    table.set(state)?;
    Ok(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::encode_entity_delta;
    use bitstream::BitWriter;
    use schema::FieldCodec;

    fn fields() -> NetFields {
        NetFields::builder()
            .field("a", FieldCodec::uint(8))
            .field("b", FieldCodec::sint(16))
            .build()
            .unwrap()
    }

    #[test]
    fn unset_reads_zero() {
        let table = BaselineTable::new(2);
        let entry = table.get(EntityNumber::new(500)).unwrap();
        assert_eq!(entry.number.raw(), 500);
        assert!(entry.fields.is_zero());
        assert_eq!(table.capacity(), 1024);
    }

    #[test]
    fn set_and_reset() {
        let mut table = BaselineTable::new(2);
        let mut state = EntityState::zeroed(EntityNumber::new(4), 2);
        state.fields.set_word(0, 9);
        table.set(state.clone()).unwrap();
        assert_eq!(table.get(EntityNumber::new(4)), Some(&state));

        table.reset();
        assert!(table.get(EntityNumber::new(4)).unwrap().fields.is_zero());
    }

    #[test]
    fn set_rejects_out_of_range() {
        let mut table = BaselineTable::new(2);
        let state = EntityState::zeroed(EntityNumber::new(2000), 2);
        assert!(matches!(
            table.set(state),
            Err(CodecError::EntityNumberOutOfRange { number: 2000 })
        ));
    }

    #[test]
    fn set_rejects_wrong_width() {
        let mut table = BaselineTable::new(2);
        let state = EntityState::zeroed(EntityNumber::new(1), 3);
        assert!(matches!(
            table.set(state),
            Err(CodecError::FieldCountMismatch { .. })
        ));
    }

    #[test]
    fn decode_baseline_command() {
        let fields = fields();
        let mut to = EntityState::zeroed(EntityNumber::new(10), 2);
        to.fields.set_word(0, 7);
        to.fields.set_int(1, -7);

        let mut writer = BitWriter::new();
        let zero = EntityState::zeroed(to.number, 2);
        encode_entity_delta(&fields, &zero, Some(&to), true, &mut writer).unwrap();
        let bytes = writer.finish();

        let mut table = BaselineTable::new(2);
        let mut reader = BitReader::new(&bytes);
        let number = decode_baseline(&fields, &mut table, &mut reader).unwrap();
        assert_eq!(number.raw(), 10);
        assert_eq!(table.get(number), Some(&to));
    }
}
