//! Decoded entity and player state.

use crate::types::EntityNumber;

/// Field values in table order, one raw 32-bit word each.
///
/// Integers hold their two's complement pattern (signed fields are sign
/// extended). Floats and angles hold IEEE-754 bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldBlock(Vec<u32>);

impl FieldBlock {
    /// Creates an all-zero block for a table of `len` fields.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self(vec![0; len])
    }

    /// Creates a block from raw words.
    #[must_use]
    pub fn from_words(words: Vec<u32>) -> Self {
        Self(words)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the block holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw word at `index`, or zero past the end.
    #[must_use]
    pub fn word(&self, index: usize) -> u32 {
        self.0.get(index).copied().unwrap_or(0)
    }

    /// Returns the word at `index` as a signed integer.
    #[must_use]
    pub fn int(&self, index: usize) -> i32 {
        self.word(index) as i32
    }

    /// Returns the word at `index` as a float.
    #[must_use]
    pub fn float(&self, index: usize) -> f32 {
        f32::from_bits(self.word(index))
    }

    /// Sets the raw word at `index`. Out of range writes are ignored.
    pub fn set_word(&mut self, index: usize, value: u32) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = value;
        }
    }

    /// Sets a signed integer field.
    pub fn set_int(&mut self, index: usize, value: i32) {
        self.set_word(index, value as u32);
    }

    /// Sets a float or angle field.
    pub fn set_float(&mut self, index: usize, value: f32) {
        self.set_word(index, value.to_bits());
    }

    /// Returns the words as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Returns `true` when every field is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }
}

/// The client-visible part of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityState {
    pub number: EntityNumber,
    pub fields: FieldBlock,
}

impl EntityState {
    /// Creates a zero-valued entity for a table of `field_count` fields.
    #[must_use]
    pub fn zeroed(number: EntityNumber, field_count: usize) -> Self {
        Self {
            number,
            fields: FieldBlock::zeroed(field_count),
        }
    }
}

/// The client-visible part of one player's state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerState {
    /// Server-side client number this state belongs to.
    pub client_num: u8,
    pub fields: FieldBlock,
}

impl PlayerState {
    /// Creates a zero-valued player state for a table of `field_count` fields.
    #[must_use]
    pub fn zeroed(field_count: usize) -> Self {
        Self {
            client_num: 0,
            fields: FieldBlock::zeroed(field_count),
        }
    }
}
