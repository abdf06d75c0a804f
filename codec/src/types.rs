//! Core types for the codec.

use wire::protocol::{ENTITYNUM_NONE, GENTITYNUM_BITS, MAX_GENTITIES};

/// An entity number in `[0, MAX_GENTITIES)`.
///
/// The highest number, [`EntityNumber::NONE`], never names a stored entity;
/// on the wire it ends the packet-entities list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityNumber(u16);

impl EntityNumber {
    /// The end-of-list marker.
    pub const NONE: Self = Self(ENTITYNUM_NONE);

    /// Bits used to send an entity number.
    pub const BITS: u8 = GENTITYNUM_BITS;

    /// Creates a new entity number without range checks.
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Creates an entity number if `raw` lies below `MAX_GENTITIES`.
    #[must_use]
    pub const fn try_new(raw: u32) -> Option<Self> {
        if (raw as usize) < MAX_GENTITIES {
            Some(Self(raw as u16))
        } else {
            None
        }
    }

    /// Returns the raw entity number.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Returns the number as a table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` for the end-of-list marker.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == ENTITYNUM_NONE
    }
}

impl From<EntityNumber> for u16 {
    fn from(number: EntityNumber) -> Self {
        number.0
    }
}

impl std::fmt::Display for EntityNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_number_new() {
        let number = EntityNumber::new(42);
        assert_eq!(number.raw(), 42);
        assert_eq!(number.index(), 42);
        assert!(!number.is_none());
    }

    #[test]
    fn entity_number_try_new_bounds() {
        assert_eq!(EntityNumber::try_new(1023), Some(EntityNumber::NONE));
        assert_eq!(EntityNumber::try_new(1024), None);
        assert_eq!(EntityNumber::try_new(0), Some(EntityNumber::new(0)));
    }

    #[test]
    fn entity_number_none_is_sentinel() {
        assert!(EntityNumber::NONE.is_none());
        assert_eq!(EntityNumber::NONE.raw(), 1023);
        assert!(EntityNumber::new(ENTITYNUM_NONE).is_none());
        assert!(!EntityNumber::new(ENTITYNUM_NONE - 1).is_none());
    }

    #[test]
    fn entity_number_ordering() {
        assert!(EntityNumber::new(2) < EntityNumber::new(5));
        assert!(EntityNumber::new(5) < EntityNumber::NONE);
    }

    #[test]
    fn entity_number_display() {
        assert_eq!(EntityNumber::new(7).to_string(), "7");
    }
}
