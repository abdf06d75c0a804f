//! Parse-entities ring.

use crate::state::EntityState;

/// Every entity state decoded since the last gamestate, addressed by a
/// logical index that only grows.
///
/// Physically a ring of fixed capacity: index `i` lives at `i % capacity`.
/// Only the newest `capacity` indices are addressable; [`get`](Self::get)
/// returns `None` outside `[next - capacity, next)` rather than stale data.
#[derive(Debug, Clone)]
pub struct ParseEntities {
    slots: Vec<EntityState>,
    capacity: usize,
    next: u64,
}

impl ParseEntities {
    /// Creates an empty ring. Storage grows on demand up to `capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity: capacity.max(1),
            next: 0,
        }
    }

    /// Returns the ring capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the logical index the next append will use.
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.next
    }

    /// Appends a state and advances the write counter.
    pub fn append(&mut self, state: EntityState) {
        let slot = self.slot(self.next);
        if slot < self.slots.len() {
            self.slots[slot] = state;
        } else {
            self.slots.push(state);
        }
        self.next += 1;
    }

    /// Returns the state at a logical index, if still addressable.
    #[must_use]
    pub fn get(&self, index: u64) -> Option<&EntityState> {
        if index >= self.next || self.next - index > self.capacity as u64 {
            return None;
        }
        self.slots.get(self.slot(index))
    }

    /// Iterates over `count` states starting at `start`.
    ///
    /// Indices that are no longer addressable end the iteration early.
    pub fn span(&self, start: u64, count: usize) -> impl Iterator<Item = &EntityState> + '_ {
        (start..start + count as u64).map_while(move |index| self.get(index))
    }

    /// Drops every state and resets the counter to zero.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.next = 0;
    }

    fn slot(&self, index: u64) -> usize {
        (index % self.capacity as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityNumber;

    fn state(number: u16) -> EntityState {
        EntityState::zeroed(EntityNumber::new(number), 1)
    }

    #[test]
    fn append_and_get() {
        let mut ring = ParseEntities::new(4);
        ring.append(state(1));
        ring.append(state(2));
        assert_eq!(ring.next_index(), 2);
        assert_eq!(ring.get(0).unwrap().number.raw(), 1);
        assert_eq!(ring.get(1).unwrap().number.raw(), 2);
        assert!(ring.get(2).is_none());
    }

    #[test]
    fn wraparound_window() {
        let mut ring = ParseEntities::new(3);
        for n in 0..7 {
            ring.append(state(n));
        }
        assert!(ring.get(3).is_none());
        assert_eq!(ring.get(4).unwrap().number.raw(), 4);
        assert_eq!(ring.get(6).unwrap().number.raw(), 6);
        assert!(ring.get(7).is_none());
    }

    #[test]
    fn span_stops_at_overwritten() {
        let mut ring = ParseEntities::new(4);
        for n in 10..16 {
            ring.append(state(n));
        }
        let numbers: Vec<u16> = ring.span(3, 3).map(|e| e.number.raw()).collect();
        assert_eq!(numbers, vec![13, 14, 15]);
        let numbers: Vec<u16> = ring.span(1, 4).map(|e| e.number.raw()).collect();
        assert!(numbers.is_empty());
        assert_eq!(ring.span(100, 0).count(), 0);
    }

    #[test]
    fn reset_clears_counter() {
        let mut ring = ParseEntities::new(2);
        ring.append(state(1));
        ring.reset();
        assert_eq!(ring.next_index(), 0);
        assert!(ring.get(0).is_none());
    }
}
