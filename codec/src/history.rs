//! Snapshot records and the history ring keyed by message number.

use wire::protocol::{MAX_MAP_AREA_BYTES, MAX_SPLITVIEW};
use wire::SnapFlags;

use crate::state::PlayerState;

/// Per split-view slot data of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewSlot {
    /// Index into the snapshot's player states, `None` when absent.
    pub lc_index: Option<u8>,
    /// Server client number viewed through this slot.
    pub client_num: Option<u8>,
    pub area_mask: [u8; MAX_MAP_AREA_BYTES],
}

/// One decoded snapshot.
///
/// Entities are not stored inline; they live in the parse-entities ring at
/// `[parse_entities_start, parse_entities_start + entity_count)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Cleared when the slot is invalidated by a later commit.
    pub valid: bool,
    pub message_num: i32,
    /// Message number of the delta base, or a non-positive value for a full snapshot.
    pub delta_num: i32,
    pub flags: SnapFlags,
    pub server_time: i32,
    /// Reliable server command sequence at the time of the snapshot.
    pub server_command_num: i32,
    /// Round-trip estimate in milliseconds, 999 when unknown.
    pub ping: i32,
    pub views: [ViewSlot; MAX_SPLITVIEW],
    /// Player states indexed by `ViewSlot::lc_index`.
    pub player_states: Vec<PlayerState>,
    pub parse_entities_start: u64,
    pub entity_count: usize,
}

impl Snapshot {
    /// Returns `true` if the snapshot was delta compressed.
    #[must_use]
    pub const fn is_delta(&self) -> bool {
        self.delta_num > 0
    }

    /// Returns the player state viewed through split slot `view`.
    #[must_use]
    pub fn view_player_state(&self, view: usize) -> Option<&PlayerState> {
        let lc = self.views.get(view)?.lc_index?;
        self.player_states.get(usize::from(lc))
    }
}

/// A fixed-capacity ring of snapshots keyed by message number.
///
/// Slot `n % capacity` holds the snapshot with message number `n`. A slot may
/// hold a different, older message number after wraparound; lookups compare
/// the stored number to detect that.
#[derive(Debug)]
pub struct SnapshotHistory {
    entries: Vec<Option<Snapshot>>,
    last_message_num: Option<i32>,
}

impl SnapshotHistory {
    /// Creates an empty history with `capacity` slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(1);
        let mut entries = Vec::with_capacity(cap);
        entries.resize_with(cap, || None);
        Self {
            entries,
            last_message_num: None,
        }
    }

    /// Returns the capacity of the ring.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the message number of the most recent commit.
    #[must_use]
    pub fn last_message_num(&self) -> Option<i32> {
        self.last_message_num
    }

    /// Returns the slot for `message_num` regardless of validity or aliasing.
    #[must_use]
    pub fn slot(&self, message_num: i32) -> Option<&Snapshot> {
        self.entries[self.index(message_num)].as_ref()
    }

    /// Returns the snapshot for an exact message number if it is still valid.
    #[must_use]
    pub fn get(&self, message_num: i32) -> Option<&Snapshot> {
        self.slot(message_num)
            .filter(|s| s.valid && s.message_num == message_num)
    }

    /// Returns the most recently committed snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<&Snapshot> {
        self.last_message_num.and_then(|n| self.get(n))
    }

    /// Commits a snapshot.
    ///
    /// Every slot between the previous commit and this one is marked invalid
    /// first, so a dropped message never leaves an older frame in a slot that
    /// a later delta could mistake for its base.
    pub fn commit(&mut self, snapshot: Snapshot) {
        let new = snapshot.message_num;
        let backup = self.entries.len() as i64;
        let new_wide = i64::from(new);
        let mut old = self
            .last_message_num
            .map_or(new_wide - (backup - 1), |last| i64::from(last) + 1);
        if new_wide - old >= backup {
            old = new_wide - (backup - 1);
        }
        while old < new_wide {
            // old lies within one ring length of new
            let index = self.index(old as i32);
            if let Some(entry) = self.entries[index].as_mut() {
                entry.valid = false;
            }
            old += 1;
        }

        let index = self.index(new);
        self.entries[index] = Some(snapshot);
        self.last_message_num = Some(new);
    }

    /// Clears every slot.
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.last_message_num = None;
    }

    /// Returns valid snapshots from oldest to newest message number.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Snapshot> {
        let mut valid: Vec<&Snapshot> = self.entries.iter().flatten().filter(|s| s.valid).collect();
        valid.sort_by_key(|s| s.message_num);
        valid.into_iter()
    }

    fn index(&self, message_num: i32) -> usize {
        i64::from(message_num).rem_euclid(self.entries.len() as i64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(message_num: i32) -> Snapshot {
        Snapshot {
            valid: true,
            message_num,
            delta_num: -1,
            flags: SnapFlags::default(),
            server_time: message_num * 50,
            server_command_num: 0,
            ping: 999,
            views: [ViewSlot::default(); MAX_SPLITVIEW],
            player_states: Vec::new(),
            parse_entities_start: 0,
            entity_count: 0,
        }
    }

    #[test]
    fn commit_and_get() {
        let mut history = SnapshotHistory::new(4);
        history.commit(snapshot(1));
        history.commit(snapshot(2));

        assert_eq!(history.get(1).unwrap().message_num, 1);
        assert_eq!(history.get(2).unwrap().message_num, 2);
        assert!(history.get(3).is_none());
        assert_eq!(history.latest().unwrap().message_num, 2);
    }

    #[test]
    fn aliasing_is_detected() {
        let mut history = SnapshotHistory::new(4);
        history.commit(snapshot(1));
        history.commit(snapshot(5));

        assert!(history.get(1).is_none());
        assert_eq!(history.slot(1).unwrap().message_num, 5);
    }

    #[test]
    fn gap_invalidates_skipped_slots() {
        let mut history = SnapshotHistory::new(4);
        history.commit(snapshot(1));
        history.commit(snapshot(2));
        history.commit(snapshot(3));
        // 4 and 5 dropped: 5 shares a slot with 1, 6 overwrites 2.
        history.commit(snapshot(6));

        assert!(history.get(1).is_none());
        assert!(!history.slot(1).unwrap().valid);
        assert!(history.get(2).is_none());
        assert_eq!(history.get(3).unwrap().message_num, 3);
        assert_eq!(history.get(6).unwrap().message_num, 6);
    }

    #[test]
    fn large_jump_invalidates_everything_older() {
        let mut history = SnapshotHistory::new(4);
        for n in 1..=4 {
            history.commit(snapshot(n));
        }
        history.commit(snapshot(40));

        for n in 1..=4 {
            assert!(history.get(n).is_none());
        }
        assert_eq!(history.iter().count(), 1);
    }

    #[test]
    fn contiguous_commits_stay_valid() {
        let mut history = SnapshotHistory::new(4);
        for n in 10..14 {
            history.commit(snapshot(n));
        }
        let numbers: Vec<i32> = history.iter().map(|s| s.message_num).collect();
        assert_eq!(numbers, vec![10, 11, 12, 13]);
    }

    #[test]
    fn reset_clears() {
        let mut history = SnapshotHistory::new(2);
        history.commit(snapshot(1));
        history.reset();
        assert!(history.latest().is_none());
        assert!(history.slot(1).is_none());
    }

    #[test]
    fn view_player_state_lookup() {
        let mut snap = snapshot(1);
        snap.player_states.push(PlayerState::zeroed(1));
        snap.views[2].lc_index = Some(0);
        assert!(snap.view_player_state(2).is_some());
        assert!(snap.view_player_state(0).is_none());
        assert!(snap.view_player_state(9).is_none());
    }
}
