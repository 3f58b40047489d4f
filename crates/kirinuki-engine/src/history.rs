//! Bounded undo/redo history over mask snapshots.
//!
//! Each entry is a full copy of the mask's raw bytes plus a
//! SipHash-1-3 checksum. Entry 0 is always the neutral initial mask;
//! the stack is capped at [`History::MAX_ENTRIES`] with FIFO eviction.
//! Committing while the cursor is not at the tail discards the redo
//! branch (standard undo-branch-overwrite semantics).
//!
//! Snapshot validation is defensive: a checksum or length mismatch
//! falls back to entry 0, and failing that, to a fresh neutral mask --
//! an editing session is never crashed over a bad snapshot.

use std::hash::Hasher;

use image::GrayAlphaImage;
use siphasher::sip::SipHasher13;

/// Undo/redo availability, published to the host after every change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStatus {
    /// Whether `undo()` would do anything.
    pub can_undo: bool,
    /// Whether `redo()` would do anything.
    pub can_redo: bool,
}

/// How a snapshot restore was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    /// The requested snapshot was intact.
    Snapshot,
    /// The requested snapshot was invalid; entry 0 was used instead.
    FellBackToInitial,
    /// Entry 0 was also invalid; a fresh neutral mask was produced.
    Reinitialized,
}

/// One stored mask state.
#[derive(Debug, Clone)]
struct Snapshot {
    pixels: Vec<u8>,
    checksum: u64,
}

impl Snapshot {
    fn capture(raw: &[u8]) -> Self {
        Self {
            pixels: raw.to_vec(),
            checksum: checksum(raw),
        }
    }

    fn is_valid(&self, expected_len: usize) -> bool {
        self.pixels.len() == expected_len && checksum(&self.pixels) == self.checksum
    }
}

/// Bounded snapshot stack with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Snapshot>,
    cursor: usize,
    snapshot_len: usize,
}

impl History {
    /// Maximum number of retained entries; the oldest is evicted first.
    pub const MAX_ENTRIES: usize = 20;

    /// Start a history whose entry 0 is the given (neutral) mask.
    #[must_use]
    pub fn new(initial: &GrayAlphaImage) -> Self {
        let raw = initial.as_raw();
        Self {
            entries: vec![Snapshot::capture(raw)],
            cursor: 0,
            snapshot_len: raw.len(),
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` -- entry 0 is never evicted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Current cursor position.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Undo/redo availability at the current cursor.
    #[must_use]
    pub const fn status(&self) -> HistoryStatus {
        HistoryStatus {
            can_undo: self.cursor > 0,
            can_redo: self.cursor + 1 < self.entries.len(),
        }
    }

    /// Record the mask after a committed operation (pointer-up or a
    /// completed flood fill).
    ///
    /// Truncates any redo branch, pushes the snapshot, and advances the
    /// cursor; when the stack exceeds [`Self::MAX_ENTRIES`] the oldest
    /// entry is dropped and the cursor shifts with it.
    pub fn commit(&mut self, mask: &GrayAlphaImage) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(Snapshot::capture(mask.as_raw()));
        self.cursor += 1;

        if self.entries.len() > Self::MAX_ENTRIES {
            self.entries.remove(0);
            self.cursor -= 1;
        }
    }

    /// Step the cursor back and return the mask bytes to restore.
    ///
    /// Returns `None` when already at entry 0.
    pub fn undo(&mut self) -> Option<(Vec<u8>, Restore)> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.restore_at(self.cursor))
    }

    /// Step the cursor forward and return the mask bytes to restore.
    ///
    /// Returns `None` when already at the tail.
    pub fn redo(&mut self) -> Option<(Vec<u8>, Restore)> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.restore_at(self.cursor))
    }

    /// Reset to a single neutral entry.
    pub fn clear(&mut self, initial: &GrayAlphaImage) {
        let raw = initial.as_raw();
        self.entries = vec![Snapshot::capture(raw)];
        self.cursor = 0;
        self.snapshot_len = raw.len();
    }

    /// Fetch the snapshot at `index`, applying the fallback chain if
    /// it fails validation.
    fn restore_at(&self, index: usize) -> (Vec<u8>, Restore) {
        let entry = &self.entries[index];
        if entry.is_valid(self.snapshot_len) {
            return (entry.pixels.clone(), Restore::Snapshot);
        }

        let initial = &self.entries[0];
        if initial.is_valid(self.snapshot_len) {
            return (initial.pixels.clone(), Restore::FellBackToInitial);
        }

        (vec![0; self.snapshot_len], Restore::Reinitialized)
    }

    /// Corrupt a stored snapshot in place (validation testing only).
    #[cfg(test)]
    pub(crate) fn corrupt_entry(&mut self, index: usize) {
        if let Some(byte) = self.entries[index].pixels.first_mut() {
            *byte = byte.wrapping_add(1);
        } else {
            self.entries[index].checksum ^= 1;
        }
    }
}

/// SipHash-1-3 checksum of a snapshot's bytes. Fixed keys: this guards
/// against accidental corruption, not an adversary.
fn checksum(bytes: &[u8]) -> u64 {
    let mut hasher = SipHasher13::new();
    hasher.write(bytes);
    hasher.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::LumaA;

    fn mask_with(value: u8) -> GrayAlphaImage {
        GrayAlphaImage::from_pixel(4, 4, LumaA([255, value]))
    }

    fn neutral() -> GrayAlphaImage {
        GrayAlphaImage::new(4, 4)
    }

    #[test]
    fn new_history_has_single_neutral_entry() {
        let history = History::new(&neutral());
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 0);
        assert_eq!(
            history.status(),
            HistoryStatus {
                can_undo: false,
                can_redo: false,
            }
        );
    }

    #[test]
    fn commit_advances_cursor_and_enables_undo() {
        let mut history = History::new(&neutral());
        history.commit(&mask_with(10));
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), 1);
        assert!(history.status().can_undo);
        assert!(!history.status().can_redo);
    }

    #[test]
    fn undo_then_redo_is_bitwise_identity() {
        let mut history = History::new(&neutral());
        let edited = mask_with(99);
        history.commit(&edited);

        let (undone, how) = history.undo().unwrap();
        assert_eq!(how, Restore::Snapshot);
        assert_eq!(undone, neutral().as_raw().clone());

        let (redone, how) = history.redo().unwrap();
        assert_eq!(how, Restore::Snapshot);
        assert_eq!(redone, edited.as_raw().clone());
    }

    #[test]
    fn undo_at_start_and_redo_at_tail_are_no_ops() {
        let mut history = History::new(&neutral());
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
        history.commit(&mask_with(1));
        assert!(history.redo().is_none());
        assert!(!history.status().can_redo);
    }

    #[test]
    fn commit_mid_stack_discards_redo_branch() {
        let mut history = History::new(&neutral());
        history.commit(&mask_with(1));
        history.commit(&mask_with(2));
        let _ = history.undo().unwrap();

        history.commit(&mask_with(3));
        assert_eq!(history.len(), 3); // neutral, 1, 3
        assert!(!history.status().can_redo);
        let (bytes, _) = history.undo().unwrap();
        assert_eq!(bytes, mask_with(1).as_raw().clone());
    }

    #[test]
    fn stack_is_bounded_with_fifo_eviction() {
        // 25 commits -> 20 entries, cursor at the tail,
        // and the oldest states are the ones dropped.
        let mut history = History::new(&neutral());
        for i in 1..=25u8 {
            history.commit(&mask_with(i));
        }
        assert_eq!(history.len(), History::MAX_ENTRIES);
        assert_eq!(history.cursor(), History::MAX_ENTRIES - 1);

        // Undoing all the way lands on commit #6, the new floor.
        let mut last = Vec::new();
        while let Some((bytes, _)) = history.undo() {
            last = bytes;
        }
        assert_eq!(history.cursor(), 0);
        assert_eq!(last, mask_with(6).as_raw().clone());
    }

    #[test]
    fn cursor_stays_valid_across_eviction() {
        let mut history = History::new(&neutral());
        for i in 1..=30u8 {
            history.commit(&mask_with(i));
            assert!(history.cursor() < history.len());
        }
    }

    #[test]
    fn corrupt_snapshot_falls_back_to_initial() {
        let mut history = History::new(&neutral());
        history.commit(&mask_with(1));
        history.commit(&mask_with(2));
        history.corrupt_entry(1);

        let (bytes, how) = history.undo().unwrap();
        assert_eq!(how, Restore::FellBackToInitial);
        assert_eq!(bytes, neutral().as_raw().clone());
    }

    #[test]
    fn corrupt_initial_reinitializes_neutral() {
        let mut history = History::new(&mask_with(7));
        history.commit(&mask_with(1));
        history.corrupt_entry(0);

        let (bytes, how) = history.undo().unwrap();
        assert_eq!(how, Restore::Reinitialized);
        assert_eq!(bytes, vec![0u8; 32]);
    }

    #[test]
    fn clear_resets_to_single_entry() {
        let mut history = History::new(&neutral());
        history.commit(&mask_with(1));
        history.commit(&mask_with(2));
        history.clear(&neutral());
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.status(), HistoryStatus::default());
    }
}
