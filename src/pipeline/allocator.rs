//! Output slot allocation: find the next `NNNN.<ext>` name not yet on disk.
//!
//! The running counter is only a hint. Every candidate is probed on the
//! filesystem, so files left behind by an earlier run in the same destination
//! are skipped instead of overwritten.

use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A free output path and the sequence number it was formatted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub path: PathBuf,
    pub sequence: u32,
}

/// Format the candidate file name for `sequence`: zero-padded to 4 digits.
pub fn slot_file_name(sequence: u32, extension: &str) -> String {
    format!("{sequence:04}.{extension}")
}

/// Probe `dir` from `start` upwards and return the first free slot.
///
/// Never creates the file. Fails only when `dir` cannot be inspected.
pub fn next_free_slot(dir: &Path, extension: &str, start: u32) -> io::Result<Slot> {
    let meta = std::fs::metadata(dir)?;
    if !meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("'{}' is not a directory", dir.display()),
        ));
    }

    let mut sequence = start;
    loop {
        let candidate = dir.join(slot_file_name(sequence, extension));
        if !candidate.try_exists()? {
            return Ok(Slot {
                path: candidate,
                sequence,
            });
        }
        debug!("Slot {} taken, probing next", candidate.display());
        sequence = sequence.checked_add(1).ok_or_else(|| {
            io::Error::new(io::ErrorKind::StorageFull, "sequence numbers exhausted")
        })?;
    }
}

/// Stateful allocator over one images directory.
///
/// `reserve` does not consume anything: a slot becomes taken either by the
/// file appearing on disk or by [`SequenceAllocator::advance_past`].
#[derive(Debug, Clone)]
pub struct SequenceAllocator {
    dir: PathBuf,
    extension: &'static str,
    next_sequence: u32,
}

impl SequenceAllocator {
    pub fn new(dir: impl Into<PathBuf>, extension: &'static str, start: u32) -> Self {
        Self {
            dir: dir.into(),
            extension,
            next_sequence: start,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sequence number the next probe starts from.
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    /// Find the next free slot starting at the hint.
    pub fn reserve(&self) -> io::Result<Slot> {
        next_free_slot(&self.dir, self.extension, self.next_sequence)
    }

    /// Resume future probing after `slot`.
    pub fn advance_past(&mut self, slot: &Slot) {
        self.next_sequence = self.next_sequence.max(slot.sequence.saturating_add(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn file_name_is_zero_padded() {
        assert_eq!(slot_file_name(1, "tif"), "0001.tif");
        assert_eq!(slot_file_name(42, "png"), "0042.png");
        assert_eq!(slot_file_name(12345, "tif"), "12345.tif");
    }

    #[test]
    fn empty_directory_uses_start() {
        let dir = tempfile::tempdir().unwrap();
        let slot = next_free_slot(dir.path(), "tif", 1).unwrap();
        assert_eq!(slot.sequence, 1);
        assert_eq!(slot.path, dir.path().join("0001.tif"));
        assert!(!slot.path.exists(), "allocator must not create the file");
    }

    #[test]
    fn skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        for n in 1..=3 {
            fs::write(dir.path().join(slot_file_name(n, "tif")), b"x").unwrap();
        }
        let slot = next_free_slot(dir.path(), "tif", 1).unwrap();
        assert_eq!(slot.sequence, 4);
    }

    #[test]
    fn other_extensions_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0001.png"), b"x").unwrap();
        let slot = next_free_slot(dir.path(), "tif", 1).unwrap();
        assert_eq!(slot.sequence, 1);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(next_free_slot(&missing, "tif", 1).is_err());
    }

    #[test]
    fn file_instead_of_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"x").unwrap();
        assert!(next_free_slot(&file, "tif", 1).is_err());
    }

    #[test]
    fn reserve_is_idempotent_until_advanced() {
        let dir = tempfile::tempdir().unwrap();
        let mut alloc = SequenceAllocator::new(dir.path(), "tif", 1);

        let a = alloc.reserve().unwrap();
        let b = alloc.reserve().unwrap();
        assert_eq!(a, b);

        alloc.advance_past(&a);
        assert_eq!(alloc.next_sequence(), 2);
        assert_eq!(alloc.reserve().unwrap().sequence, 2);
    }

    #[test]
    fn written_file_is_skipped_without_advancing() {
        let dir = tempfile::tempdir().unwrap();
        let alloc = SequenceAllocator::new(dir.path(), "tif", 1);
        let a = alloc.reserve().unwrap();
        fs::write(&a.path, b"x").unwrap();
        assert_eq!(alloc.reserve().unwrap().sequence, 2);
    }

    #[test]
    fn advance_never_moves_backwards() {
        let dir = tempfile::tempdir().unwrap();
        let mut alloc = SequenceAllocator::new(dir.path(), "tif", 10);
        alloc.advance_past(&Slot {
            path: dir.path().join("0003.tif"),
            sequence: 3,
        });
        assert_eq!(alloc.next_sequence(), 10);
    }
}
