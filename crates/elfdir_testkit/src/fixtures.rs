//! Test fixtures and directory helpers.
//!
//! Provides convenience functions for writing ELF images to temporary
//! files and opening directories over them.

use crate::image::ElfImage;
use elfdir_storage::{Directory, ElfDirectory, ItemKind};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An ELF image written to a temporary file, removed on drop.
pub struct TempElf {
    path: PathBuf,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TempElf {
    /// Writes `image` to a fresh temporary file.
    pub fn new(image: &ElfImage) -> Self {
        Self::from_bytes(&image.build())
    }

    /// Writes raw bytes to a fresh temporary file.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("container.elf");
        std::fs::write(&path, bytes).expect("Failed to write ELF image");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Path of the binary.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates a directory over this binary without setting it up.
    pub fn directory(&self, name: &str) -> ElfDirectory {
        ElfDirectory::new(&self.path, name)
    }

    /// Creates a directory over this binary and sets it up read-only.
    pub fn open_directory(&self, name: &str) -> ElfDirectory {
        let mut dir = self.directory(name);
        dir.setup(true).expect("Failed to set up elf directory");
        dir
    }

    /// Reads `len` bytes at `offset` straight from the file.
    pub fn read_range(&self, offset: u64, len: usize) -> Vec<u8> {
        let mut file = std::fs::File::open(&self.path).expect("Failed to open ELF image");
        file.seek(SeekFrom::Start(offset)).expect("Failed to seek");
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).expect("Failed to read range");
        buf
    }
}

/// Runs a test with a set-up directory over a temporary copy of `image`.
///
/// # Example
///
/// ```rust
/// use elfdir_testkit::{with_elf_directory, ElfImage};
/// use elfdir_storage::{Directory, ItemKind};
///
/// let image = ElfImage::new().item("idx", ItemKind::Snapshot, 3, b"manifest");
/// let ids = with_elf_directory(&image, "idx", |dir| dir.list(ItemKind::Snapshot).unwrap());
/// assert_eq!(ids, vec![3]);
/// ```
pub fn with_elf_directory<F, R>(image: &ElfImage, name: &str, f: F) -> R
where
    F: FnOnce(&ElfDirectory) -> R,
{
    let elf = TempElf::new(image);
    let dir = elf.open_directory(name);
    f(&dir)
}

/// Loads an item, copies its bytes and releases the mapping.
pub fn load_bytes(dir: &ElfDirectory, kind: ItemKind, id: u64) -> Vec<u8> {
    let item = dir.load(kind, id).expect("Failed to load item");
    let bytes = item.to_vec();
    item.release().expect("Failed to release item");
    bytes
}

/// Number of open file descriptors of this process, where observable.
pub fn open_descriptor_count() -> Option<usize> {
    std::fs::read_dir("/proc/self/fd")
        .ok()
        .map(|entries| entries.count())
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Segments `0x1`, `0xa` and `0x10` of `dir`, holding
    /// [`payload_for`] contents, between unrelated sections.
    pub fn three_segments(dir: &str) -> ElfImage {
        [1u64, 0xa, 0x10]
            .into_iter()
            .fold(ElfImage::new().section(".text", vec![0x90; 64]), |image, id| {
                image.item(dir, ItemKind::Segment, id, payload_for(ItemKind::Segment, id))
            })
            .section(".comment", b"GCC: (GNU) 13.2.0".to_vec())
    }

    /// An image with `segments` segments and `snapshots` snapshots of `dir`,
    /// numbered from 1.
    pub fn mixed_items(dir: &str, segments: u64, snapshots: u64) -> ElfImage {
        let image = (1..=segments).fold(ElfImage::new(), |image, id| {
            image.item(dir, ItemKind::Segment, id, payload_for(ItemKind::Segment, id))
        });
        (1..=snapshots).fold(image, |image, id| {
            image.item(dir, ItemKind::Snapshot, id, payload_for(ItemKind::Snapshot, id))
        })
    }

    /// Deterministic contents used by the scenarios.
    pub fn payload_for(kind: ItemKind, id: u64) -> Vec<u8> {
        format!("{kind} {id:x} contents").into_bytes()
    }
}
