//! Index directory trait definition.

use crate::error::StorageResult;
use crate::kind::ItemKind;
use std::io::Read;
use std::ops::Deref;

/// Item and byte counts reported by [`Directory::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    /// Number of stored items across kinds.
    pub items: u64,
    /// Total size of stored items in bytes.
    pub bytes: u64,
}

/// A store of immutable index items, addressed by kind and numeric id.
///
/// An index library discovers items with [`list`](Directory::list) and reads
/// them with [`load`](Directory::load). Read-only implementations reject the
/// write path with [`StorageError::Unsupported`](crate::StorageError::Unsupported).
///
/// # Invariants
///
/// - `setup` runs before any other call and is not concurrent with them
///   (enforced by `&mut self`)
/// - `list` returns ids in descending order, without duplicates
/// - every id returned by `list` can be loaded
/// - `list` and `load` may be called concurrently
///
/// # Implementors
///
/// - [`super::ElfDirectory`] - Items embedded as sections of an ELF binary
pub trait Directory: Send + Sync {
    /// A loaded item: dereferences to its bytes until released.
    type Item: Deref<Target = [u8]>;

    /// Prepares the directory for use.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested mode is not supported or the
    /// backing store cannot be read.
    fn setup(&mut self, read_only: bool) -> StorageResult<()>;

    /// Returns the ids of all items of `kind`, largest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the ids cannot be determined.
    fn list(&self, kind: ItemKind) -> StorageResult<Vec<u64>>;

    /// Loads one item.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ItemNotFound`](crate::StorageError::ItemNotFound)
    /// for unknown ids, or an I/O error.
    fn load(&self, kind: ItemKind, id: u64) -> StorageResult<Self::Item>;

    /// Stores a new item read from `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be stored.
    fn persist(&mut self, kind: ItemKind, id: u64, source: &mut dyn Read) -> StorageResult<()>;

    /// Removes an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be removed.
    fn remove(&mut self, kind: ItemKind, id: u64) -> StorageResult<()>;

    /// Makes persisted items durable.
    ///
    /// # Errors
    ///
    /// Returns an error if syncing fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Acquires exclusive write access.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be taken.
    fn lock(&mut self) -> StorageResult<()>;

    /// Releases exclusive write access.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock cannot be released.
    fn unlock(&mut self) -> StorageResult<()>;

    /// Returns the number of stored items and their total size.
    fn stats(&self) -> DirectoryStats;
}
