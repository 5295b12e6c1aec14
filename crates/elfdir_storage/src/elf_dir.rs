//! Read-only directory served from sections of an ELF binary.

use crate::catalog::SectionCatalog;
use crate::config::DirectoryConfig;
use crate::directory::{Directory, DirectoryStats};
use crate::elf::SectionTable;
use crate::error::{StorageError, StorageResult};
use crate::kind::ItemKind;
use crate::mapped::{close_file, MappedItem};
use crate::naming::prefix_with;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A directory whose items are sections embedded in an ELF binary.
///
/// Items of directory `name` live in sections named
/// `elfdir/<name>/<hex id>.seg` and `elfdir/<name>/<hex id>.snp`, added
/// after the binary was built (see the `elfdir embed` command). The
/// directory is permanently read-only.
///
/// # Thread Safety
///
/// After [`setup`](Directory::setup) the catalog is immutable; `list` and
/// `load` take `&self` and can be called from many threads at once. Each
/// load opens its own file handle and mapping.
///
/// # Example
///
/// ```no_run
/// use elfdir_storage::{Directory, ElfDirectory, ItemKind};
///
/// let mut dir = ElfDirectory::new("/usr/local/bin/search-server", "products");
/// dir.setup(true).unwrap();
/// for id in dir.list(ItemKind::Snapshot).unwrap() {
///     let item = dir.load(ItemKind::Snapshot, id).unwrap();
///     println!("snapshot {id}: {} bytes", item.len());
///     item.release().unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct ElfDirectory {
    path: PathBuf,
    prefix: String,
    config: DirectoryConfig,
    catalog: SectionCatalog,
}

impl ElfDirectory {
    /// Creates a directory for `name` inside the binary at `path`.
    ///
    /// Nothing is read until [`setup`](Directory::setup).
    pub fn new(path: impl AsRef<Path>, name: &str) -> Self {
        Self::with_config(path, name, DirectoryConfig::default())
    }

    /// Creates a directory with a custom configuration.
    pub fn with_config(path: impl AsRef<Path>, name: &str, config: DirectoryConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            prefix: prefix_with(&config.section_prefix, name),
            config,
            catalog: SectionCatalog::default(),
        }
    }

    /// Returns the path to the container binary.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the section name prefix of this directory.
    #[must_use]
    pub fn section_prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the catalog built by the last successful setup.
    #[must_use]
    pub fn catalog(&self) -> &SectionCatalog {
        &self.catalog
    }

    fn read_catalog(&self) -> StorageResult<SectionCatalog> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let table = SectionTable::read(&mut reader);
        // Only section metadata is kept; the file is closed either way.
        let closed = close_file(reader.into_inner());
        let table = table.and_then(|table| closed.map(|()| table))?;

        let file_len = self.config.verify_section_bounds.then_some(table.file_len);
        SectionCatalog::build(table.with_prefix(&self.prefix), &self.prefix, file_len)
    }
}

fn read_write(operation: &'static str) -> StorageError {
    StorageError::Unsupported { operation }
}

impl Directory for ElfDirectory {
    type Item = MappedItem;

    fn setup(&mut self, read_only: bool) -> StorageResult<()> {
        if !read_only {
            return Err(read_write("setup"));
        }

        self.catalog = SectionCatalog::default();
        self.catalog = self.read_catalog()?;

        debug!(
            path = %self.path.display(),
            prefix = %self.prefix,
            segments = self.catalog.ids(ItemKind::Segment).len(),
            snapshots = self.catalog.ids(ItemKind::Snapshot).len(),
            "elf directory catalog built"
        );
        Ok(())
    }

    fn list(&self, kind: ItemKind) -> StorageResult<Vec<u64>> {
        Ok(self.catalog.ids(kind).to_vec())
    }

    fn load(&self, kind: ItemKind, id: u64) -> StorageResult<MappedItem> {
        let range = self
            .catalog
            .get(kind, id)
            .ok_or(StorageError::ItemNotFound { kind, id })?;

        debug!(%kind, id, offset = range.offset, size = range.size, "mapping item");
        MappedItem::open(&self.path, range)
    }

    fn persist(&mut self, _kind: ItemKind, _id: u64, _source: &mut dyn Read) -> StorageResult<()> {
        Err(read_write("persist"))
    }

    fn remove(&mut self, _kind: ItemKind, _id: u64) -> StorageResult<()> {
        Err(read_write("remove"))
    }

    fn sync(&mut self) -> StorageResult<()> {
        Err(read_write("sync"))
    }

    fn lock(&mut self) -> StorageResult<()> {
        Err(read_write("lock"))
    }

    fn unlock(&mut self) -> StorageResult<()> {
        Err(read_write("unlock"))
    }

    fn stats(&self) -> DirectoryStats {
        DirectoryStats {
            items: self.catalog.len() as u64,
            bytes: self.catalog.total_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_write_setup_fails_before_opening() {
        let dir = tempdir().unwrap();
        let mut elf_dir = ElfDirectory::new(dir.path().join("missing"), "idx");

        let err = elf_dir.setup(false).unwrap_err();
        assert!(err.is_unsupported());

        // The read-only path does reach the file system.
        let err = elf_dir.setup(true).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn write_path_is_unsupported() {
        let mut elf_dir = ElfDirectory::new("/nonexistent", "idx");
        let mut source: &[u8] = b"segment bytes";

        let results = [
            elf_dir.persist(ItemKind::Segment, 1, &mut source),
            elf_dir.remove(ItemKind::Snapshot, 1),
            elf_dir.sync(),
            elf_dir.lock(),
            elf_dir.unlock(),
        ];
        for result in results {
            assert!(result.unwrap_err().is_unsupported());
        }
        assert_eq!(source, b"segment bytes");
        assert!(elf_dir.catalog().is_empty());
    }

    #[test]
    fn not_set_up_is_empty() {
        let elf_dir = ElfDirectory::new("/nonexistent", "idx");
        assert!(elf_dir.list(ItemKind::Segment).unwrap().is_empty());
        assert!(elf_dir.load(ItemKind::Segment, 1).unwrap_err().is_not_found());
        assert_eq!(elf_dir.stats(), DirectoryStats::default());
    }

    #[test]
    fn prefix_follows_config() {
        let elf_dir = ElfDirectory::new("/bin/true", "idx1");
        assert_eq!(elf_dir.section_prefix(), "elfdir/idx1/");
        assert_eq!(elf_dir.path(), Path::new("/bin/true"));

        let custom = ElfDirectory::with_config(
            "/bin/true",
            "idx1",
            DirectoryConfig::new().section_prefix("bluge/"),
        );
        assert_eq!(custom.section_prefix(), "bluge/idx1/");
    }

    #[test]
    fn not_an_elf_fails_setup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("script.sh");
        std::fs::write(&path, b"#!/bin/sh\nexit 0\n").unwrap();

        let mut elf_dir = ElfDirectory::new(&path, "idx");
        let err = elf_dir.setup(true).unwrap_err();
        assert!(matches!(err, StorageError::MalformedBinary(_)));
        assert!(elf_dir.catalog().is_empty());
    }
}
