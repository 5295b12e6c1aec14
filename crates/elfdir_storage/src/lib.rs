//! # elfdir storage
//!
//! A read-only index directory whose items live in sections embedded in an
//! ELF executable.
//!
//! Search indexes are made of immutable *segments* and *snapshots*, each
//! addressed by a numeric id. Instead of shipping them as loose files, the
//! `elfdir embed` tool appends every item to an already-built binary as a
//! non-loaded section. At run time [`ElfDirectory`] finds those sections and
//! serves them as zero-copy memory maps.
//!
//! ## Design Principles
//!
//! - Section names carry the keys: `elfdir/<dir>/<hex id>.seg|.snp`
//! - Names are parsed once at setup into an immutable [`SectionCatalog`]
//! - Each load maps its own page-aligned window and owns its file handle
//! - Every write operation fails with [`StorageError::Unsupported`]
//!
//! ## Example
//!
//! ```no_run
//! use elfdir_storage::{Directory, ElfDirectory, ItemKind};
//!
//! let mut dir = ElfDirectory::new(std::env::current_exe().unwrap(), "idx1");
//! dir.setup(true).unwrap();
//! if let Some(&latest) = dir.list(ItemKind::Snapshot).unwrap().first() {
//!     let snapshot = dir.load(ItemKind::Snapshot, latest).unwrap();
//!     assert_eq!(snapshot.len(), snapshot.as_bytes().len());
//!     snapshot.release().unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod config;
mod directory;
pub mod elf;
mod elf_dir;
mod error;
mod kind;
mod mapped;
mod naming;

pub use catalog::{SectionCatalog, SectionRange};
pub use config::DirectoryConfig;
pub use directory::{Directory, DirectoryStats};
pub use elf_dir::ElfDirectory;
pub use error::{StorageError, StorageResult};
pub use kind::{ItemKind, SEGMENT_SUFFIX, SNAPSHOT_SUFFIX};
pub use mapped::{page_size, MapWindow, MappedItem, DEFAULT_PAGE_SIZE};
pub use naming::{item_file_name, parse_item_name, section_name, section_prefix_for, SECTION_PREFIX};
