//! Catalog of the items embedded under one directory prefix.
//!
//! The catalog is built once from a binary's section table and never
//! changes afterwards. Each kind keeps its sections keyed by id together
//! with the ids in descending order, so the newest segment or snapshot is
//! always listed first.

use crate::elf::SectionHeader;
use crate::error::{StorageError, StorageResult};
use crate::kind::ItemKind;
use crate::naming::parse_item_name;
use std::collections::BTreeMap;
use tracing::trace;

/// Byte range of one embedded item within the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRange {
    /// Offset of the first byte within the binary.
    pub offset: u64,
    /// Number of bytes.
    pub size: u64,
}

impl SectionRange {
    /// Offset one past the last byte, if it fits in a u64.
    #[must_use]
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }
}

/// Ids and sections of one item kind.
#[derive(Debug, Clone, Default)]
struct KindIndex {
    sections: BTreeMap<u64, SectionRange>,
    ids_desc: Vec<u64>,
}

impl KindIndex {
    fn from_sections(sections: BTreeMap<u64, SectionRange>) -> Self {
        let ids_desc = sections.keys().rev().copied().collect();
        Self { sections, ids_desc }
    }

    fn total_bytes(&self) -> u64 {
        self.sections.values().map(|range| range.size).sum()
    }
}

/// Sections of one directory, classified by kind and id.
#[derive(Debug, Clone, Default)]
pub struct SectionCatalog {
    segments: KindIndex,
    snapshots: KindIndex,
}

impl SectionCatalog {
    /// Builds a catalog from section headers.
    ///
    /// Sections whose name starts with `prefix` are classified by their
    /// suffix; anything else is ignored. When `file_len` is given, every
    /// cataloged section must lie within it.
    ///
    /// # Errors
    ///
    /// Returns an error if an identifier does not parse, an item appears
    /// twice, or a section extends past `file_len`.
    pub fn build<'a, I>(sections: I, prefix: &str, file_len: Option<u64>) -> StorageResult<Self>
    where
        I: IntoIterator<Item = &'a SectionHeader>,
    {
        let mut segments = BTreeMap::new();
        let mut snapshots = BTreeMap::new();

        for section in sections {
            let Some(rest) = section.name.strip_prefix(prefix.as_bytes()) else {
                continue;
            };
            // Replacement characters never parse as hex digits, so a
            // non UTF-8 remainder cannot alias a valid id.
            let Some((kind, id)) = parse_item_name(&String::from_utf8_lossy(rest))? else {
                trace!(name = %section.display_name(), "skipping unrecognized section");
                continue;
            };

            let range = SectionRange {
                offset: section.offset,
                size: section.file_size(),
            };
            if let Some(len) = file_len {
                if range.size > 0 && range.end().map_or(true, |end| end > len) {
                    return Err(StorageError::malformed(format!(
                        "section '{}' at offset {} with size {} extends past end of file ({len} bytes)",
                        section.display_name(),
                        range.offset,
                        range.size
                    )));
                }
            }

            let map = match kind {
                ItemKind::Segment => &mut segments,
                ItemKind::Snapshot => &mut snapshots,
            };
            if map.insert(id, range).is_some() {
                return Err(StorageError::DuplicateItem { kind, id });
            }
        }

        Ok(Self {
            segments: KindIndex::from_sections(segments),
            snapshots: KindIndex::from_sections(snapshots),
        })
    }

    fn index(&self, kind: ItemKind) -> &KindIndex {
        match kind {
            ItemKind::Segment => &self.segments,
            ItemKind::Snapshot => &self.snapshots,
        }
    }

    /// Ids of `kind`, newest (largest) first.
    #[must_use]
    pub fn ids(&self, kind: ItemKind) -> &[u64] {
        &self.index(kind).ids_desc
    }

    /// Byte range of one item.
    #[must_use]
    pub fn get(&self, kind: ItemKind, id: u64) -> Option<SectionRange> {
        self.index(kind).sections.get(&id).copied()
    }

    /// Total number of cataloged items across kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.ids_desc.len() + self.snapshots.ids_desc.len()
    }

    /// Returns true if no item is cataloged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the sizes of all cataloged items.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.segments.total_bytes() + self.snapshots.total_bytes()
    }
}
