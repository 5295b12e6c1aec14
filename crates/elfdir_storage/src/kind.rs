//! Item kinds stored in a directory.

use crate::error::StorageError;
use std::fmt;
use std::str::FromStr;

/// File name suffix of segment items.
pub const SEGMENT_SUFFIX: &str = ".seg";

/// File name suffix of snapshot items.
pub const SNAPSHOT_SUFFIX: &str = ".snp";

/// The two kinds of immutable items an index directory holds.
///
/// Segments are identified by sequence number, snapshots by epoch. Both
/// are stored under names ending in a kind-specific suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKind {
    /// An immutable chunk of indexed data.
    Segment,
    /// A manifest of the segments active at one epoch.
    Snapshot,
}

impl ItemKind {
    /// All kinds, in catalog order.
    pub const ALL: [ItemKind; 2] = [ItemKind::Segment, ItemKind::Snapshot];

    /// Name suffix shared with the embedding tool, e.g. `.seg`.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Segment => SEGMENT_SUFFIX,
            Self::Snapshot => SNAPSHOT_SUFFIX,
        }
    }

    /// Human readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::Snapshot => "snapshot",
        }
    }

    /// Splits `name` into the kind named by its suffix and the text before it.
    #[must_use]
    pub fn split_suffix(name: &str) -> Option<(Self, &str)> {
        Self::ALL
            .into_iter()
            .find_map(|kind| name.strip_suffix(kind.suffix()).map(|stem| (kind, stem)))
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = StorageError;

    /// Accepts the kind name (`segment`), its short form (`seg`) or the
    /// suffix itself (`.seg`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "segment" | "seg" | ".seg" => Ok(Self::Segment),
            "snapshot" | "snp" | ".snp" => Ok(Self::Snapshot),
            _ => Err(StorageError::UnknownKind(s.to_string())),
        }
    }
}
