//! Property-based test generators using proptest.
//!
//! Provides strategies for generating directory contents that respect the
//! catalog's rules: unique ids per kind and names without `/`.

use crate::image::ElfImage;
use elfdir_storage::ItemKind;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Items of one directory, keyed by id per kind.
#[derive(Debug, Clone, Default)]
pub struct ItemSet {
    /// Segment payloads by id.
    pub segments: BTreeMap<u64, Vec<u8>>,
    /// Snapshot payloads by id.
    pub snapshots: BTreeMap<u64, Vec<u8>>,
}

impl ItemSet {
    /// Payloads of `kind`.
    pub fn items(&self, kind: ItemKind) -> &BTreeMap<u64, Vec<u8>> {
        match kind {
            ItemKind::Segment => &self.segments,
            ItemKind::Snapshot => &self.snapshots,
        }
    }

    /// Ids of `kind`, largest first.
    pub fn ids_desc(&self, kind: ItemKind) -> Vec<u64> {
        self.items(kind).keys().rev().copied().collect()
    }

    /// Builds an image holding every item under `dir`, each preceded by
    /// `gaps[i % gaps.len()]` padding bytes to vary alignment.
    pub fn to_image(&self, dir: &str, gaps: &[u16]) -> ElfImage {
        let mut image = ElfImage::new();
        let mut end = 64u64;
        let mut index = 0usize;
        for kind in ItemKind::ALL {
            for (&id, payload) in self.items(kind) {
                let gap = gaps
                    .get(index % gaps.len().max(1))
                    .copied()
                    .unwrap_or_default();
                let offset = end + u64::from(gap);
                image = image.item_at(dir, kind, id, payload.clone(), offset);
                end = offset + payload.len() as u64;
                index += 1;
            }
        }
        image
    }
}

/// Strategy for generating item ids across the whole u64 range.
pub fn item_id_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![0u64..64, any::<u64>()]
}

/// Strategy for generating item contents (arbitrary bytes).
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..2048)
}

/// Strategy for generating valid directory names.
pub fn directory_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_.-]{0,15}").expect("Invalid regex")
}

/// Strategy for generating a directory's items.
pub fn item_set_strategy(max_per_kind: usize) -> impl Strategy<Value = ItemSet> {
    let kind_items = || prop::collection::btree_map(item_id_strategy(), payload_strategy(), 0..max_per_kind);
    (kind_items(), kind_items()).prop_map(|(segments, snapshots)| ItemSet {
        segments,
        snapshots,
    })
}

/// Strategy for padding inserted before sections.
pub fn gap_strategy() -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(0u16..5000, 1..8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_item_set_image_places_every_item() {
        let mut runner = TestRunner::default();
        let set = item_set_strategy(4)
            .new_tree(&mut runner)
            .expect("Failed to generate")
            .current();
        let image = set.to_image("d", &[3, 4097]);
        let _ = image.build();
    }

    #[test]
    fn test_ids_desc() {
        let mut set = ItemSet::default();
        set.segments.insert(1, vec![]);
        set.segments.insert(0x10, vec![]);
        set.segments.insert(0xa, vec![]);
        assert_eq!(set.ids_desc(ItemKind::Segment), vec![16, 10, 1]);
        assert!(set.ids_desc(ItemKind::Snapshot).is_empty());
    }
}
