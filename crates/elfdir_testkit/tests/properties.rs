//! Property tests: whatever is embedded is listed and loaded faithfully.

use elfdir_storage::{Directory, ItemKind};
use elfdir_testkit::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn embedded_items_list_and_load(
        name in directory_name_strategy(),
        items in item_set_strategy(12),
        gaps in gap_strategy(),
    ) {
        let elf = TempElf::new(&items.to_image(&name, &gaps));
        let dir = elf.open_directory(&name);

        for kind in ItemKind::ALL {
            let listed = dir.list(kind).unwrap();
            prop_assert_eq!(&listed, &items.ids_desc(kind));
            prop_assert!(listed.windows(2).all(|pair| pair[0] > pair[1]));

            for (&id, payload) in items.items(kind) {
                let item = dir.load(kind, id).unwrap();
                prop_assert_eq!(&item[..], &payload[..]);
                item.release().unwrap();
            }
        }

        let stats = dir.stats();
        let expected_items = items.segments.len() + items.snapshots.len();
        prop_assert_eq!(stats.items, expected_items as u64);
    }

    #[test]
    fn absent_ids_are_not_found(
        items in item_set_strategy(6),
        absent in item_id_strategy(),
    ) {
        let elf = TempElf::new(&items.to_image("idx", &[1]));
        let dir = elf.open_directory("idx");

        for kind in ItemKind::ALL {
            if !items.items(kind).contains_key(&absent) {
                prop_assert!(dir.load(kind, absent).unwrap_err().is_not_found());
            }
        }
    }
}
