//! Section naming convention shared with the embedding tool.
//!
//! An item of kind `K` with id `N` in directory `D` lives in a section named
//!
//! ```text
//! elfdir/<D>/<hex N><suffix K>
//! ```
//!
//! e.g. `elfdir/idx1/a.seg` holds segment 10 of directory `idx1`.

use crate::error::{StorageError, StorageResult};
use crate::kind::ItemKind;

/// Fixed prefix of every embedded index section.
pub const SECTION_PREFIX: &str = "elfdir/";

/// Returns the section name prefix for the directory `name`.
#[must_use]
pub fn section_prefix_for(name: &str) -> String {
    prefix_with(SECTION_PREFIX, name)
}

pub(crate) fn prefix_with(base: &str, name: &str) -> String {
    format!("{base}{name}/")
}

/// Returns the section name for one item.
#[must_use]
pub fn section_name(dir_name: &str, kind: ItemKind, id: u64) -> String {
    format!("{}{}", section_prefix_for(dir_name), item_file_name(kind, id))
}

/// Returns the item's name relative to its directory, e.g. `a.seg`.
#[must_use]
pub fn item_file_name(kind: ItemKind, id: u64) -> String {
    format!("{id:x}{}", kind.suffix())
}

/// Classifies a name relative to a directory prefix.
///
/// Returns `Ok(None)` for names without a known suffix. A recognized
/// suffix with an unparsable identifier is an error, including names
/// inside nested directories such as `sub/2.seg`.
pub fn parse_item_name(rest: &str) -> StorageResult<Option<(ItemKind, u64)>> {
    let Some((kind, text)) = ItemKind::split_suffix(rest) else {
        return Ok(None);
    };
    let id = parse_hex_id(text).map_err(|source| StorageError::InvalidIdentifier {
        kind,
        text: text.to_string(),
        source,
    })?;
    Ok(Some((kind, id)))
}

/// Parses base-16 digits into a u64.
///
/// Only ASCII hex digits are accepted: no sign, no `0x`.
fn parse_hex_id(text: &str) -> Result<u64, std::num::ParseIntError> {
    if text.bytes().all(|b| b.is_ascii_hexdigit()) {
        u64::from_str_radix(text, 16)
    } else {
        // Forces the standard "invalid digit" error for the offending text.
        u64::from_str_radix("-", 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        assert_eq!(section_prefix_for("idx1"), "elfdir/idx1/");
        assert_eq!(section_name("idx1", ItemKind::Segment, 10), "elfdir/idx1/a.seg");
        assert_eq!(
            section_name("idx1", ItemKind::Snapshot, 0x10),
            "elfdir/idx1/10.snp"
        );
        assert_eq!(
            parse_item_name("a.seg").unwrap(),
            Some((ItemKind::Segment, 10))
        );
    }

    #[test]
    fn accepts_padded_and_uppercase_ids() {
        assert_eq!(
            parse_item_name("00000000000a.seg").unwrap(),
            Some((ItemKind::Segment, 10))
        );
        assert_eq!(
            parse_item_name("FF.snp").unwrap(),
            Some((ItemKind::Snapshot, 255))
        );
        assert_eq!(
            parse_item_name("ffffffffffffffff.seg").unwrap(),
            Some((ItemKind::Segment, u64::MAX))
        );
    }

    #[test]
    fn rejects_bad_identifiers() {
        for bad in [
            "zz.seg",
            ".seg",
            "+1.seg",
            "0x1.snp",
            "10000000000000000.seg",
            "sub/1.seg",
        ] {
            match parse_item_name(bad) {
                Err(StorageError::InvalidIdentifier { text, .. }) => {
                    assert!(bad.starts_with(&text));
                }
                other => panic!("{bad}: expected invalid identifier, got {other:?}"),
            }
        }
    }

    #[test]
    fn skips_foreign_names() {
        assert_eq!(parse_item_name("readme.txt").unwrap(), None);
        assert_eq!(parse_item_name("1.segment").unwrap(), None);
    }
}
