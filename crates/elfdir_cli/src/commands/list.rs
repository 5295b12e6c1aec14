//! List command implementation.

use elfdir_storage::{Directory, ElfDirectory, ItemKind};
use serde::Serialize;
use std::path::Path;

/// Items embedded for one directory.
#[derive(Debug, Serialize)]
pub struct ListResult {
    /// Binary path.
    pub binary: String,
    /// Directory name.
    pub directory: String,
    /// Section name prefix searched.
    pub prefix: String,
    /// Segments, newest first.
    pub segments: Vec<ItemInfo>,
    /// Snapshots, newest first.
    pub snapshots: Vec<ItemInfo>,
    /// Number of items across kinds.
    pub total_items: u64,
    /// Size of all items in bytes.
    pub total_bytes: u64,
}

/// One embedded item.
#[derive(Debug, Serialize)]
pub struct ItemInfo {
    /// Numeric id.
    pub id: u64,
    /// Offset of the item within the binary.
    pub offset: u64,
    /// Size in bytes.
    pub size: u64,
}

/// Opens the directory and collects its items.
pub fn collect(binary: &Path, name: &str) -> Result<ListResult, Box<dyn std::error::Error>> {
    let mut dir = ElfDirectory::new(binary, name);
    dir.setup(true)?;

    let stats = dir.stats();
    Ok(ListResult {
        binary: binary.display().to_string(),
        directory: name.to_string(),
        prefix: dir.section_prefix().to_string(),
        segments: items(&dir, ItemKind::Segment)?,
        snapshots: items(&dir, ItemKind::Snapshot)?,
        total_items: stats.items,
        total_bytes: stats.bytes,
    })
}

fn items(dir: &ElfDirectory, kind: ItemKind) -> Result<Vec<ItemInfo>, Box<dyn std::error::Error>> {
    let mut items = Vec::new();
    for id in dir.list(kind)? {
        let range = dir
            .catalog()
            .get(kind, id)
            .ok_or_else(|| format!("{kind} {id} listed but not cataloged"))?;
        items.push(ItemInfo {
            id,
            offset: range.offset,
            size: range.size,
        });
    }
    Ok(items)
}

/// Runs the list command.
pub fn run(binary: &Path, name: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = collect(binary, name)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &ListResult) {
    println!("Embedded Index Directory");
    println!("========================");
    println!();
    println!("Binary:    {}", result.binary);
    println!("Directory: {} ({}*)", result.directory, result.prefix);
    println!();
    print_items("Segments", &result.segments);
    println!();
    print_items("Snapshots", &result.snapshots);
    println!();
    println!(
        "Total: {} items, {}",
        result.total_items,
        format_size(result.total_bytes)
    );
}

fn print_items(title: &str, items: &[ItemInfo]) {
    println!("{} ({}):", title, items.len());
    for item in items {
        println!(
            "  {:>16x}  {:>10}  at offset {}",
            item.id,
            format_size(item.size),
            item.offset
        );
    }
}

pub(crate) fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elfdir_testkit::{scenarios, TempElf};

    #[test]
    fn collect_reports_items_newest_first() {
        let elf = TempElf::new(&scenarios::mixed_items("idx", 3, 2));
        let result = collect(elf.path(), "idx").unwrap();

        let ids: Vec<_> = result.segments.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(result.snapshots.len(), 2);
        assert_eq!(result.total_items, 5);
        assert_eq!(result.prefix, "elfdir/idx/");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["segments"][0]["id"], 3);
    }

    #[test]
    fn collect_fails_on_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect(&dir.path().join("missing"), "idx").is_err());
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
