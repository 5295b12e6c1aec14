//! Dump command implementation.

use elfdir_storage::{Directory, ElfDirectory, ItemKind};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Parses an id given as decimal or `0x`-prefixed hex.
pub fn parse_id(text: &str) -> Result<u64, Box<dyn std::error::Error>> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid id '{}': {}", text, e).into())
}

/// Loads one item and writes its bytes to `output`.
pub fn write_item(
    binary: &Path,
    name: &str,
    kind: ItemKind,
    id: u64,
    output: &mut dyn Write,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut dir = ElfDirectory::new(binary, name);
    dir.setup(true)?;

    let item = dir.load(kind, id)?;
    let written = output.write_all(&item).map(|()| item.len());
    // Release before reporting a write failure.
    item.release()?;
    Ok(written?)
}

/// Runs the dump command.
pub fn run(
    binary: &Path,
    name: &str,
    kind: &str,
    id: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind: ItemKind = kind.parse()?;
    let id = parse_id(id)?;

    match output {
        Some(path) => {
            let mut file = fs::File::create(path)?;
            let len = write_item(binary, name, kind, id, &mut file)?;
            file.sync_all()?;
            info!("Wrote {} {} ({} bytes) to {:?}", kind, id, len, path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_item(binary, name, kind, id, &mut lock)?;
            lock.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use elfdir_testkit::{ElfImage, TempElf};

    #[test]
    fn ids_in_decimal_and_hex() {
        assert_eq!(parse_id("10").unwrap(), 10);
        assert_eq!(parse_id("0xa").unwrap(), 10);
        assert_eq!(parse_id("0X10").unwrap(), 16);
        assert!(parse_id("a").is_err());
        assert!(parse_id("").is_err());
    }

    #[test]
    fn writes_item_bytes() {
        let image = ElfImage::new().item("idx", ItemKind::Snapshot, 0x2a, b"epoch 42".to_vec());
        let elf = TempElf::new(&image);

        let mut out = Vec::new();
        let len = write_item(elf.path(), "idx", ItemKind::Snapshot, 42, &mut out).unwrap();
        assert_eq!(len, 8);
        assert_eq!(out, b"epoch 42");
    }

    #[test]
    fn dump_to_file() {
        let image = ElfImage::new().item("idx", ItemKind::Segment, 1, vec![5u8; 10_000]);
        let elf = TempElf::new(&image);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("1.seg");

        run(elf.path(), "idx", "segment", "1", Some(&target)).unwrap();
        assert_eq!(fs::read(&target).unwrap(), vec![5u8; 10_000]);
    }

    #[test]
    fn unknown_kind_and_missing_item() {
        let elf = TempElf::new(&ElfImage::new());
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");

        let err = run(elf.path(), "idx", "manifest", "1", Some(&target)).unwrap_err();
        assert!(err.to_string().contains("unknown item kind"));

        let err = run(elf.path(), "idx", "snapshot", "1", Some(&target)).unwrap_err();
        assert!(err.to_string().contains("no such snapshot with id 1"));
    }
}
