//! Sections command implementation.

use super::list::format_size;
use elfdir_storage::elf::{SectionTable, SHT_NOBITS};
use elfdir_storage::SECTION_PREFIX;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One row of the section table.
#[derive(Debug, Serialize)]
pub struct SectionInfo {
    /// Index in the section header table.
    pub index: usize,
    /// Section name, with invalid UTF-8 replaced.
    pub name: String,
    /// `sh_type`.
    pub kind: u32,
    /// File offset.
    pub offset: u64,
    /// Size in bytes.
    pub size: u64,
    /// Whether the name falls under the index section prefix.
    pub embedded: bool,
}

/// Reads the section table of `binary`.
pub fn collect(binary: &Path) -> Result<Vec<SectionInfo>, Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(File::open(binary)?);
    let table = SectionTable::read(&mut reader)?;

    Ok(table
        .sections
        .into_iter()
        .enumerate()
        .map(|(index, section)| SectionInfo {
            index,
            name: section.display_name().into_owned(),
            embedded: section.name.starts_with(SECTION_PREFIX.as_bytes()),
            kind: section.kind,
            offset: section.offset,
            size: section.size,
        })
        .collect())
}

/// Runs the sections command.
pub fn run(binary: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let sections = collect(binary)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&sections)?);
        }
        _ => {
            println!("{:>4}  {:<40} {:>6} {:>12}  size", "idx", "name", "type", "offset");
            for section in &sections {
                let marker = if section.embedded { "*" } else { " " };
                let kind = if section.kind == SHT_NOBITS {
                    "nobits".to_string()
                } else {
                    section.kind.to_string()
                };
                println!(
                    "{:>4}{} {:<40} {:>6} {:>12}  {}",
                    section.index,
                    marker,
                    section.name,
                    kind,
                    section.offset,
                    format_size(section.size)
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use elfdir_storage::ItemKind;
    use elfdir_testkit::{ElfImage, TempElf};

    #[test]
    fn marks_embedded_sections() {
        let image = ElfImage::new()
            .section(".text", vec![0; 8])
            .item("idx", ItemKind::Segment, 1, b"x".to_vec());
        let elf = TempElf::new(&image);

        let sections = collect(elf.path()).unwrap();
        let names: Vec<_> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["", ".text", "elfdir/idx/1.seg", ".shstrtab"]);
        assert!(!sections[1].embedded);
        assert!(sections[2].embedded);
    }
}
