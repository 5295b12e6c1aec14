//! Builder for small ELF images with chosen sections.
//!
//! The images are not runnable programs: they carry an ELF header, the
//! requested section contents, a section name string table and the section
//! header table, which is all the directory reads. Encoding is done by
//! `object`'s ELF writer, which also switches to extended section numbering
//! once the section count reaches `SHN_LORESERVE`.
//!
//! ```text
//! [ELF header][section data ...][.shstrtab][section headers]
//! ```

use elfdir_storage::elf::{ElfClass, Endian, SHT_NOBITS};
use elfdir_storage::{section_name, ItemKind};
use object::elf::{EM_386, EM_X86_64, ELFOSABI_NONE, ET_EXEC, SHT_PROGBITS};
use object::write::elf::{FileHeader, SectionHeader, Writer};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
enum Placement {
    Next,
    At(u64),
}

#[derive(Debug, Clone)]
struct ImageSection {
    name: String,
    kind: u32,
    data: Vec<u8>,
    nobits_size: u64,
    placement: Placement,
}

/// A description of an ELF file, turned into bytes by [`ElfImage::build`].
///
/// # Example
///
/// ```rust
/// use elfdir_testkit::ElfImage;
/// use elfdir_storage::ItemKind;
///
/// let bytes = ElfImage::new()
///     .section(".text", vec![0x90; 16])
///     .item_at("idx1", ItemKind::Segment, 1, b"payload", 4097)
///     .build();
/// assert_eq!(&bytes[4097..4104], b"payload");
/// ```
#[derive(Debug, Clone)]
pub struct ElfImage {
    class: ElfClass,
    endian: Endian,
    sections: Vec<ImageSection>,
}

impl Default for ElfImage {
    fn default() -> Self {
        Self::new()
    }
}

impl ElfImage {
    /// Creates an empty 64-bit little endian image.
    #[must_use]
    pub fn new() -> Self {
        Self {
            class: ElfClass::Elf64,
            endian: Endian::Little,
            sections: Vec::new(),
        }
    }

    /// Sets the ELF class.
    #[must_use]
    pub fn class(mut self, class: ElfClass) -> Self {
        self.class = class;
        self
    }

    /// Sets the byte order.
    #[must_use]
    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Appends a section placed right after the previous one.
    #[must_use]
    pub fn section(self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.push(name, SHT_PROGBITS, data.into(), 0, Placement::Next)
    }

    /// Appends a section at an exact file offset.
    ///
    /// The offset must not overlap data placed before it.
    #[must_use]
    pub fn section_at(self, name: &str, data: impl Into<Vec<u8>>, offset: u64) -> Self {
        self.push(name, SHT_PROGBITS, data.into(), 0, Placement::At(offset))
    }

    /// Appends a `SHT_NOBITS` section of `size` bytes with no file contents.
    #[must_use]
    pub fn nobits(self, name: &str, size: u64) -> Self {
        self.push(name, SHT_NOBITS, Vec::new(), size, Placement::Next)
    }

    /// Appends an index item under directory `dir`.
    #[must_use]
    pub fn item(self, dir: &str, kind: ItemKind, id: u64, data: impl Into<Vec<u8>>) -> Self {
        let name = section_name(dir, kind, id);
        self.section(&name, data)
    }

    /// Appends an index item at an exact file offset.
    #[must_use]
    pub fn item_at(
        self,
        dir: &str,
        kind: ItemKind,
        id: u64,
        data: impl Into<Vec<u8>>,
        offset: u64,
    ) -> Self {
        let name = section_name(dir, kind, id);
        self.section_at(&name, data, offset)
    }

    fn push(
        mut self,
        name: &str,
        kind: u32,
        data: Vec<u8>,
        nobits_size: u64,
        placement: Placement,
    ) -> Self {
        self.sections.push(ImageSection {
            name: name.to_string(),
            kind,
            data,
            nobits_size,
            placement,
        });
        self
    }

    /// Number of sections in the encoded image, counting the null section
    /// and `.shstrtab`.
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len() + 2
    }

    /// Encodes the image.
    ///
    /// # Panics
    ///
    /// Panics if a section placed with [`section_at`](Self::section_at)
    /// overlaps earlier data.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut writer = Writer::new(self.endian, self.class == ElfClass::Elf64, &mut out);

        writer.reserve_file_header();
        writer.reserve_null_section_index();
        let names: Vec<_> = self
            .sections
            .iter()
            .map(|section| {
                let name = writer.add_section_name(section.name.as_bytes());
                writer.reserve_section_index();
                name
            })
            .collect();
        writer.reserve_shstrtab_section_index();

        let mut offsets = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            if section.kind == SHT_NOBITS {
                offsets.push(writer.reserved_len());
                continue;
            }
            if let Placement::At(offset) = section.placement {
                let offset = offset as usize;
                assert!(
                    offset >= writer.reserved_len(),
                    "section '{}' at offset {offset} overlaps data ending at {}",
                    section.name,
                    writer.reserved_len()
                );
                writer.reserve_until(offset);
            }
            offsets.push(writer.reserve(section.data.len(), 1));
        }
        writer.reserve_shstrtab();
        writer.reserve_section_headers();

        let e_machine = match self.class {
            ElfClass::Elf32 => EM_386,
            ElfClass::Elf64 => EM_X86_64,
        };
        writer
            .write_file_header(&FileHeader {
                os_abi: ELFOSABI_NONE,
                abi_version: 0,
                e_type: ET_EXEC,
                e_machine,
                e_entry: 0,
                e_flags: 0,
            })
            .expect("Failed to write ELF header");

        for (section, &offset) in self.sections.iter().zip(&offsets) {
            if section.kind != SHT_NOBITS {
                writer.pad_until(offset);
                writer.write(&section.data);
            }
        }
        writer.write_shstrtab();

        writer.write_null_section_header();
        for ((section, &offset), &name) in self.sections.iter().zip(&offsets).zip(&names) {
            let size = if section.kind == SHT_NOBITS {
                section.nobits_size
            } else {
                section.data.len() as u64
            };
            writer.write_section_header(&SectionHeader {
                name: Some(name),
                sh_type: section.kind,
                sh_flags: 0,
                sh_addr: 0,
                sh_offset: offset as u64,
                sh_size: size,
                sh_link: 0,
                sh_info: 0,
                sh_addralign: 1,
                sh_entsize: 0,
            });
        }
        writer.write_shstrtab_section_header();
        out
    }

    /// Encodes the image and writes it to `path`.
    ///
    /// # Errors
    ///
    /// Returns any error from writing the file.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.build())
    }
}
