//! ELF section header table reader.
//!
//! Parsing is done by the `object` crate; this module keeps only what the
//! catalog needs from each section: its raw name bytes, type, flags, file
//! offset and size. Both ELF classes, both byte orders and extended section
//! numbering (`e_shnum == 0`, `e_shstrndx == SHN_XINDEX`) are handled by
//! `object`.

use crate::error::{StorageError, StorageResult};
use object::elf::{FileHeader32, FileHeader64};
use object::read::elf::{FileHeader, SectionHeader as _};
use object::{Endianness, FileKind, ReadCache, ReadRef};
use std::borrow::Cow;
use std::io::{Read, Seek, SeekFrom};

pub use object::elf::SHT_NOBITS;

/// Byte order of multi-byte fields.
pub use object::Endianness as Endian;

/// ELF file class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    /// 32-bit objects.
    Elf32,
    /// 64-bit objects.
    Elf64,
}

/// One entry of the section header table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    /// Section name bytes from the section name string table.
    pub name: Vec<u8>,
    /// `sh_type`.
    pub kind: u32,
    /// `sh_flags`.
    pub flags: u64,
    /// `sh_offset`: byte offset of the section within the file.
    pub offset: u64,
    /// `sh_size`: size of the section in memory.
    pub size: u64,
}

impl SectionHeader {
    /// Number of bytes the section occupies in the file.
    ///
    /// `SHT_NOBITS` sections have a memory size but no file bytes.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        if self.kind == SHT_NOBITS {
            0
        } else {
            self.size
        }
    }

    /// Name for display; invalid UTF-8 is replaced.
    #[must_use]
    pub fn display_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

/// The section header table of one ELF file.
#[derive(Debug, Clone)]
pub struct SectionTable {
    /// Class of the file.
    pub class: ElfClass,
    /// Byte order of the file.
    pub endian: Endian,
    /// Total length of the file in bytes.
    pub file_len: u64,
    /// Sections in table order, including the null section 0.
    pub sections: Vec<SectionHeader>,
}

impl SectionTable {
    /// Reads the section header table from `reader`.
    ///
    /// Only the ELF header, the section headers and the section name table
    /// are read; section contents are not.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MalformedBinary`] if the file is not ELF or
    /// its section table cannot be decoded, and [`StorageError::Io`] if the
    /// file length cannot be determined.
    pub fn read<R: Read + Seek>(reader: &mut R) -> StorageResult<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        let cache = ReadCache::new(reader);
        let data = &cache;

        match FileKind::parse(data) {
            Ok(FileKind::Elf32) => {
                read_sections::<FileHeader32<Endianness>, _>(data, ElfClass::Elf32, file_len)
            }
            Ok(FileKind::Elf64) => {
                read_sections::<FileHeader64<Endianness>, _>(data, ElfClass::Elf64, file_len)
            }
            Ok(other) => Err(StorageError::malformed(format!("not an ELF file ({other:?})"))),
            Err(err) => Err(StorageError::malformed(format!("not an ELF file: {err}"))),
        }
    }

    /// Iterates over sections whose name starts with `prefix`.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a SectionHeader> + 'a {
        self.sections
            .iter()
            .filter(move |section| section.name.starts_with(prefix.as_bytes()))
    }
}

fn read_sections<'data, Elf, R>(data: R, class: ElfClass, file_len: u64) -> StorageResult<SectionTable>
where
    Elf: FileHeader<Endian = Endianness>,
    R: ReadRef<'data>,
{
    let header = Elf::parse(data).map_err(malformed)?;
    let endian = header.endian().map_err(malformed)?;
    let table = header.sections(endian, data).map_err(malformed)?;

    let sections = table
        .iter()
        .map(|section| {
            let name = table.section_name(endian, section).map_err(malformed)?;
            Ok(SectionHeader {
                name: name.to_vec(),
                kind: section.sh_type(endian),
                flags: section.sh_flags(endian).into(),
                offset: section.sh_offset(endian).into(),
                size: section.sh_size(endian).into(),
            })
        })
        .collect::<StorageResult<Vec<_>>>()?;

    Ok(SectionTable {
        class,
        endian,
        file_len,
        sections,
    })
}

fn malformed(err: object::read::Error) -> StorageError {
    StorageError::malformed(err.to_string())
}
