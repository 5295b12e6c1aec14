//! Memory-mapped views of embedded items.
//!
//! Mappings must start on a page boundary but sections start anywhere, so
//! each load maps the window from the page containing the section's first
//! byte and exposes only the section's bytes:
//!
//! ```text
//!  page boundary      section offset
//!  |<---- lead ---->|<------------ size ------------>|
//!  |<----------------- window len ------------------>|
//! ```

use crate::catalog::SectionRange;
use crate::error::{first_error, StorageError, StorageResult};
use memmap2::{Mmap, MmapOptions};
use std::fmt;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;
use std::sync::OnceLock;

/// Page size assumed where the platform cannot be asked.
pub const DEFAULT_PAGE_SIZE: u64 = 4096;

/// Returns the operating system's memory page size.
pub fn page_size() -> u64 {
    static PAGE_SIZE: OnceLock<u64> = OnceLock::new();
    *PAGE_SIZE.get_or_init(query_page_size)
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn query_page_size() -> u64 {
    // SAFETY: sysconf has no preconditions and only reads system configuration.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        DEFAULT_PAGE_SIZE
    }
}

#[cfg(not(unix))]
fn query_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// The page-aligned region mapped for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapWindow {
    /// File offset where the mapping starts; a multiple of the page size.
    pub aligned_offset: u64,
    /// Bytes between the window start and the section's first byte.
    pub lead: usize,
    /// Length of the mapping.
    pub len: usize,
}

impl MapWindow {
    /// Computes the window covering `range` for the given page size.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MalformedBinary`] if the window length does
    /// not fit in a `usize`.
    pub fn covering(range: SectionRange, page_size: u64) -> StorageResult<Self> {
        let lead = range.offset % page_size;
        let len = range
            .size
            .checked_add(lead)
            .and_then(|len| usize::try_from(len).ok())
            .ok_or_else(|| unmappable(range))?;
        Ok(Self {
            aligned_offset: range.offset - lead,
            lead: usize::try_from(lead).map_err(|_| unmappable(range))?,
            len,
        })
    }

    /// Number of section bytes in the window.
    #[must_use]
    pub fn size(&self) -> usize {
        self.len - self.lead
    }
}

fn unmappable(range: SectionRange) -> StorageError {
    StorageError::malformed(format!(
        "section at offset {} with size {} cannot be mapped",
        range.offset, range.size
    ))
}

/// A read-only view of one embedded item.
///
/// Dereferences to exactly the item's bytes. The view owns its file handle
/// and mapping; [`MappedItem::release`] tears both down and reports the
/// outcome, and dropping the view does the same silently.
pub struct MappedItem {
    map: Option<Mmap>,
    file: File,
    lead: usize,
    len: usize,
}

impl MappedItem {
    /// Opens `path` and maps the bytes described by `range`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be opened or mapped,
    /// and [`StorageError::MalformedBinary`] if a non-empty `range` is not
    /// within the file or cannot be mapped on this platform. The file is
    /// closed before any error after opening is returned.
    pub fn open(path: &Path, range: SectionRange) -> StorageResult<Self> {
        let file = File::open(path)?;
        match map_range(&file, range) {
            Ok((map, window)) => Ok(Self {
                map,
                file,
                lead: window.lead,
                len: window.size(),
            }),
            Err(err) => {
                // The mapping error wins over any close failure.
                let _ = close_file(file);
                Err(err)
            }
        }
    }

    /// Number of bytes in the item.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the item holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Item bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.map {
            Some(map) => &map[self.lead..self.lead + self.len],
            None => &[],
        }
    }

    /// Unmaps the window and closes the file.
    ///
    /// The file is closed even if unmapping fails; the unmap failure is the
    /// one reported when both fail. Consuming `self` makes a second release
    /// impossible.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`](crate::StorageError::Io) if closing
    /// the descriptor fails.
    pub fn release(self) -> StorageResult<()> {
        let Self { map, file, .. } = self;
        let unmapped = unmap(map);
        let closed = close_file(file);
        first_error(unmapped, closed)
    }
}

impl Deref for MappedItem {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for MappedItem {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for MappedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedItem")
            .field("mapped", &self.map.is_some())
            .field("lead", &self.lead)
            .field("len", &self.len)
            .finish()
    }
}

fn map_range(file: &File, range: SectionRange) -> StorageResult<(Option<Mmap>, MapWindow)> {
    // Zero-length mappings are rejected by mmap; an empty item needs none.
    if range.size == 0 {
        let window = MapWindow {
            aligned_offset: range.offset,
            lead: 0,
            len: 0,
        };
        return Ok((None, window));
    }

    let file_len = file.metadata()?.len();
    if range.end().map_or(true, |end| end > file_len) {
        return Err(StorageError::malformed(format!(
            "section at offset {} with size {} extends past end of file ({file_len} bytes)",
            range.offset, range.size
        )));
    }
    let window = MapWindow::covering(range, page_size())?;
    Ok((Some(map_window(file, window)?), window))
}

#[allow(unsafe_code)]
fn map_window(file: &File, window: MapWindow) -> std::io::Result<Mmap> {
    // SAFETY: the mapping is read-only and the container binary must not be
    // modified while items are loaded from it.
    unsafe {
        MmapOptions::new()
            .offset(window.aligned_offset)
            .len(window.len)
            .map(file)
    }
}

/// memmap2 unmaps on drop and does not surface munmap failures.
fn unmap(map: Option<Mmap>) -> StorageResult<()> {
    drop(map);
    Ok(())
}

/// Closes `file`, reporting the error `close(2)` returns.
#[cfg(unix)]
#[allow(unsafe_code)]
pub(crate) fn close_file(file: File) -> StorageResult<()> {
    use std::os::unix::io::IntoRawFd;

    let fd = file.into_raw_fd();
    // SAFETY: `fd` was just released from an owned `File`, so it is open and
    // nothing else will close it.
    if unsafe { libc::close(fd) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error().into())
    }
}

#[cfg(not(unix))]
pub(crate) fn close_file(file: File) -> StorageResult<()> {
    drop(file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn window(offset: u64, size: u64, page: u64) -> MapWindow {
        MapWindow::covering(SectionRange { offset, size }, page).unwrap()
    }

    #[test]
    fn window_for_unaligned_offset() {
        assert_eq!(
            window(4097, 10, 4096),
            MapWindow {
                aligned_offset: 4096,
                lead: 1,
                len: 11
            }
        );
    }

    #[test]
    fn window_for_aligned_offset() {
        assert_eq!(
            window(8192, 100, 4096),
            MapWindow {
                aligned_offset: 8192,
                lead: 0,
                len: 100
            }
        );
        assert_eq!(
            window(70000, 5, 65536),
            MapWindow {
                aligned_offset: 65536,
                lead: 4464,
                len: 4469
            }
        );
    }

    #[test]
    fn oversized_window_is_rejected() {
        let range = SectionRange {
            offset: 4097,
            size: u64::MAX,
        };
        assert!(matches!(
            MapWindow::covering(range, 4096),
            Err(StorageError::MalformedBinary(_))
        ));
        assert_eq!(window(4097, 10, 4096).size(), 10);
    }

    #[test]
    fn page_size_is_power_of_two() {
        let size = page_size();
        assert!(size >= 512);
        assert!(size.is_power_of_two());
    }

    fn temp_file(len: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn open_maps_exact_range() {
        let page = page_size() as usize;
        let file = temp_file(page * 3);
        let offset = page + 1;

        let item = MappedItem::open(
            file.path(),
            SectionRange {
                offset: offset as u64,
                size: 300,
            },
        )
        .unwrap();

        let expected: Vec<u8> = (offset..offset + 300).map(|i| (i % 251) as u8).collect();
        assert_eq!(item.len(), 300);
        assert_eq!(&item[..], &expected[..]);
        item.release().unwrap();
    }

    #[test]
    fn empty_range_needs_no_mapping() {
        let file = temp_file(16);
        let item = MappedItem::open(file.path(), SectionRange { offset: 8, size: 0 }).unwrap();
        assert!(item.is_empty());
        assert_eq!(item.as_bytes(), &[] as &[u8]);
        item.release().unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MappedItem::open(
            &dir.path().join("gone"),
            SectionRange { offset: 0, size: 1 },
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn range_past_end_of_file_is_rejected() {
        let file = temp_file(8192);
        for range in [
            SectionRange {
                offset: 4097,
                size: u64::MAX,
            },
            SectionRange {
                offset: 8000,
                size: 193,
            },
        ] {
            let err = MappedItem::open(file.path(), range).unwrap_err();
            assert!(matches!(err, StorageError::MalformedBinary(_)));
        }

        let tail = MappedItem::open(
            file.path(),
            SectionRange {
                offset: 8000,
                size: 192,
            },
        )
        .unwrap();
        assert_eq!(tail.len(), 192);
        tail.release().unwrap();
    }

    #[test]
    fn handles_are_independent() {
        let file = temp_file(1024);
        let range = SectionRange {
            offset: 10,
            size: 20,
        };
        let first = MappedItem::open(file.path(), range).unwrap();
        let second = MappedItem::open(file.path(), range).unwrap();
        let expected = first.to_vec();

        first.release().unwrap();
        assert_eq!(&second[..], &expected[..]);
        second.release().unwrap();
    }
}
