//! Archive input and save file output
//!
//! Input is acquired once: a file is memory-mapped, a buffer is owned. Both
//! are released when the [`ArchiveBytes`] is dropped.

use crate::catalog::IndexEntry;
use crate::error::{GogglesError, Result};
use memmap2::Mmap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The full container contents
pub enum ArchiveBytes {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl ArchiveBytes {
    /// Map a container file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;

        // Mapping a zero-length file fails on some platforms
        if file.metadata()?.len() == 0 {
            return Ok(ArchiveBytes::Owned(Vec::new()));
        }

        // SAFETY: the map is read-only and lives no longer than this value.
        // Concurrent truncation by another process is outside our control,
        // as with any mmap-based reader.
        let mmap = unsafe { Mmap::map(&file)? };
        debug!("Mapped {:?} ({} bytes)", path.as_ref(), mmap.len());
        Ok(ArchiveBytes::Mapped(mmap))
    }

    /// Slice out a save file's payload
    ///
    /// # Errors
    ///
    /// `OutOfRange` if `offset + size` runs past the end of the container.
    pub fn payload(&self, entry: &IndexEntry) -> Result<&[u8]> {
        payload(self, entry)
    }
}

impl From<Vec<u8>> for ArchiveBytes {
    fn from(bytes: Vec<u8>) -> Self {
        ArchiveBytes::Owned(bytes)
    }
}

impl Deref for ArchiveBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            ArchiveBytes::Mapped(mmap) => &mmap[..],
            ArchiveBytes::Owned(bytes) => bytes.as_slice(),
        }
    }
}

impl AsRef<[u8]> for ArchiveBytes {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl std::fmt::Debug for ArchiveBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ArchiveBytes::Mapped(_) => "Mapped",
            ArchiveBytes::Owned(_) => "Owned",
        };
        write!(f, "ArchiveBytes::{}({} bytes)", kind, self.len())
    }
}

/// Slice `entry`'s payload out of `data`
pub fn payload<'a>(data: &'a [u8], entry: &IndexEntry) -> Result<&'a [u8]> {
    let out_of_range = || GogglesError::OutOfRange {
        offset: entry.offset.saturating_add(entry.size),
        len: data.len(),
    };

    let range = entry.range().ok_or_else(out_of_range)?;
    data.get(range).ok_or_else(out_of_range)
}

/// Write a save file's payload to `outpath/<name>`
///
/// Creates `outpath` if needed and overwrites an existing file. Returns the
/// path written.
pub fn extract_entry<P: AsRef<Path>>(data: &[u8], entry: &IndexEntry, outpath: P) -> Result<PathBuf> {
    let bytes = payload(data, entry)?;

    let outpath = outpath.as_ref();
    fs::create_dir_all(outpath)?;
    let target = outpath.join(&entry.name);

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&target)?;
    file.write_all(bytes)?;
    file.flush()?;

    debug!("Wrote {} bytes to {:?}", bytes.len(), target);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(name: &str, offset: u64, size: u64) -> IndexEntry {
        IndexEntry {
            file_index: 0,
            name: name.to_string(),
            offset,
            size,
        }
    }

    #[test]
    fn test_payload_bounds() {
        let data: Vec<u8> = (0..32).collect();

        assert_eq!(payload(&data, &entry("a", 4, 3)).unwrap(), &[4, 5, 6]);
        assert_eq!(payload(&data, &entry("a", 32, 0)).unwrap(), &[] as &[u8]);
        assert!(matches!(
            payload(&data, &entry("a", 30, 3)),
            Err(GogglesError::OutOfRange { offset: 33, len: 32 })
        ));
        assert!(payload(&data, &entry("a", u64::MAX, 2)).is_err());
    }

    #[test]
    fn test_extract_creates_outpath() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("nested").join("dir");
        let data = b"headerPAYLOADtrailer".to_vec();

        let written = extract_entry(&data, &entry("SAVE1.DAT", 6, 7), &out).unwrap();
        assert_eq!(written, out.join("SAVE1.DAT"));
        assert_eq!(fs::read(&written).unwrap(), b"PAYLOAD");
    }

    #[test]
    fn test_extract_overwrites() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("x"), b"old contents that are longer").unwrap();

        extract_entry(b"new", &entry("x", 0, 3), temp.path()).unwrap();
        assert_eq!(fs::read(temp.path().join("x")).unwrap(), b"new");
    }

    #[test]
    fn test_open_mapped_and_empty() {
        let temp = TempDir::new().unwrap();
        let full = temp.path().join("full.bin");
        let empty = temp.path().join("empty.bin");
        fs::write(&full, [1u8, 2, 3]).unwrap();
        fs::write(&empty, b"").unwrap();

        let mapped = ArchiveBytes::open(&full).unwrap();
        assert!(matches!(mapped, ArchiveBytes::Mapped(_)));
        assert_eq!(&mapped[..], &[1, 2, 3]);

        let owned = ArchiveBytes::open(&empty).unwrap();
        assert!(owned.is_empty());

        assert!(matches!(
            ArchiveBytes::open(temp.path().join("missing")),
            Err(GogglesError::Io(_))
        ));
    }
}
