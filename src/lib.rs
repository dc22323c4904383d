//! # savegame-goggles - Savegame Container Decoder
//!
//! Decodes console savegame containers: a 256-byte authentication header,
//! a chain of tagged headers (`DISF`, `DPFS`, `IVFC`, `JNGL`, `SAVE`, two
//! `RMAP`), and a small file table naming each save file's payload.
//!
//! - **Fail-fast validation**: every header tag is checked in order before any
//!   offset it carries is trusted
//! - **Name index**: save files by name, in file table order
//! - **Wildcards**: `*` and `?` selection over the index
//! - **Zero-copy reads**: containers are memory-mapped; payloads are slices
//!
//! The authentication tag and the hash tree are decoded but never verified,
//! and containers are never written back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use savegame_goggles::{Result, Savegame};
//!
//! # fn main() -> Result<()> {
//! let save = Savegame::open("savegame.bin")?;
//!
//! for entry in save.select("*.DAT") {
//!     println!("{} ({} bytes at {:#x})", entry.name, entry.size, entry.offset);
//! }
//!
//! save.extract("SAVE1.DAT", "out")?;
//! # Ok(())
//! # }
//! ```

pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use self::core::{
    catalog, config, container, cursor, error, header, io, pattern, validation,
};

pub use crate::core::{
    catalog::{FileEntry, FileIndex, FileOffset, FileTable, IndexEntry, Matches, SkippedEntry},
    config::DecodeOptions,
    container::Container,
    cursor::ByteCursor,
    error::{GogglesError, Result},
    header::{DuplexCopy, Layer, Magic, Record, Tagged, HEADER_CHAIN_SIZE},
    io::ArchiveBytes,
    pattern::PatternMatcher,
};

use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A decoded savegame container
///
/// Owns the container bytes together with the validated header chain and the
/// file index built from them. Nothing is cached across instances; decoding
/// the same bytes again yields an equal, independent value.
#[derive(Debug)]
pub struct Savegame {
    bytes: ArchiveBytes,
    container: Container,
    index: FileIndex,
    options: DecodeOptions,
}

impl Savegame {
    /// Open and decode a container file with default options
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use savegame_goggles::Savegame;
    ///
    /// let save = Savegame::open("savegame.bin")?;
    /// println!("{} save files", save.index().len());
    /// # Ok::<(), savegame_goggles::GogglesError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, DecodeOptions::default())
    }

    /// Open and decode a container file
    pub fn open_with<P: AsRef<Path>>(path: P, options: DecodeOptions) -> Result<Self> {
        info!("Opening savegame at {:?}", path.as_ref());
        let bytes = ArchiveBytes::open(path)?;
        Self::decode(bytes, options)
    }

    /// Decode a container held in memory with default options
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with(bytes, DecodeOptions::default())
    }

    /// Decode a container held in memory
    pub fn from_bytes_with(bytes: Vec<u8>, options: DecodeOptions) -> Result<Self> {
        Self::decode(ArchiveBytes::from(bytes), options)
    }

    fn decode(bytes: ArchiveBytes, options: DecodeOptions) -> Result<Self> {
        let container = Container::decode(&bytes)?;
        let index = FileIndex::read(&bytes, &container, &options)?;

        info!(
            "Decoded savegame: {} save files, {} skipped",
            index.len(),
            index.skipped().len()
        );

        Ok(Savegame {
            bytes,
            container,
            index,
            options,
        })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Raw container bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// All save files in file table order
    pub fn list(&self) -> std::slice::Iter<'_, IndexEntry> {
        self.index.iter()
    }

    /// Save files matching a wildcard pattern, lazily
    pub fn select<'p>(&self, pattern: &'p str) -> Matches<'_, 'p> {
        debug!("Selecting save files matching '{}'", pattern);
        self.index.matching(pattern)
    }

    /// Look up a save file by exact name
    ///
    /// # Errors
    ///
    /// `NotFound` if no save file has that name.
    pub fn find(&self, name: &str) -> Result<&IndexEntry> {
        self.index
            .get(name)
            .ok_or_else(|| GogglesError::NotFound(name.to_string()))
    }

    /// Collect the matches for a pattern, reporting a literal name that
    /// matches nothing as `NotFound`
    ///
    /// A wildcard pattern with no matches yields an empty list, and so does
    /// the empty pattern, since no save file has an empty name.
    pub fn resolve(&self, pattern: &str) -> Result<Vec<&IndexEntry>> {
        let selected: Vec<_> = self.select(pattern).collect();
        let literal = !pattern.is_empty() && !PatternMatcher::has_wildcards(pattern);
        if selected.is_empty() && literal {
            return Err(GogglesError::NotFound(pattern.to_string()));
        }
        Ok(selected)
    }

    /// Payload bytes of a save file
    pub fn read_entry(&self, entry: &IndexEntry) -> Result<&[u8]> {
        self.bytes.payload(entry)
    }

    /// Payload bytes of a save file by exact name
    pub fn read(&self, name: &str) -> Result<&[u8]> {
        self.read_entry(self.find(name)?)
    }

    /// Write every save file matching `pattern` to `outpath/<name>`
    ///
    /// Returns the paths written, in file table order.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use savegame_goggles::Savegame;
    /// # let save = Savegame::open("savegame.bin")?;
    /// let written = save.extract("*", ".")?;
    /// println!("Extracted {} files", written.len());
    /// # Ok::<(), savegame_goggles::GogglesError>(())
    /// ```
    pub fn extract<P: AsRef<Path>>(&self, pattern: &str, outpath: P) -> Result<Vec<PathBuf>> {
        let outpath = outpath.as_ref();
        self.resolve(pattern)?
            .into_iter()
            .map(|entry| {
                info!("Extracting {} ({} bytes)", entry.name, entry.size);
                io::extract_entry(&self.bytes, entry, outpath)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_decode_products_are_thread_safe() {
        assert_send_sync::<Container>();
        assert_send_sync::<FileIndex>();
        assert_send_sync::<Savegame>();
    }

    #[test]
    fn test_short_buffer() {
        assert!(matches!(
            Savegame::from_bytes(vec![0u8; 100]),
            Err(GogglesError::TruncatedInput { offset: 0, needed: 256, available: 100 })
        ));
    }
}
