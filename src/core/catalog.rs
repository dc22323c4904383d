//! File table: offset table, entry table and the name index built from them
//!
//! The file table sits at the save partition offset and is laid out as two
//! parallel arrays, both `AllocationHeader::number` long:
//!
//! ```text
//! [FileOffset; number]   8 bytes each   (offset u32, unknown u32)
//! [FileEntry;  number]  96 bytes each
//! ```
//!
//! Entries form a tree through `parent_index`. An entry that some *other*
//! entry names as its parent is a directory and its `size_or_count` is a
//! child count; every other entry is a save file whose payload lives at
//! `offsets[file_offset_index]` for `size_or_count` bytes.
//!
//! `file_index` is the entry's own slot, so 0 is an ordinary index. Root-level
//! entries name themselves (or an index outside the table) as parent. A
//! parent whose real child count differs from its `size_or_count` is reported
//! as `ChildCountMismatch` instead of being dropped silently.

use crate::config::DecodeOptions;
use crate::container::Container;
use crate::cursor::ByteCursor;
use crate::error::{GogglesError, Result};
use crate::header::Record;
use crate::pattern::PatternMatcher;
use crate::validation::{decode_filename, trim_padding, FILENAME_LEN};
use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use tracing::{debug, warn};

/// One slot of the offset table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileOffset {
    /// Absolute byte offset of the payload within the container
    pub offset: u32,
    pub unknown: u32,
}

impl Record for FileOffset {
    const SIZE: usize = 8;

    fn read_fields(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(FileOffset {
            offset: cursor.read_u32()?,
            unknown: cursor.read_u32()?,
        })
    }

    fn write_fields(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.offset.to_le_bytes());
        out.extend_from_slice(&self.unknown.to_le_bytes());
    }
}

/// One node of the entry table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// `file_index` of the containing directory; an entry pointing at itself
    /// or at an index not in the table hangs off the root. 0 is a real slot,
    /// not a root marker.
    pub parent_index: u32,
    #[serde(skip)]
    pub filename: [u8; FILENAME_LEN],
    pub file_index: u32,
    pub file_offset_index: u32,
    /// Byte length for a file, child count for a directory
    pub size_or_count: u64,
    pub unknown: u64,
    /// Next sibling under the same parent
    pub next_file_index: u32,
}

impl FileEntry {
    /// Filename field with its padding removed (not validated)
    pub fn raw_name(&self) -> &[u8] {
        trim_padding(&self.filename)
    }
}

impl Record for FileEntry {
    const SIZE: usize = 96;

    fn read_fields(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(FileEntry {
            parent_index: cursor.read_u32()?,
            filename: cursor.read_array()?,
            file_index: cursor.read_u32()?,
            file_offset_index: cursor.read_u32()?,
            size_or_count: cursor.read_u64()?,
            unknown: cursor.read_u64()?,
            next_file_index: cursor.read_u32()?,
        })
    }

    fn write_fields(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.parent_index.to_le_bytes());
        out.extend_from_slice(&self.filename);
        out.extend_from_slice(&self.file_index.to_le_bytes());
        out.extend_from_slice(&self.file_offset_index.to_le_bytes());
        out.extend_from_slice(&self.size_or_count.to_le_bytes());
        out.extend_from_slice(&self.unknown.to_le_bytes());
        out.extend_from_slice(&self.next_file_index.to_le_bytes());
    }
}

/// The raw offset and entry tables
#[derive(Debug, Clone, Serialize)]
pub struct FileTable {
    offsets: Vec<FileOffset>,
    entries: Vec<FileEntry>,
    /// `file_index` values referenced as a parent by some other entry
    #[serde(skip)]
    parents: AHashSet<u32>,
}

impl FileTable {
    /// Read both tables for the duplex copy chosen in `options`
    ///
    /// # Errors
    ///
    /// `OutOfRange` if the table base lies outside the input, and
    /// `TruncatedInput` if the input ends before both tables do.
    pub fn read(data: &[u8], container: &Container, options: &DecodeOptions) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let base = container
            .file_table_offset_for(options.duplex_copy)
            .ok_or(GogglesError::OutOfRange {
                offset: container.duplex().copy(options.duplex_copy).offset,
                len: data.len(),
            })?;
        cursor.seek(base)?;

        let number = container.allocation().number;
        debug!(
            "Reading {} file table slots at {:#x} ({:?} copy)",
            number, base, options.duplex_copy
        );

        // Check the whole table up front so a bogus count never allocates
        let record = (FileOffset::SIZE + FileEntry::SIZE) as u64;
        let needed = number
            .checked_mul(record)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(usize::MAX);
        cursor.ensure(needed)?;
        let count = number as usize;

        let offsets = (0..count)
            .map(|_| FileOffset::read(&mut cursor))
            .collect::<Result<Vec<_>>>()?;
        let entries = (0..count)
            .map(|_| FileEntry::read(&mut cursor))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(offsets, entries))
    }

    pub fn new(offsets: Vec<FileOffset>, entries: Vec<FileEntry>) -> Self {
        let parents = entries
            .iter()
            .filter(|e| e.parent_index != e.file_index)
            .map(|e| e.parent_index)
            .collect();

        FileTable {
            offsets,
            entries,
            parents,
        }
    }

    pub fn offsets(&self) -> &[FileOffset] {
        &self.offsets
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// True if another entry lists this one as its parent
    pub fn is_directory(&self, entry: &FileEntry) -> bool {
        self.parents.contains(&entry.file_index)
    }

    /// Entries whose parent is `dir`
    pub fn children<'t>(&'t self, dir: &'t FileEntry) -> impl Iterator<Item = &'t FileEntry> + 't {
        self.entries
            .iter()
            .filter(move |e| e.parent_index == dir.file_index && e.file_index != dir.file_index)
    }

    /// Resolve the payload offset for an entry
    pub fn resolve_offset(&self, entry: &FileEntry) -> Result<u64> {
        self.offsets
            .get(entry.file_offset_index as usize)
            .map(|slot| slot.offset as u64)
            .ok_or(GogglesError::DanglingOffset {
                file_index: entry.file_index,
                slot: entry.file_offset_index,
            })
    }
}

/// A save file located by the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub file_index: u32,
    pub name: String,
    /// Absolute offset of the payload in the container
    pub offset: u64,
    pub size: u64,
}

impl IndexEntry {
    /// Byte range of the payload, if it fits in `usize`
    pub fn range(&self) -> Option<std::ops::Range<usize>> {
        let start = usize::try_from(self.offset).ok()?;
        let end = start.checked_add(usize::try_from(self.size).ok()?)?;
        Some(start..end)
    }
}

/// An entry that was left out of the index
#[derive(Debug)]
pub struct SkippedEntry {
    pub file_index: u32,
    pub reason: GogglesError,
}

/// Name → (offset, size) index over the save files of one container
///
/// Built once per decode and never modified. Iteration is in ascending
/// `file_index` order.
#[derive(Debug, Default)]
pub struct FileIndex {
    entries: Vec<IndexEntry>,
    by_name: AHashMap<String, usize>,
    skipped: Vec<SkippedEntry>,
}

impl FileIndex {
    /// Read the file table for `container` and index its save files
    pub fn read(data: &[u8], container: &Container, options: &DecodeOptions) -> Result<Self> {
        let table = FileTable::read(data, container, options)?;
        Self::build(&table, options)
    }

    /// Index every save file (non-directory entry) of a table
    ///
    /// Unusable entries (bad name, dangling offset slot, duplicate name, or a
    /// directory whose child count disagrees with `size_or_count`) are
    /// skipped and logged. With `strict_names` the first such entry fails the
    /// build instead.
    pub fn build(table: &FileTable, options: &DecodeOptions) -> Result<Self> {
        let mut order: Vec<&FileEntry> = table.entries().iter().collect();
        order.sort_by_key(|e| e.file_index);

        let mut index = FileIndex::default();

        for entry in order {
            let outcome = if table.is_directory(entry) {
                Self::check_directory(table, entry).map(|_| None)
            } else {
                Self::locate(table, entry, &index.by_name).map(Some)
            };

            match outcome {
                Ok(None) => continue,
                Ok(Some(located)) => {
                    debug!(
                        "Indexed '{}' at {:#x} ({} bytes)",
                        located.name, located.offset, located.size
                    );
                    index.by_name.insert(located.name.clone(), index.entries.len());
                    index.entries.push(located);
                }
                Err(e) if options.strict_names => return Err(e),
                Err(e) => {
                    warn!("Skipping entry {}: {}", entry.file_index, e);
                    index.skipped.push(SkippedEntry {
                        file_index: entry.file_index,
                        reason: e,
                    });
                }
            }
        }

        Ok(index)
    }

    /// A directory must have exactly as many children as it declares
    fn check_directory(table: &FileTable, entry: &FileEntry) -> Result<()> {
        let children = table.children(entry).count();
        if children as u64 != entry.size_or_count {
            return Err(GogglesError::ChildCountMismatch {
                file_index: entry.file_index,
                declared: entry.size_or_count,
                children,
            });
        }

        debug!(
            "Entry {} is a directory with {} children",
            entry.file_index, children
        );
        Ok(())
    }

    fn locate(
        table: &FileTable,
        entry: &FileEntry,
        taken: &AHashMap<String, usize>,
    ) -> Result<IndexEntry> {
        let name = decode_filename(entry.file_index, &entry.filename)?;
        if taken.contains_key(&name) {
            return Err(GogglesError::DuplicateName {
                file_index: entry.file_index,
                name,
            });
        }

        Ok(IndexEntry {
            file_index: entry.file_index,
            offset: table.resolve_offset(entry)?,
            size: entry.size_or_count,
            name,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a save file by exact name
    pub fn get(&self, name: &str) -> Option<&IndexEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// All save files in `file_index` order
    pub fn iter(&self) -> std::slice::Iter<'_, IndexEntry> {
        self.entries.iter()
    }

    /// Lazily yield the save files whose name matches a wildcard pattern
    ///
    /// The returned iterator can be cloned to restart from the same point.
    /// No match is not an error; the sequence is simply empty.
    pub fn matching<'i, 'p>(&'i self, pattern: &'p str) -> Matches<'i, 'p> {
        Matches {
            entries: self.entries.iter(),
            pattern,
        }
    }

    /// Entries left out of the index, with the reason
    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }
}

impl<'i> IntoIterator for &'i FileIndex {
    type Item = &'i IndexEntry;
    type IntoIter = std::slice::Iter<'i, IndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over index entries matching a pattern
#[derive(Debug, Clone)]
pub struct Matches<'i, 'p> {
    entries: std::slice::Iter<'i, IndexEntry>,
    pattern: &'p str,
}

impl<'i, 'p> Iterator for Matches<'i, 'p> {
    type Item = &'i IndexEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let pattern = self.pattern;
        self.entries
            .by_ref()
            .find(|e| PatternMatcher::matches(pattern, &e.name))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.entries.len()))
    }
}

impl std::iter::FusedIterator for Matches<'_, '_> {}
