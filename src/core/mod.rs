//! Savegame container decoding
//!
//! - [`cursor`] - Bounds-checked byte reader
//! - [`header`] - Fixed-width header records and their magic tags
//! - [`container`] - Header chain validation
//! - [`catalog`] - Offset/entry tables and the name index
//! - [`pattern`] - Wildcard matching for file names
//! - [`validation`] - File name decoding and safety checks
//! - [`config`] - Decode policy options
//! - [`io`] - Archive input and save file output
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          Savegame Container                 │
//! ├─────────────────────────────────────────────┤
//! │ 0x000: AuthHeader (256)                     │
//! │  - 16-byte authentication tag               │
//! ├─────────────────────────────────────────────┤
//! │ 0x100: DISF DPFS IVFC JNGL SAVE RMAP RMAP   │
//! │  - Partition map, duplex regions,           │
//! │    hash tree, journal, allocation params    │
//! ├─────────────────────────────────────────────┤
//! │ save_partition.offset: File table           │
//! │  - [FileOffset; number]                     │
//! │  - [FileEntry; number]                      │
//! ├─────────────────────────────────────────────┤
//! │ Payloads at FileOffset.offset               │
//! └─────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod config;
pub mod container;
pub mod cursor;
pub mod error;
pub mod header;
pub mod io;
pub mod pattern;
pub mod validation;

pub use catalog::{FileEntry, FileIndex, FileOffset, FileTable, IndexEntry, Matches, SkippedEntry};
pub use config::DecodeOptions;
pub use container::Container;
pub use cursor::ByteCursor;
pub use error::{GogglesError, Result};
pub use header::{DuplexCopy, Layer, Magic, Record, Tagged, HEADER_CHAIN_SIZE};
pub use io::ArchiveBytes;
pub use pattern::PatternMatcher;
