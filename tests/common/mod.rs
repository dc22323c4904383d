//! Synthetic container builder shared by the integration tests

#![allow(dead_code)]

use savegame_goggles::core::header::{
    AllocationHeader, AuthHeader, DuplexDescriptor, DuplexRegion, HashTreeDescriptor,
    JournalDescriptor, Partition, RemapTable, Superblock,
};
use savegame_goggles::core::validation::encode_filename;
use savegame_goggles::{FileEntry, FileOffset, Record, HEADER_CHAIN_SIZE};

/// Default file table position: right after the header chain
pub const TABLE_OFFSET: u64 = HEADER_CHAIN_SIZE as u64;

/// One copy of the offset and entry tables
#[derive(Clone, Default)]
pub struct Table {
    pub offsets: Vec<FileOffset>,
    pub entries: Vec<FileEntry>,
}

impl Table {
    /// Add a root-level (self-parented) save file with its own offset slot
    pub fn file(mut self, file_index: u32, name: &str, offset: u32, size: u64) -> Self {
        let slot = self.offsets.len() as u32;
        self.offsets.push(FileOffset { offset, unknown: 0 });
        self.entries.push(entry(file_index, file_index, name, slot, size));
        self
    }

    /// Add a raw entry with a zeroed offset slot
    pub fn raw(mut self, entry: FileEntry) -> Self {
        self.offsets.push(FileOffset::default());
        self.entries.push(entry);
        self
    }

    fn len(&self) -> usize {
        self.offsets.len() * FileOffset::SIZE + self.entries.len() * FileEntry::SIZE
    }

    fn write_at(&self, buf: &mut [u8], at: usize) {
        let mut bytes = Vec::with_capacity(self.len());
        for slot in &self.offsets {
            bytes.extend(slot.to_bytes());
        }
        for entry in &self.entries {
            bytes.extend(entry.to_bytes());
        }
        buf[at..at + bytes.len()].copy_from_slice(&bytes);
    }
}

pub fn entry(file_index: u32, parent: u32, name: &str, slot: u32, size: u64) -> FileEntry {
    FileEntry {
        parent_index: parent,
        filename: encode_filename(name),
        file_index,
        file_offset_index: slot,
        size_or_count: size,
        unknown: 0,
        next_file_index: 0,
    }
}

/// Builds a complete container image
pub struct Fixture {
    pub table_offset: u64,
    pub primary: Table,
    pub secondary: Option<(u64, Table)>,
    pub payloads: Vec<(usize, Vec<u8>)>,
}

impl Fixture {
    pub fn new(primary: Table) -> Self {
        Fixture {
            table_offset: TABLE_OFFSET,
            primary,
            secondary: None,
            payloads: Vec::new(),
        }
    }

    /// Place a second table copy `shift` bytes after the first
    pub fn with_secondary(mut self, shift: u64, table: Table) -> Self {
        assert_eq!(table.entries.len(), self.primary.entries.len());
        self.secondary = Some((shift, table));
        self
    }

    pub fn with_payload(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.payloads.push((offset, bytes.to_vec()));
        self
    }

    pub fn header_chain(&self) -> Vec<u8> {
        let number = self.primary.entries.len() as u64;
        let shift = self.secondary.as_ref().map_or(0, |(shift, _)| *shift);

        let mut duplex = DuplexDescriptor::new([DuplexRegion::default(); 3]);
        duplex.regions[1] = DuplexRegion {
            offset: self.table_offset,
            size: self.primary.len() as u64,
            block_count: 1,
        };
        duplex.regions[2] = DuplexRegion {
            offset: self.table_offset + shift,
            size: self.primary.len() as u64,
            block_count: 1,
        };

        let mut bytes = Vec::with_capacity(HEADER_CHAIN_SIZE);
        bytes.extend(AuthHeader::new([0xA5; 16]).to_bytes());
        bytes.extend(
            Superblock::new(Partition::new(self.table_offset, self.primary.len() as u64))
                .to_bytes(),
        );
        bytes.extend(duplex.to_bytes());
        bytes.extend(HashTreeDescriptor::new().to_bytes());
        bytes.extend(JournalDescriptor::new(self.primary.len() as u64, 1).to_bytes());
        bytes.extend(AllocationHeader::new(number).to_bytes());
        bytes.extend(RemapTable::new().to_bytes());
        bytes.extend(RemapTable::new().to_bytes());
        assert_eq!(bytes.len(), HEADER_CHAIN_SIZE);
        bytes
    }

    pub fn build(&self) -> Vec<u8> {
        let table_at = self.table_offset as usize;
        let mut end = HEADER_CHAIN_SIZE.max(table_at + self.primary.len());
        if let Some((shift, table)) = &self.secondary {
            end = end.max(table_at + *shift as usize + table.len());
        }
        for (offset, bytes) in &self.payloads {
            end = end.max(offset + bytes.len());
        }

        let mut buf = vec![0u8; end];
        buf[..HEADER_CHAIN_SIZE].copy_from_slice(&self.header_chain());
        self.primary.write_at(&mut buf, table_at);
        if let Some((shift, table)) = &self.secondary {
            table.write_at(&mut buf, table_at + *shift as usize);
        }
        for (offset, bytes) in &self.payloads {
            buf[*offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        buf
    }
}

/// The two-file container used throughout the tests
pub fn two_saves() -> Vec<u8> {
    Fixture::new(
        Table::default()
            .file(1, "SAVE1.DAT", 1024, 100)
            .file(2, "SAVE2.DAT", 2048, 50),
    )
    .build()
}
