//! Header chain validation
//!
//! The container starts with a fixed chain of records:
//!
//! ```text
//! offset  size  record
//! 0x000   256   AuthHeader          (no magic)
//! 0x100   512   Superblock          "DISF"
//! 0x300    68   DuplexDescriptor    "DPFS"
//! 0x344   196   HashTreeDescriptor  "IVFC"
//! 0x408   512   JournalDescriptor   "JNGL"
//! 0x608    72   AllocationHeader    "SAVE"
//! 0x650    64   RemapTable          "RMAP"
//! 0x690    64   RemapTable          "RMAP"
//! ```
//!
//! Each layer is read and checked before the next one is touched. The first
//! bad tag ends validation; no partial [`Container`] is ever produced.

use crate::cursor::ByteCursor;
use crate::error::{GogglesError, Result};
use crate::header::{
    AllocationHeader, AuthHeader, DuplexCopy, DuplexDescriptor, HashTreeDescriptor,
    JournalDescriptor, Layer, Record, RemapTable, Superblock, Tagged,
};
use serde::Serialize;
use tracing::{debug, trace};

/// A fully validated header chain
///
/// Only [`Container::read`] and [`Container::decode`] can build one, and
/// only after every tag check has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
    auth: AuthHeader,
    superblock: Superblock,
    duplex: DuplexDescriptor,
    hash_tree: HashTreeDescriptor,
    journal: JournalDescriptor,
    allocation: AllocationHeader,
    remap: [RemapTable; 2],
    file_table_offset: u64,
}

impl Container {
    /// Validate the header chain starting at the cursor
    ///
    /// On failure the cursor is left just past the layer that failed (or at
    /// the start of the layer that did not fit).
    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        trace!("Reading {} at offset {}", Layer::Auth, cursor.position());
        let auth = AuthHeader::read(cursor)?;

        let superblock: Superblock = read_tagged(cursor, Layer::Superblock)?;
        let duplex: DuplexDescriptor = read_tagged(cursor, Layer::Duplex)?;
        let hash_tree: HashTreeDescriptor = read_tagged(cursor, Layer::HashTree)?;
        let journal: JournalDescriptor = read_tagged(cursor, Layer::Journal)?;
        let allocation: AllocationHeader = read_tagged(cursor, Layer::Allocation)?;
        let primary: RemapTable = read_tagged(cursor, Layer::RemapPrimary)?;
        let secondary: RemapTable = read_tagged(cursor, Layer::RemapSecondary)?;

        let file_table_offset = superblock.save_partition.offset;
        debug!(
            "Header chain validated: {} file table slots at offset {:#x}",
            allocation.number, file_table_offset
        );

        Ok(Container {
            auth,
            superblock,
            duplex,
            hash_tree,
            journal,
            allocation,
            remap: [primary, secondary],
            file_table_offset,
        })
    }

    /// Validate the header chain at the start of `bytes`
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::read(&mut ByteCursor::new(bytes))
    }

    pub fn auth(&self) -> &AuthHeader {
        &self.auth
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn duplex(&self) -> &DuplexDescriptor {
        &self.duplex
    }

    pub fn hash_tree(&self) -> &HashTreeDescriptor {
        &self.hash_tree
    }

    pub fn journal(&self) -> &JournalDescriptor {
        &self.journal
    }

    pub fn allocation(&self) -> &AllocationHeader {
        &self.allocation
    }

    /// Remap table for the given duplex copy
    pub fn remap(&self, copy: DuplexCopy) -> &RemapTable {
        match copy {
            DuplexCopy::Primary => &self.remap[0],
            DuplexCopy::Secondary => &self.remap[1],
        }
    }

    /// Absolute offset of the file table, taken from the superblock's save
    /// partition
    pub fn file_table_offset(&self) -> u64 {
        self.file_table_offset
    }

    /// File table offset within the chosen duplex copy
    ///
    /// The superblock points into copy 1. Copy 2 holds the same layout
    /// displaced by the distance between the two duplex regions. Returns
    /// `None` if that displacement leaves the `u64` range.
    pub fn file_table_offset_for(&self, copy: DuplexCopy) -> Option<u64> {
        match copy {
            DuplexCopy::Primary => Some(self.file_table_offset),
            DuplexCopy::Secondary => {
                let primary = self.duplex.copy(DuplexCopy::Primary).offset as i128;
                let secondary = self.duplex.copy(DuplexCopy::Secondary).offset as i128;
                let shifted = self.file_table_offset as i128 + (secondary - primary);
                u64::try_from(shifted).ok()
            }
        }
    }
}

/// Read one tagged layer and check its magic
fn read_tagged<H: Record + Tagged>(cursor: &mut ByteCursor<'_>, layer: Layer) -> Result<H> {
    trace!("Reading {} at offset {}", layer, cursor.position());
    let header = H::read(cursor)?;

    if !header.tag_matches() {
        debug!("Tag mismatch in {}: found {}", layer, header.tag());
        return Err(GogglesError::HeaderMismatch {
            layer,
            expected: H::MAGIC,
            found: header.tag(),
        });
    }

    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{DuplexRegion, Magic, Partition, HEADER_CHAIN_SIZE};

    fn chain(save_offset: u64) -> Vec<u8> {
        let mut duplex = DuplexDescriptor::new([DuplexRegion::default(); 3]);
        duplex.regions[1].offset = 0x1000;
        duplex.regions[2].offset = 0x3000;

        let mut bytes = Vec::new();
        bytes.extend(AuthHeader::new([0x11; 16]).to_bytes());
        bytes.extend(Superblock::new(Partition::new(save_offset, 0x800)).to_bytes());
        bytes.extend(duplex.to_bytes());
        bytes.extend(HashTreeDescriptor::new().to_bytes());
        bytes.extend(JournalDescriptor::new(0x800, 1).to_bytes());
        bytes.extend(AllocationHeader::new(0).to_bytes());
        bytes.extend(RemapTable::new().to_bytes());
        bytes.extend(RemapTable::new().to_bytes());
        bytes
    }

    #[test]
    fn test_valid_chain() {
        let bytes = chain(0x1100);
        let mut cursor = ByteCursor::new(&bytes);
        let container = Container::read(&mut cursor).unwrap();

        assert_eq!(cursor.position(), HEADER_CHAIN_SIZE);
        assert_eq!(container.file_table_offset(), 0x1100);
        assert_eq!(container.auth().tag, [0x11; 16]);
        assert_eq!(container.allocation().number, 0);
    }

    #[test]
    fn test_each_layer_mismatch_stops_there() {
        for layer in Layer::ALL.into_iter().skip(1) {
            let mut bytes = chain(0);
            bytes[layer.offset()] ^= 0xFF;

            let mut cursor = ByteCursor::new(&bytes);
            let err = Container::read(&mut cursor).unwrap_err();

            assert_eq!(err.layer(), Some(layer));
            assert_eq!(cursor.position(), layer.offset() + layer.size());
            match err {
                GogglesError::HeaderMismatch { expected, found, .. } => {
                    assert_eq!(Some(expected), layer.magic());
                    assert_ne!(found, expected);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_auth_header_not_checked() {
        let mut bytes = chain(0);
        bytes[..256].fill(0xEE);
        assert!(Container::decode(&bytes).is_ok());
    }

    #[test]
    fn test_truncated_mid_chain() {
        let bytes = chain(0);
        let cut = Layer::HashTree.offset() + 10;
        let mut cursor = ByteCursor::new(&bytes[..cut]);

        let err = Container::read(&mut cursor).unwrap_err();
        assert!(matches!(err, GogglesError::TruncatedInput { needed: 196, .. }));
        assert_eq!(cursor.position(), Layer::HashTree.offset());
    }

    #[test]
    fn test_secondary_copy_offset() {
        let container = Container::decode(&chain(0x1100)).unwrap();
        assert_eq!(container.file_table_offset_for(DuplexCopy::Primary), Some(0x1100));
        assert_eq!(container.file_table_offset_for(DuplexCopy::Secondary), Some(0x3100));
    }

    #[test]
    fn test_remap_tables_by_copy() {
        let mut bytes = chain(0);
        let second = Layer::RemapSecondary.offset();
        bytes[second + 4..second + 8].copy_from_slice(&7u32.to_le_bytes());

        let container = Container::decode(&bytes).unwrap();
        assert_eq!(container.remap(DuplexCopy::Primary).version, 0);
        assert_eq!(container.remap(DuplexCopy::Secondary).version, 7);
        assert_eq!(container.remap(DuplexCopy::Secondary).magic, Magic::RMAP);
    }
}
