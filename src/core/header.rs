use crate::cursor::ByteCursor;
use crate::error::Result;
use serde::{Serialize, Serializer};
use std::fmt;

/// Length of the full header chain, from the auth header through the second
/// remap table
pub const HEADER_CHAIN_SIZE: usize = AuthHeader::SIZE
    + Superblock::SIZE
    + DuplexDescriptor::SIZE
    + HashTreeDescriptor::SIZE
    + JournalDescriptor::SIZE
    + AllocationHeader::SIZE
    + 2 * RemapTable::SIZE;

/// Four-byte ASCII discriminant at the start of a structural record
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Magic(pub [u8; 4]);

impl Magic {
    pub const DISF: Magic = Magic(*b"DISF");
    pub const DPFS: Magic = Magic(*b"DPFS");
    pub const IVFC: Magic = Magic(*b"IVFC");
    pub const JNGL: Magic = Magic(*b"JNGL");
    pub const SAVE: Magic = Magic(*b"SAVE");
    pub const RMAP: Magic = Magic(*b"RMAP");

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        write!(f, "\"")
    }
}

impl fmt::Debug for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl PartialEq<&str> for Magic {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_slice() == other.as_bytes()
    }
}

impl Serialize for Magic {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.0))
    }
}

/// One layer of the header chain, in the order the validator reads them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Layer {
    Auth,
    Superblock,
    Duplex,
    HashTree,
    Journal,
    Allocation,
    RemapPrimary,
    RemapSecondary,
}

impl Layer {
    /// Every layer in read order
    pub const ALL: [Layer; 8] = [
        Layer::Auth,
        Layer::Superblock,
        Layer::Duplex,
        Layer::HashTree,
        Layer::Journal,
        Layer::Allocation,
        Layer::RemapPrimary,
        Layer::RemapSecondary,
    ];

    /// Fixed on-disk length of the layer's record
    pub fn size(self) -> usize {
        match self {
            Layer::Auth => AuthHeader::SIZE,
            Layer::Superblock => Superblock::SIZE,
            Layer::Duplex => DuplexDescriptor::SIZE,
            Layer::HashTree => HashTreeDescriptor::SIZE,
            Layer::Journal => JournalDescriptor::SIZE,
            Layer::Allocation => AllocationHeader::SIZE,
            Layer::RemapPrimary | Layer::RemapSecondary => RemapTable::SIZE,
        }
    }

    /// Absolute offset of the layer within the container
    pub fn offset(self) -> usize {
        Layer::ALL
            .iter()
            .take_while(|&&l| l != self)
            .map(|l| l.size())
            .sum()
    }

    /// Expected magic, `None` for the untagged auth header
    pub fn magic(self) -> Option<Magic> {
        match self {
            Layer::Auth => None,
            Layer::Superblock => Some(Superblock::MAGIC),
            Layer::Duplex => Some(DuplexDescriptor::MAGIC),
            Layer::HashTree => Some(HashTreeDescriptor::MAGIC),
            Layer::Journal => Some(JournalDescriptor::MAGIC),
            Layer::Allocation => Some(AllocationHeader::MAGIC),
            Layer::RemapPrimary | Layer::RemapSecondary => Some(RemapTable::MAGIC),
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Auth => "authentication header",
            Layer::Superblock => "superblock (DISF)",
            Layer::Duplex => "duplex descriptor (DPFS)",
            Layer::HashTree => "hash tree descriptor (IVFC)",
            Layer::Journal => "journal descriptor (JNGL)",
            Layer::Allocation => "allocation header (SAVE)",
            Layer::RemapPrimary => "primary remap table (RMAP)",
            Layer::RemapSecondary => "secondary remap table (RMAP)",
        };
        f.write_str(name)
    }
}

/// A fixed-width little-endian record
///
/// Decoding never looks at field values; it only fails when the input is
/// shorter than `SIZE`.
pub trait Record: Sized {
    /// Exact on-disk length in bytes
    const SIZE: usize;

    /// Read the fields in order. Callers guarantee `SIZE` bytes remain.
    fn read_fields(cursor: &mut ByteCursor<'_>) -> Result<Self>;

    /// Append the fields in order
    fn write_fields(&self, out: &mut Vec<u8>);

    /// Read one record at the cursor, all-or-nothing
    fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        cursor.ensure(Self::SIZE)?;
        Self::read_fields(cursor)
    }

    /// Decode from the front of `bytes`, returning the record and the number
    /// of bytes consumed
    fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        let mut cursor = ByteCursor::new(bytes);
        let record = Self::read(&mut cursor)?;
        Ok((record, cursor.position()))
    }

    /// Encode to exactly `SIZE` bytes
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        self.write_fields(&mut out);
        debug_assert_eq!(out.len(), Self::SIZE);
        out
    }
}

/// A record that starts with a 4-byte magic tag
pub trait Tagged {
    const MAGIC: Magic;

    fn tag(&self) -> Magic;

    fn tag_matches(&self) -> bool {
        self.tag() == Self::MAGIC
    }
}

/// Authentication header (offset 0)
///
/// Carries a 16-byte tag over the rest of the container. It has no magic and
/// cannot be checked without the console key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthHeader {
    pub tag: [u8; 16],
    #[serde(skip)]
    pub reserved: [u8; 240],
}

impl AuthHeader {
    pub fn new(tag: [u8; 16]) -> Self {
        AuthHeader {
            tag,
            reserved: [0; 240],
        }
    }
}

impl Record for AuthHeader {
    const SIZE: usize = 256;

    fn read_fields(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(AuthHeader {
            tag: cursor.read_array()?,
            reserved: cursor.read_array()?,
        })
    }

    fn write_fields(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.reserved);
    }
}

/// Absolute (offset, size) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub offset: u64,
    pub size: u64,
}

impl Partition {
    pub fn new(offset: u64, size: u64) -> Self {
        Partition { offset, size }
    }

    fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Partition {
            offset: cursor.read_u64()?,
            size: cursor.read_u64()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.offset.to_le_bytes());
        out.extend_from_slice(&self.size.to_le_bytes());
    }
}

/// Top-level partition map ("DISF")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Superblock {
    pub magic: Magic,
    pub version: u32,
    pub hash: [u8; 32],
    pub primary_partition: Partition,
    pub secondary_partition: Partition,
    /// Where the file table lives
    pub save_partition: Partition,
    #[serde(skip)]
    pub reserved: [u8; 424],
}

impl Superblock {
    pub fn new(save_partition: Partition) -> Self {
        Superblock {
            magic: Self::MAGIC,
            version: 0,
            hash: [0; 32],
            primary_partition: Partition::default(),
            secondary_partition: Partition::default(),
            save_partition,
            reserved: [0; 424],
        }
    }
}

impl Tagged for Superblock {
    const MAGIC: Magic = Magic::DISF;

    fn tag(&self) -> Magic {
        self.magic
    }
}

impl Record for Superblock {
    const SIZE: usize = 512;

    fn read_fields(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Superblock {
            magic: Magic(cursor.read_array()?),
            version: cursor.read_u32()?,
            hash: cursor.read_array()?,
            primary_partition: Partition::read(cursor)?,
            secondary_partition: Partition::read(cursor)?,
            save_partition: Partition::read(cursor)?,
            reserved: cursor.read_array()?,
        })
    }

    fn write_fields(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.magic.as_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.hash);
        self.primary_partition.write(out);
        self.secondary_partition.write(out);
        self.save_partition.write(out);
        out.extend_from_slice(&self.reserved);
    }
}

/// One region of the duplex layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DuplexRegion {
    pub offset: u64,
    pub size: u64,
    pub block_count: u32,
}

/// Which mirrored duplex copy holds the authoritative save partition
///
/// The descriptor carries no generation counter, so this is chosen by the
/// caller rather than inferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplexCopy {
    /// Region 1
    #[default]
    Primary,
    /// Region 2
    Secondary,
}

impl DuplexCopy {
    /// Index into `DuplexDescriptor::regions`
    pub fn region_index(self) -> usize {
        match self {
            DuplexCopy::Primary => 1,
            DuplexCopy::Secondary => 2,
        }
    }
}

/// Mirrored storage descriptor ("DPFS")
///
/// Region 0 is metadata; regions 1 and 2 are the two copies of the save
/// partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplexDescriptor {
    pub magic: Magic,
    pub version: u32,
    pub regions: [DuplexRegion; 3],
}

impl DuplexDescriptor {
    pub fn new(regions: [DuplexRegion; 3]) -> Self {
        DuplexDescriptor {
            magic: Self::MAGIC,
            version: 0,
            regions,
        }
    }

    pub fn metadata(&self) -> &DuplexRegion {
        &self.regions[0]
    }

    pub fn copy(&self, copy: DuplexCopy) -> &DuplexRegion {
        &self.regions[copy.region_index()]
    }
}

impl Tagged for DuplexDescriptor {
    const MAGIC: Magic = Magic::DPFS;

    fn tag(&self) -> Magic {
        self.magic
    }
}

impl Record for DuplexDescriptor {
    const SIZE: usize = 68;

    fn read_fields(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let magic = Magic(cursor.read_array()?);
        let version = cursor.read_u32()?;
        let mut regions = [DuplexRegion::default(); 3];
        for region in regions.iter_mut() {
            *region = DuplexRegion {
                offset: cursor.read_u64()?,
                size: cursor.read_u64()?,
                block_count: cursor.read_u32()?,
            };
        }
        Ok(DuplexDescriptor {
            magic,
            version,
            regions,
        })
    }

    fn write_fields(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.magic.as_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
        for region in &self.regions {
            out.extend_from_slice(&region.offset.to_le_bytes());
            out.extend_from_slice(&region.size.to_le_bytes());
            out.extend_from_slice(&region.block_count.to_le_bytes());
        }
    }
}

/// One level of the integrity tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HashLevel {
    pub offset: u64,
    pub size: u64,
    pub block_count: u32,
    pub reserved: u32,
}

/// Integrity hash tree descriptor ("IVFC")
///
/// Decoded and kept for reference only; the tree is never walked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashTreeDescriptor {
    pub magic: Magic,
    pub version: u32,
    pub master_hash_size: u32,
    pub levels: [HashLevel; 4],
    #[serde(skip)]
    pub unknown: [u8; 56],
    pub hash: [u8; 32],
}

impl HashTreeDescriptor {
    pub fn new() -> Self {
        HashTreeDescriptor {
            magic: Self::MAGIC,
            version: 0,
            master_hash_size: 0,
            levels: [HashLevel::default(); 4],
            unknown: [0; 56],
            hash: [0; 32],
        }
    }
}

impl Default for HashTreeDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Tagged for HashTreeDescriptor {
    const MAGIC: Magic = Magic::IVFC;

    fn tag(&self) -> Magic {
        self.magic
    }
}

impl Record for HashTreeDescriptor {
    const SIZE: usize = 196;

    fn read_fields(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let magic = Magic(cursor.read_array()?);
        let version = cursor.read_u32()?;
        let master_hash_size = cursor.read_u32()?;
        let mut levels = [HashLevel::default(); 4];
        for level in levels.iter_mut() {
            *level = HashLevel {
                offset: cursor.read_u64()?,
                size: cursor.read_u64()?,
                block_count: cursor.read_u32()?,
                reserved: cursor.read_u32()?,
            };
        }
        Ok(HashTreeDescriptor {
            magic,
            version,
            master_hash_size,
            levels,
            unknown: cursor.read_array()?,
            hash: cursor.read_array()?,
        })
    }

    fn write_fields(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.magic.as_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.master_hash_size.to_le_bytes());
        for level in &self.levels {
            out.extend_from_slice(&level.offset.to_le_bytes());
            out.extend_from_slice(&level.size.to_le_bytes());
            out.extend_from_slice(&level.block_count.to_le_bytes());
            out.extend_from_slice(&level.reserved.to_le_bytes());
        }
        out.extend_from_slice(&self.unknown);
        out.extend_from_slice(&self.hash);
    }
}

/// Write-journal descriptor ("JNGL")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalDescriptor {
    pub magic: Magic,
    pub version: u32,
    pub savedata_size: u64,
    pub savedata_block_count: u64,
    pub reserved: [u64; 2],
    #[serde(skip)]
    pub padding: [u8; 472],
}

impl JournalDescriptor {
    pub fn new(savedata_size: u64, savedata_block_count: u64) -> Self {
        JournalDescriptor {
            magic: Self::MAGIC,
            version: 0,
            savedata_size,
            savedata_block_count,
            reserved: [0; 2],
            padding: [0; 472],
        }
    }
}

impl Tagged for JournalDescriptor {
    const MAGIC: Magic = Magic::JNGL;

    fn tag(&self) -> Magic {
        self.magic
    }
}

impl Record for JournalDescriptor {
    const SIZE: usize = 512;

    fn read_fields(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(JournalDescriptor {
            magic: Magic(cursor.read_array()?),
            version: cursor.read_u32()?,
            savedata_size: cursor.read_u64()?,
            savedata_block_count: cursor.read_u64()?,
            reserved: [cursor.read_u64()?, cursor.read_u64()?],
            padding: cursor.read_array()?,
        })
    }

    fn write_fields(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.magic.as_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.savedata_size.to_le_bytes());
        out.extend_from_slice(&self.savedata_block_count.to_le_bytes());
        for word in &self.reserved {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.extend_from_slice(&self.padding);
    }
}

/// File allocation table parameters ("SAVE")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationHeader {
    pub magic: Magic,
    pub version: u32,
    /// Number of `FileOffset` records, and of `FileEntry` records after them
    pub number: u64,
    pub block_size: u64,
    pub metadata_block_size: u64,
    #[serde(skip)]
    pub reserved: [u8; 40],
}

impl AllocationHeader {
    pub fn new(number: u64) -> Self {
        AllocationHeader {
            magic: Self::MAGIC,
            version: 0,
            number,
            block_size: 0x4000,
            metadata_block_size: 0x4000,
            reserved: [0; 40],
        }
    }
}

impl Tagged for AllocationHeader {
    const MAGIC: Magic = Magic::SAVE;

    fn tag(&self) -> Magic {
        self.magic
    }
}

impl Record for AllocationHeader {
    const SIZE: usize = 72;

    fn read_fields(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(AllocationHeader {
            magic: Magic(cursor.read_array()?),
            version: cursor.read_u32()?,
            number: cursor.read_u64()?,
            block_size: cursor.read_u64()?,
            metadata_block_size: cursor.read_u64()?,
            reserved: cursor.read_array()?,
        })
    }

    fn write_fields(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.magic.as_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.number.to_le_bytes());
        out.extend_from_slice(&self.block_size.to_le_bytes());
        out.extend_from_slice(&self.metadata_block_size.to_le_bytes());
        out.extend_from_slice(&self.reserved);
    }
}

/// Logical-to-physical block remap table ("RMAP"), one per duplex copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemapTable {
    pub magic: Magic,
    pub version: u32,
    #[serde(skip)]
    pub reserved: [u8; 56],
}

impl RemapTable {
    pub fn new() -> Self {
        RemapTable {
            magic: Self::MAGIC,
            version: 0,
            reserved: [0; 56],
        }
    }
}

impl Default for RemapTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Tagged for RemapTable {
    const MAGIC: Magic = Magic::RMAP;

    fn tag(&self) -> Magic {
        self.magic
    }
}

impl Record for RemapTable {
    const SIZE: usize = 64;

    fn read_fields(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(RemapTable {
            magic: Magic(cursor.read_array()?),
            version: cursor.read_u32()?,
            reserved: cursor.read_array()?,
        })
    }

    fn write_fields(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.magic.as_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.reserved);
    }
}
