//! Bounds-checked sequential reader over container bytes
//!
//! Every header decoder and the file table reader pull their bytes through a
//! [`ByteCursor`]. A failed read never moves the cursor, so after an error
//! `position()` still points at the start of the record that did not fit.

use crate::error::{GogglesError, Result};

/// Sequential little-endian reader over a borrowed byte slice
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at offset 0
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    /// Current absolute offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the cursor and the end of the buffer
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Read exactly `n` bytes, advancing the cursor
    ///
    /// Fails with `TruncatedInput` if fewer than `n` bytes remain. The cursor
    /// does not move on failure.
    pub fn read(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Fail with `TruncatedInput` unless `n` more bytes are available
    pub fn ensure(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(GogglesError::TruncatedInput {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Reposition to an absolute offset
    ///
    /// Seeking to exactly `len()` is allowed (an empty tail).
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        let len = self.data.len();
        match usize::try_from(offset) {
            Ok(pos) if pos <= len => {
                self.pos = pos;
                Ok(())
            }
            _ => Err(GogglesError::OutOfRange { offset, len }),
        }
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read(N)?);
        Ok(out)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_reads() {
        let data = [1u8, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0xAA];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read_u32().unwrap(), 1);
        assert_eq!(cursor.position(), 4);
        assert_eq!(cursor.read_u64().unwrap(), 2);
        assert_eq!(cursor.read(1).unwrap(), &[0xAA]);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_short_read_does_not_advance() {
        let data = [0u8; 10];
        let mut cursor = ByteCursor::new(&data);
        cursor.read(6).unwrap();

        let err = cursor.read(8).unwrap_err();
        assert!(matches!(
            err,
            GogglesError::TruncatedInput {
                offset: 6,
                needed: 8,
                available: 4
            }
        ));
        assert_eq!(cursor.position(), 6);
    }

    #[test]
    fn test_seek_bounds() {
        let data = [0u8; 16];
        let mut cursor = ByteCursor::new(&data);

        cursor.seek(16).unwrap();
        assert_eq!(cursor.remaining(), 0);

        assert!(matches!(
            cursor.seek(17),
            Err(GogglesError::OutOfRange { offset: 17, len: 16 })
        ));
        assert_eq!(cursor.position(), 16);
    }

    #[test]
    fn test_zero_length_read() {
        let mut cursor = ByteCursor::new(&[]);
        assert!(cursor.is_empty());
        assert_eq!(cursor.read(0).unwrap(), &[] as &[u8]);
        assert!(cursor.read_u32().is_err());
    }
}
