//! Index log record
//!
//! Fixed 16-byte on-disk representation of one index mutation.

use super::NeedleValue;

/// Size of one encoded index record: key (8) + offset (4) + size (4)
pub const INDEX_ENTRY_SIZE: usize = 16;

/// One record of the index log
///
/// A record with `offset == 0` is a tombstone: it marks `key` as deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: u64,
    pub offset: u32,
    pub size: u32,
}

impl IndexEntry {
    /// Build a tombstone record for `key`
    pub fn tombstone(key: u64) -> Self {
        Self {
            key,
            offset: 0,
            size: 0,
        }
    }

    /// Whether this record marks its key as deleted
    pub fn is_tombstone(&self) -> bool {
        self.offset == 0
    }

    /// Encode to the fixed 16-byte wire form (big-endian)
    pub fn encode(&self) -> [u8; INDEX_ENTRY_SIZE] {
        let mut buf = [0u8; INDEX_ENTRY_SIZE];
        buf[0..8].copy_from_slice(&self.key.to_be_bytes());
        buf[8..12].copy_from_slice(&self.offset.to_be_bytes());
        buf[12..16].copy_from_slice(&self.size.to_be_bytes());
        buf
    }

    /// Decode from a 16-byte slice
    ///
    /// Callers guarantee `buf.len() >= INDEX_ENTRY_SIZE`; the replay loop
    /// only hands out whole records.
    pub fn decode(buf: &[u8]) -> Self {
        let key = u64::from_be_bytes(buf[0..8].try_into().unwrap());
        let offset = u32::from_be_bytes(buf[8..12].try_into().unwrap());
        let size = u32::from_be_bytes(buf[12..16].try_into().unwrap());
        Self { key, offset, size }
    }
}

impl From<NeedleValue> for IndexEntry {
    fn from(value: NeedleValue) -> Self {
        Self {
            key: value.key,
            offset: value.offset,
            size: value.size,
        }
    }
}
