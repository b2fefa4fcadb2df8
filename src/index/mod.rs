//! Needle Index Module
//!
//! Persistent index mapping 64-bit needle keys to their (offset, size)
//! position inside a volume's data file.
//!
//! ## Responsibilities
//! - Append one fixed-width record per put/delete to an on-disk index log
//! - Rebuild the in-memory lookup map by replaying the log on startup
//! - Tolerate a torn trailing record (truncated on next open)
//! - Track cumulative counters used to decide when compaction pays off
//! - Allocate fresh file keys from a monotone high-water mark
//!
//! ## Index Log Format
//! ```text
//! ┌─────────────────────────────────┐
//! │ Record 1                        │
//! │ ┌─────────┬──────────┬────────┐ │
//! │ │ Key (8) │ Offset(4)│ Size(4)│ │   all big-endian,
//! │ └─────────┴──────────┴────────┘ │   offset == 0 is a tombstone
//! ├─────────────────────────────────┤
//! │ Record 2                        │
//! │ ...                             │
//! └─────────────────────────────────┘
//! ```
//!
//! No header, no checksum: file length / 16 is the record count, and a
//! non-multiple-of-16 length marks a torn write.

mod compact_map;
mod entry;
mod needle_index;
mod replay;

pub use compact_map::{CompactMap, NeedleValueMap};
pub use entry::{IndexEntry, INDEX_ENTRY_SIZE};
pub use needle_index::{IndexMetrics, NeedleIndex};
pub use replay::walk_index_log;

use serde::Serialize;

/// One live in-memory index entry: where a needle sits in the data file.
///
/// `offset` is in data-file block units; `size` is the needle size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NeedleValue {
    pub key: u64,
    pub offset: u32,
    pub size: u32,
}
