//! Index log replay
//!
//! Streams an index log in large chunks and hands out whole 16-byte
//! records. A record split across two reads is stitched together rather
//! than discarded; a torn trailing record is treated as end-of-file.

use std::io::{BufReader, Read};

use crate::error::Result;

use super::entry::{IndexEntry, INDEX_ENTRY_SIZE};

/// Records decoded per buffer fill
const ROWS_PER_READ: usize = 1024;

/// Walk every complete record of an index log, in append order
///
/// Calls `visit` with each decoded record and stops with the first error it
/// returns. Trailing bytes that do not form a whole record are silently
/// dropped; the caller decides whether to truncate the underlying file.
pub fn walk_index_log<R: Read>(
    reader: R,
    mut visit: impl FnMut(IndexEntry) -> Result<()>,
) -> Result<()> {
    let mut reader = BufReader::with_capacity(1024 * 1024, reader);
    let mut buf = vec![0u8; INDEX_ENTRY_SIZE * ROWS_PER_READ];

    let mut filled = reader.read(&mut buf)?;
    while filled > 0 {
        let mut pos = 0;
        while pos + INDEX_ENTRY_SIZE <= filled {
            visit(IndexEntry::decode(&buf[pos..pos + INDEX_ENTRY_SIZE]))?;
            pos += INDEX_ENTRY_SIZE;
        }

        if pos < filled {
            // Partial record at the end of the buffer: move it to the front
            // and top the buffer back up from the reader.
            buf.copy_within(pos..filled, 0);
            let carried = filled - pos;
            let read = reader.read(&mut buf[carried..])?;
            if read == 0 {
                // Torn trailing record: benign EOF.
                break;
            }
            filled = carried + read;
        } else {
            filled = reader.read(&mut buf)?;
        }
    }
    Ok(())
}
