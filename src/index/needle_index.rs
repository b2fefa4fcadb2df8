//! Needle index
//!
//! Owns one volume's append-only index log plus the in-memory map rebuilt
//! from it.
//!
//! ## Concurrency Model
//! Not internally synchronized. Mutating operations take `&mut self`, so a
//! shared instance must live behind one caller-held `Mutex`: `put`/`delete`
//! pair a map mutation with a log append that must stay ordered and
//! non-interleaved, and `next_file_key` is a plain read-then-bump. Each
//! append is a single 16-byte `write_all`, never split across writes.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};

use super::compact_map::{CompactMap, NeedleValueMap};
use super::entry::{IndexEntry, INDEX_ENTRY_SIZE};
use super::replay::walk_index_log;
use super::NeedleValue;

/// Cumulative accounting over an index log
///
/// `file_count`/`file_bytes` cover every record ever appended, including
/// ones later superseded; `deletion_count`/`deleted_bytes` cover every
/// superseding or tombstoning event and the size displaced. These are not
/// "live size": their ratio tells whether compaction is worth running.
/// `max_file_key` is the monotone high-water mark backing key allocation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexMetrics {
    #[serde(rename = "FileCounter")]
    pub file_count: u64,
    #[serde(rename = "DeletionCounter")]
    pub deletion_count: u64,
    #[serde(rename = "FileByteCounter")]
    pub file_bytes: u64,
    #[serde(rename = "DeletionByteCounter")]
    pub deleted_bytes: u64,
    #[serde(rename = "MaxFileKey")]
    pub max_file_key: u64,
}

/// Persistent needle index for one volume
pub struct NeedleIndex {
    file: File,
    path: PathBuf,
    map: Box<dyn NeedleValueMap>,
    metrics: IndexMetrics,
}

impl NeedleIndex {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Open the index log at `path`, replaying any existing records
    ///
    /// A fresh file yields an empty index. A non-multiple-of-16 trailing
    /// length marks a torn write; the file is truncated back to the last
    /// complete record before appends resume.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_map(path, Box::new(CompactMap::new()))
    }

    /// Same as [`load`](Self::load), with a caller-supplied map
    pub fn load_with_map(
        path: impl AsRef<Path>,
        mut map: Box<dyn NeedleValueMap>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let mut metrics = IndexMetrics::default();
        walk_index_log(&mut file, |entry| {
            Self::replay_record(map.as_mut(), &mut metrics, entry);
            Ok(())
        })?;

        // Drop any torn trailing record so the log stays 16-byte aligned.
        let len = file.metadata()?.len();
        let aligned = len - len % INDEX_ENTRY_SIZE as u64;
        if aligned != len {
            warn!(
                path = %path.display(),
                torn_bytes = len - aligned,
                "truncating torn record at end of index log"
            );
            file.set_len(aligned)?;
        }
        file.seek(SeekFrom::Start(aligned))?;

        info!(
            path = %path.display(),
            records = metrics.file_count,
            max_file_key = metrics.max_file_key,
            "index log replayed"
        );

        Ok(Self {
            file,
            path,
            map,
            metrics,
        })
    }

    /// Apply one replayed log record to the map and counters
    fn replay_record(map: &mut dyn NeedleValueMap, metrics: &mut IndexMetrics, entry: IndexEntry) {
        if entry.key > metrics.max_file_key {
            metrics.max_file_key = entry.key;
        }
        metrics.file_count += 1;
        metrics.file_bytes += entry.size as u64;
        if !entry.is_tombstone() {
            let old_size = map.set(entry.key, entry.offset, entry.size);
            debug!(key = entry.key, offset = entry.offset, size = entry.size, old_size, "replayed put");
            if old_size > 0 {
                metrics.deletion_count += 1;
                metrics.deleted_bytes += old_size as u64;
            }
        } else {
            let old_size = map.delete(entry.key);
            debug!(key = entry.key, old_size, "replayed tombstone");
            metrics.deletion_count += 1;
            metrics.deleted_bytes += old_size as u64;
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Record that `key` now lives at (`offset`, `size`) in the data file
    ///
    /// Updates the map first, then appends the record to the log. An
    /// overwrite is modeled as "delete old, add new" in the counters.
    /// Returns the number of bytes appended.
    pub fn put(&mut self, key: u64, offset: u32, size: u32) -> Result<usize> {
        let old_size = self.map.set(key, offset, size);
        if key > self.metrics.max_file_key {
            self.metrics.max_file_key = key;
        }
        self.metrics.file_count += 1;
        self.metrics.file_bytes += size as u64;
        if old_size > 0 {
            self.metrics.deletion_count += 1;
            self.metrics.deleted_bytes += old_size as u64;
        }

        let record = IndexEntry { key, offset, size }.encode();
        self.file
            .write_all(&record)
            .map_err(|source| StoreError::IndexWrite {
                key,
                path: self.path.clone(),
                source,
            })?;
        Ok(INDEX_ENTRY_SIZE)
    }

    /// Look up the live record for `key` (pure in-memory, no I/O)
    pub fn get(&self, key: u64) -> Option<NeedleValue> {
        self.map.get(key)
    }

    /// Remove `key` and append a tombstone record
    ///
    /// If the append fails, the log is truncated back to the position
    /// captured before the write so no half-written record trails the file;
    /// a truncation failure is reported alongside the write error rather
    /// than masking it.
    pub fn delete(&mut self, key: u64) -> Result<()> {
        let old_size = self.map.delete(key);
        self.metrics.deleted_bytes += old_size as u64;

        let position = self
            .file
            .stream_position()
            .map_err(|source| StoreError::IndexWrite {
                key,
                path: self.path.clone(),
                source,
            })?;

        let record = IndexEntry::tombstone(key).encode();
        if let Err(write) = self.file.write_all(&record) {
            return Err(match self.file.set_len(position) {
                Ok(()) => StoreError::IndexWrite {
                    key,
                    path: self.path.clone(),
                    source: write,
                },
                Err(truncate) => StoreError::IndexWriteRollback {
                    key,
                    path: self.path.clone(),
                    position,
                    write,
                    truncate,
                },
            });
        }

        self.metrics.deletion_count += 1;
        // The tombstone itself is an appended record, and its key must stay
        // below the allocator high-water mark after a replay.
        self.metrics.file_count += 1;
        if key > self.metrics.max_file_key {
            self.metrics.max_file_key = key;
        }
        Ok(())
    }

    /// Iterate the live entries in ascending key order
    ///
    /// Stops and propagates the first error the callback returns.
    pub fn visit(&self, visit: &mut dyn FnMut(NeedleValue) -> Result<()>) -> Result<()> {
        self.map.visit(visit)
    }

    /// Reserve `count` fresh keys, returning the start of the range
    ///
    /// Returns the current high-water mark and advances it by `count`
    /// (no-op returning 0 if `count == 0`). Plain read-then-bump: callers
    /// serialize this under the same lock as `put`/`delete`.
    pub fn next_file_key(&mut self, count: u64) -> u64 {
        if count == 0 {
            return 0;
        }
        let start = self.metrics.max_file_key;
        self.metrics.max_file_key += count;
        start
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Total bytes ever appended (including superseded records)
    pub fn content_size(&self) -> u64 {
        self.metrics.file_bytes
    }

    /// Total bytes displaced by overwrites and deletes
    pub fn deleted_size(&self) -> u64 {
        self.metrics.deleted_bytes
    }

    /// Total records ever appended
    pub fn file_count(&self) -> u64 {
        self.metrics.file_count
    }

    /// Total superseding/tombstoning events
    pub fn deleted_count(&self) -> u64 {
        self.metrics.deletion_count
    }

    /// Current key-allocation high-water mark
    pub fn max_file_key(&self) -> u64 {
        self.metrics.max_file_key
    }

    /// Snapshot of all cumulative counters
    pub fn metrics(&self) -> IndexMetrics {
        self.metrics
    }

    /// Number of live keys
    pub fn live_count(&self) -> usize {
        let mut count = 0;
        // Cheap: visit is pure in-memory iteration.
        let _ = self.map.visit(&mut |_| {
            count += 1;
            Ok(())
        });
        count
    }

    /// Fraction of appended bytes displaced by deletes/overwrites
    ///
    /// Used to decide whether compaction is worthwhile.
    pub fn garbage_ratio(&self) -> f64 {
        if self.metrics.file_bytes == 0 {
            return 0.0;
        }
        self.metrics.deleted_bytes as f64 / self.metrics.file_bytes as f64
    }

    /// Path of the index log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Compaction
    // =========================================================================

    /// Write a compacted copy of this index to `path`
    ///
    /// The output holds exactly the live key set, in ascending key order,
    /// and is fsynced before this returns. The live index is untouched; the
    /// replacement becomes visible only via
    /// [`commit_compaction`](Self::commit_compaction).
    pub fn write_compacted(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.visit(&mut |value| {
            writer.write_all(&IndexEntry::from(value).encode())?;
            Ok(())
        })?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Atomically replace this index with the compacted file at `path`
    ///
    /// Renames `path` over the live log and reopens. The fresh log has no
    /// history, so deletion counters restart at zero and `file_count`
    /// reflects exactly the compacted live set.
    pub fn commit_compaction(self, path: impl AsRef<Path>) -> Result<Self> {
        let live_path = self.path.clone();
        self.close();
        std::fs::rename(path.as_ref(), &live_path)?;
        Self::load(live_path)
    }

    /// Close the underlying log file handle
    ///
    /// Consumes the index; the handle is dropped after a best-effort sync.
    pub fn close(self) {
        let _ = self.file.sync_all();
    }
}
