//! Compact in-memory needle map
//!
//! Maps a 64-bit key to its (offset, size) record with low per-entry
//! overhead: entries live in contiguous sorted sections instead of one
//! node-per-entry hash map.
//!
//! ## Data Structure Choice
//! Sorted sections with binary search:
//! - 12 bytes of payload per entry, stored inline in a Vec
//! - O(log n) lookups, split-on-overflow keeps inserts cheap
//! - Ascending-key iteration for free (used by compaction)

use crate::error::Result;

use super::NeedleValue;

/// Capability needed by the needle index from its in-memory map
///
/// Any space-efficient map satisfies this; only these four operations and
/// their return contracts matter. `set` and `delete` return the size of the
/// record they displaced (0 if the key was absent) so the caller can keep
/// deletion accounting current.
pub trait NeedleValueMap: Send {
    /// Insert or overwrite; returns the previous size, 0 if none
    fn set(&mut self, key: u64, offset: u32, size: u32) -> u32;

    /// Look up a live entry
    fn get(&self, key: u64) -> Option<NeedleValue>;

    /// Remove; returns the removed size, 0 if the key was absent
    fn delete(&mut self, key: u64) -> u32;

    /// Iterate live entries in ascending key order, stopping on the first
    /// error the callback returns
    fn visit(&self, visit: &mut dyn FnMut(NeedleValue) -> Result<()>) -> Result<()>;
}

/// Max entries per section before it splits in two
const SECTION_CAPACITY: usize = 1024;

/// One sorted run of entries
#[derive(Debug, Default)]
struct Section {
    entries: Vec<NeedleValue>,
}

impl Section {
    fn first_key(&self) -> u64 {
        self.entries.first().map(|e| e.key).unwrap_or(0)
    }

    fn find(&self, key: u64) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by_key(&key, |e| e.key)
    }
}

/// Section-based compact map
///
/// Sections are kept sorted by their first key; within a section entries
/// are sorted by key. Not internally synchronized: the owning index is
/// guarded by the caller's lock.
#[derive(Debug, Default)]
pub struct CompactMap {
    sections: Vec<Section>,
    len: usize,
}

impl CompactMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the section whose key range covers `key`
    fn section_for(&self, key: u64) -> usize {
        let after = self
            .sections
            .partition_point(|s| s.first_key() <= key);
        after.saturating_sub(1)
    }

    fn split_if_full(&mut self, section: usize) {
        if self.sections[section].entries.len() < SECTION_CAPACITY {
            return;
        }
        let upper = self.sections[section]
            .entries
            .split_off(SECTION_CAPACITY / 2);
        self.sections
            .insert(section + 1, Section { entries: upper });
    }
}

impl NeedleValueMap for CompactMap {
    fn set(&mut self, key: u64, offset: u32, size: u32) -> u32 {
        let value = NeedleValue { key, offset, size };
        if self.sections.is_empty() {
            self.sections.push(Section::default());
        }
        let s = self.section_for(key);
        match self.sections[s].find(key) {
            Ok(i) => {
                let old = self.sections[s].entries[i].size;
                self.sections[s].entries[i] = value;
                old
            }
            Err(i) => {
                self.sections[s].entries.insert(i, value);
                self.len += 1;
                self.split_if_full(s);
                0
            }
        }
    }

    fn get(&self, key: u64) -> Option<NeedleValue> {
        if self.sections.is_empty() {
            return None;
        }
        let s = self.section_for(key);
        match self.sections[s].find(key) {
            Ok(i) => Some(self.sections[s].entries[i]),
            Err(_) => None,
        }
    }

    fn delete(&mut self, key: u64) -> u32 {
        if self.sections.is_empty() {
            return 0;
        }
        let s = self.section_for(key);
        match self.sections[s].find(key) {
            Ok(i) => {
                let old = self.sections[s].entries.remove(i).size;
                self.len -= 1;
                if self.sections[s].entries.is_empty() && self.sections.len() > 1 {
                    self.sections.remove(s);
                }
                old
            }
            Err(_) => 0,
        }
    }

    fn visit(&self, visit: &mut dyn FnMut(NeedleValue) -> Result<()>) -> Result<()> {
        for section in &self.sections {
            for entry in &section.entries {
                visit(*entry)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::collections::HashMap;

    #[test]
    fn set_returns_previous_size() {
        let mut map = CompactMap::new();
        assert_eq!(map.set(7, 10, 100), 0);
        assert_eq!(map.set(7, 20, 200), 100);
        assert_eq!(map.get(7), Some(NeedleValue { key: 7, offset: 20, size: 200 }));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn delete_returns_removed_size() {
        let mut map = CompactMap::new();
        map.set(1, 5, 50);
        assert_eq!(map.delete(1), 50);
        assert_eq!(map.delete(1), 0);
        assert_eq!(map.get(1), None);
        assert!(map.is_empty());
    }

    #[test]
    fn visit_yields_ascending_keys_and_stops_on_error() {
        let mut map = CompactMap::new();
        for key in [5u64, 1, 9, 3, 7] {
            map.set(key, 1, key as u32);
        }

        let mut seen = Vec::new();
        map.visit(&mut |v| {
            seen.push(v.key);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![1, 3, 5, 7, 9]);

        let mut visited = 0;
        let result = map.visit(&mut |v| {
            visited += 1;
            if v.key == 5 {
                Err(StoreError::NoWritableVolumes)
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(StoreError::NoWritableVolumes)));
        assert_eq!(visited, 3);
    }

    #[test]
    fn splits_sections_and_stays_consistent() {
        let mut map = CompactMap::new();
        // Enough inserts to force several splits, in a scattered order.
        for i in 0..5000u64 {
            let key = (i * 2654435761) % 10007;
            map.set(key, 1, (key + 1) as u32);
        }
        assert!(map.sections.len() > 1);
        for i in 0..5000u64 {
            let key = (i * 2654435761) % 10007;
            let got = map.get(key).unwrap();
            assert_eq!(got.size, (key + 1) as u32);
        }
    }

    #[test]
    fn matches_reference_map_under_mixed_ops() {
        let mut map = CompactMap::new();
        let mut model: HashMap<u64, u32> = HashMap::new();

        for i in 0..20_000u64 {
            let key = (i * 48271) % 997;
            if i % 3 == 0 {
                assert_eq!(map.delete(key), model.remove(&key).unwrap_or(0));
            } else {
                let size = (i % 1000 + 1) as u32;
                let prev = model.insert(key, size).unwrap_or(0);
                assert_eq!(map.set(key, 1, size), prev);
            }
        }

        assert_eq!(map.len(), model.len());
        for (&key, &size) in &model {
            assert_eq!(map.get(key).map(|v| v.size), Some(size));
        }
    }
}
