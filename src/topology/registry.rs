//! Layout registry
//!
//! Groups one [`VolumeLayout`] per replication class behind a single
//! read-write lock. Layout mutations are check-then-act sequences over the
//! {location list, writable set} pair, so every event handler takes the
//! write lock; `lookup` and `pick_for_write` take the read lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::Result;

use super::layout::{LayoutSnapshot, VolumeLayout};
use super::location_list::{DataNode, VolumeLocationList};
use super::{ReplicationClass, VolumeId, VolumeInfo};

/// Thread-safe registry of per-class volume layouts
///
/// ## Concurrency:
/// - `layouts`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - All methods use `&self`
pub struct LayoutRegistry {
    volume_size_limit: u64,
    pulse_seconds: u64,
    layouts: RwLock<HashMap<ReplicationClass, VolumeLayout>>,
}

impl LayoutRegistry {
    pub fn new(volume_size_limit: u64, pulse_seconds: u64) -> Self {
        Self {
            volume_size_limit,
            pulse_seconds,
            layouts: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.volume_size_limit, config.pulse_seconds)
    }

    /// Record a volume report from `node` under the volume's own class
    pub fn register_volume(&self, info: &VolumeInfo, node: Arc<DataNode>) {
        let mut layouts = self.layouts.write();
        let layout = layouts.entry(info.replication).or_insert_with(|| {
            VolumeLayout::new(info.replication, self.volume_size_limit, self.pulse_seconds)
        });
        layout.register_volume(info, node);
    }

    /// Clone of the location list for `vid`, if known to `replication`
    pub fn lookup(&self, replication: ReplicationClass, vid: VolumeId) -> Option<VolumeLocationList> {
        self.layouts
            .read()
            .get(&replication)
            .and_then(|layout| layout.lookup(vid).cloned())
    }

    /// Pick a writable volume of the given class
    pub fn pick_for_write(
        &self,
        replication: ReplicationClass,
        count: u64,
    ) -> Result<(VolumeId, u64, VolumeLocationList)> {
        let layouts = self.layouts.read();
        let layout = layouts
            .get(&replication)
            .ok_or(crate::error::StoreError::NoWritableVolumes)?;
        let (vid, count, list) = layout.pick_for_write(count)?;
        Ok((vid, count, list.clone()))
    }

    pub fn set_volume_available(
        &self,
        replication: ReplicationClass,
        node: Arc<DataNode>,
        vid: VolumeId,
    ) -> bool {
        self.layouts
            .write()
            .get_mut(&replication)
            .map(|layout| layout.set_volume_available(node, vid))
            .unwrap_or(false)
    }

    pub fn set_volume_unavailable(
        &self,
        replication: ReplicationClass,
        node_id: &str,
        vid: VolumeId,
    ) -> bool {
        self.layouts
            .write()
            .get_mut(&replication)
            .map(|layout| layout.set_volume_unavailable(node_id, vid))
            .unwrap_or(false)
    }

    pub fn set_volume_capacity_full(&self, replication: ReplicationClass, vid: VolumeId) -> bool {
        self.layouts
            .write()
            .get_mut(&replication)
            .map(|layout| layout.set_volume_capacity_full(vid))
            .unwrap_or(false)
    }

    /// Writable volumes across all classes
    pub fn active_volume_count(&self) -> usize {
        self.layouts
            .read()
            .values()
            .map(|layout| layout.active_volume_count())
            .sum()
    }

    /// Reporting snapshots for every known class
    pub fn snapshots(&self) -> Vec<LayoutSnapshot> {
        self.layouts
            .read()
            .values()
            .map(|layout| layout.snapshot())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::CURRENT_VERSION;
    use super::*;

    fn info(vid: u32, replication: ReplicationClass) -> VolumeInfo {
        VolumeInfo {
            id: VolumeId(vid),
            size: 100,
            replication,
            version: CURRENT_VERSION,
            read_only: false,
        }
    }

    #[test]
    fn registry_routes_by_replication_class() {
        let registry = LayoutRegistry::new(1000, 5);

        registry.register_volume(&info(1, ReplicationClass::Copy000), DataNode::new("a", "http://a:8080"));
        registry.register_volume(&info(2, ReplicationClass::Copy001), DataNode::new("a", "http://a:8080"));
        registry.register_volume(&info(2, ReplicationClass::Copy001), DataNode::new("b", "http://b:8080"));

        assert_eq!(registry.active_volume_count(), 2);
        assert!(registry.lookup(ReplicationClass::Copy000, VolumeId(1)).is_some());
        assert!(registry.lookup(ReplicationClass::Copy000, VolumeId(2)).is_none());

        let (vid, count, list) = registry.pick_for_write(ReplicationClass::Copy001, 3).unwrap();
        assert_eq!(vid, VolumeId(2));
        assert_eq!(count, 3);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn concurrent_registration_is_safe() {
        let registry = std::sync::Arc::new(LayoutRegistry::new(1000, 5));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = std::sync::Arc::clone(&registry);
                std::thread::spawn(move || {
                    let node = DataNode::new(format!("node-{i}"), format!("http://n{i}:8080"));
                    for vid in 0..50u32 {
                        registry.register_volume(&info(vid, ReplicationClass::Copy001), node.clone());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Every volume saw 8 distinct nodes and crossed the 2-copy threshold once.
        assert_eq!(registry.active_volume_count(), 50);
        let list = registry.lookup(ReplicationClass::Copy001, VolumeId(0)).unwrap();
        assert_eq!(list.len(), 8);
    }
}
