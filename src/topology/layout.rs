//! Volume layout
//!
//! Per-replication-class registry of volume locations plus the set of
//! volume ids currently accepting writes.
//!
//! ## Design
//! The writable set is a materialized view, adjusted incrementally on every
//! membership or capacity event instead of being scanned on demand:
//! `pick_for_write` is the hottest call and stays a single random index
//! into a vec. Replica thresholds compare with `>=`/`<` rather than
//! equality because a location list may transiently exceed the required
//! copy count during replica reconciliation.
//!
//! Not internally synchronized; mutators take `&mut self` and shared
//! instances belong behind a caller lock (see [`LayoutRegistry`]).
//!
//! [`LayoutRegistry`]: super::LayoutRegistry

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, StoreError};

use super::location_list::{DataNode, VolumeLocationList};
use super::{ReplicationClass, VolumeId, VolumeInfo, CURRENT_VERSION};

/// Placement state for all volumes of one replication class
#[derive(Debug)]
pub struct VolumeLayout {
    replication: ReplicationClass,
    locations: HashMap<VolumeId, VolumeLocationList>,
    /// Materialized view: ids currently eligible for new writes
    writable: Vec<VolumeId>,
    volume_size_limit: u64,
    pulse_seconds: u64,
}

/// Reporting view of a layout: replication class and writable ids only
///
/// Location details are intentionally omitted.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutSnapshot {
    pub replication: String,
    pub writables: Vec<VolumeId>,
}

impl VolumeLayout {
    pub fn new(replication: ReplicationClass, volume_size_limit: u64, pulse_seconds: u64) -> Self {
        Self {
            replication,
            locations: HashMap::new(),
            writable: Vec::new(),
            volume_size_limit,
            pulse_seconds,
        }
    }

    /// Replication class this layout serves
    pub fn replication(&self) -> ReplicationClass {
        self.replication
    }

    /// Heartbeat interval the layout was configured with
    pub fn pulse_seconds(&self) -> u64 {
        self.pulse_seconds
    }

    // =========================================================================
    // Membership & Capacity Events
    // =========================================================================

    /// Record that `node` holds a replica of the reported volume
    ///
    /// If this is a genuinely new membership that brings the replica count
    /// up to the class's copy count, and the reporter's view of the volume
    /// passes the writability predicate, the volume joins the writable set.
    pub fn register_volume(&mut self, info: &VolumeInfo, node: Arc<DataNode>) {
        let list = self.locations.entry(info.id).or_default();
        if list.add(node) && list.len() == self.replication.copy_count() && self.is_writable(info) {
            self.add_to_writable(info.id);
        }
    }

    /// Writability predicate, evaluated on the reporting node's view
    ///
    /// The layout trusts the reporter; nothing is recomputed centrally.
    fn is_writable(&self, info: &VolumeInfo) -> bool {
        info.size < self.volume_size_limit && info.version == CURRENT_VERSION && !info.read_only
    }

    /// A node rejoined with a replica of `vid`
    ///
    /// Returns whether the writable set changed.
    pub fn set_volume_available(&mut self, node: Arc<DataNode>, vid: VolumeId) -> bool {
        let list = self.locations.entry(vid).or_default();
        if list.add(node) && list.len() >= self.replication.copy_count() {
            return self.add_to_writable(vid);
        }
        false
    }

    /// A node holding `vid` went away
    ///
    /// Returns whether the writable set changed. Dropping below the class's
    /// copy count removes the volume from the writable set immediately.
    pub fn set_volume_unavailable(&mut self, node_id: &str, vid: VolumeId) -> bool {
        let Some(list) = self.locations.get_mut(&vid) else {
            return false;
        };
        if list.remove(node_id) && list.len() < self.replication.copy_count() {
            info!(
                volume = %vid,
                replicas = list.len(),
                required = self.replication.copy_count(),
                "volume under-replicated"
            );
            return self.remove_from_writable(vid);
        }
        false
    }

    /// A volume crossed its size limit (reported out-of-band)
    pub fn set_volume_capacity_full(&mut self, vid: VolumeId) -> bool {
        self.remove_from_writable(vid)
    }

    fn add_to_writable(&mut self, vid: VolumeId) -> bool {
        if self.writable.contains(&vid) {
            return false;
        }
        info!(volume = %vid, "volume becomes writable");
        self.writable.push(vid);
        true
    }

    fn remove_from_writable(&mut self, vid: VolumeId) -> bool {
        if let Some(i) = self.writable.iter().position(|&v| v == vid) {
            info!(volume = %vid, "volume becomes unwritable");
            self.writable.remove(i);
            return true;
        }
        false
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Nodes currently holding `vid`, if any are known
    pub fn lookup(&self, vid: VolumeId) -> Option<&VolumeLocationList> {
        self.locations.get(&vid)
    }

    /// Pick one writable volume uniformly at random
    ///
    /// `count` passes through unchanged: it is how many needles the caller
    /// intends to write in this batch. Fails with
    /// [`StoreError::NoWritableVolumes`] when the writable set is empty
    /// (expected when the cluster is full), and with
    /// [`StoreError::MissingLocations`] if the chosen id has no location
    /// list, which should never happen and is checked defensively.
    pub fn pick_for_write(&self, count: u64) -> Result<(VolumeId, u64, &VolumeLocationList)> {
        if self.writable.is_empty() {
            warn!("no more writable volumes");
            return Err(StoreError::NoWritableVolumes);
        }
        let vid = self.writable[rand::thread_rng().gen_range(0..self.writable.len())];
        let list = self
            .locations
            .get(&vid)
            .ok_or(StoreError::MissingLocations(vid))?;
        Ok((vid, count, list))
    }

    /// Size of the writable set
    pub fn active_volume_count(&self) -> usize {
        self.writable.len()
    }

    /// Reporting snapshot: replication class and writable ids
    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            replication: self.replication.to_string(),
            writables: self.writable.clone(),
        }
    }
}
