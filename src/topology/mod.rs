//! Topology Module
//!
//! Master-side placement state: which data nodes hold which volume
//! replicas, and which volumes may accept new writes.
//!
//! ## Responsibilities
//! - Track an ordered, deduplicated location list per volume
//! - Maintain the writable set as a materialized view of membership,
//!   capacity, and replication-count events
//! - Pick a writable volume uniformly at random for each write placement
//! - Group layouts per replication class behind one lock

mod layout;
mod location_list;
mod registry;

pub use layout::{LayoutSnapshot, VolumeLayout};
pub use location_list::{DataNode, VolumeLocationList};
pub use registry::LayoutRegistry;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// =============================================================================
// Volume Identity
// =============================================================================

/// Identifier of one volume (a large append-only data file)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeId(pub u32);

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VolumeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(VolumeId)
    }
}

// =============================================================================
// Data Format Version
// =============================================================================

/// Version of the on-disk volume data format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub u8);

/// Data format version volumes must be at to accept writes
pub const CURRENT_VERSION: Version = Version(2);

// =============================================================================
// Replication Class
// =============================================================================

/// Replication policy naming how many copies a volume keeps and where
///
/// The three digits mean: copies on other datacenters, copies on other
/// racks in the same datacenter, copies on other servers in the same rack.
/// Only the total copy count matters to placement here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicationClass {
    /// Single copy
    Copy000,
    /// Two copies, same rack
    Copy001,
    /// Two copies, different racks
    Copy010,
    /// Two copies, different datacenters
    Copy100,
    /// Three copies: two racks in one datacenter plus another datacenter
    Copy110,
    /// Three copies, three datacenters
    Copy200,
}

impl ReplicationClass {
    /// Number of node copies this class requires
    pub fn copy_count(&self) -> usize {
        match self {
            ReplicationClass::Copy000 => 1,
            ReplicationClass::Copy001
            | ReplicationClass::Copy010
            | ReplicationClass::Copy100 => 2,
            ReplicationClass::Copy110 | ReplicationClass::Copy200 => 3,
        }
    }
}

impl fmt::Display for ReplicationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReplicationClass::Copy000 => "000",
            ReplicationClass::Copy001 => "001",
            ReplicationClass::Copy010 => "010",
            ReplicationClass::Copy100 => "100",
            ReplicationClass::Copy110 => "110",
            ReplicationClass::Copy200 => "200",
        };
        f.write_str(s)
    }
}

impl FromStr for ReplicationClass {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "000" => Ok(ReplicationClass::Copy000),
            "001" => Ok(ReplicationClass::Copy001),
            "010" => Ok(ReplicationClass::Copy010),
            "100" => Ok(ReplicationClass::Copy100),
            "110" => Ok(ReplicationClass::Copy110),
            "200" => Ok(ReplicationClass::Copy200),
            other => Err(StoreError::InvalidReplication(other.to_string())),
        }
    }
}

// =============================================================================
// Volume Info
// =============================================================================

/// One node's view of one volume, as reported over heartbeats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub id: VolumeId,
    pub size: u64,
    pub replication: ReplicationClass,
    pub version: Version,
    pub read_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replication_class_copy_counts() {
        assert_eq!(ReplicationClass::Copy000.copy_count(), 1);
        assert_eq!(ReplicationClass::Copy001.copy_count(), 2);
        assert_eq!(ReplicationClass::Copy010.copy_count(), 2);
        assert_eq!(ReplicationClass::Copy100.copy_count(), 2);
        assert_eq!(ReplicationClass::Copy110.copy_count(), 3);
        assert_eq!(ReplicationClass::Copy200.copy_count(), 3);
    }

    #[test]
    fn replication_class_parse_round_trip() {
        for s in ["000", "001", "010", "100", "110", "200"] {
            let class: ReplicationClass = s.parse().unwrap();
            assert_eq!(class.to_string(), s);
        }
        assert!("abc".parse::<ReplicationClass>().is_err());
    }

    #[test]
    fn volume_id_parse_and_display() {
        let vid: VolumeId = "37".parse().unwrap();
        assert_eq!(vid, VolumeId(37));
        assert_eq!(vid.to_string(), "37");
    }
}
