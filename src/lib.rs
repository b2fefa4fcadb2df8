//! # needlestore
//!
//! Storage core for a distributed blob store:
//! - Persistent needle index (append-only index log + compact in-memory map)
//! - Crash recovery by log replay with torn-write truncation
//! - Volume replica placement (location tracking + writable-volume selection)
//! - Multipart upload client for pushing needle bytes to data nodes
//!
//! ## Architecture Overview
//!
//! ```text
//!            data node                          master
//! ┌───────────────────────────┐   ┌────────────────────────────────┐
//! │        NeedleIndex        │   │         LayoutRegistry         │
//! │  ┌──────────┬──────────┐  │   │  ┌──────────────────────────┐  │
//! │  │CompactMap│ index log│  │   │  │ VolumeLayout (per class) │  │
//! │  │ (memory) │ (append) │  │   │  │  vid → VolumeLocationList│  │
//! │  └──────────┴──────────┘  │   │  │  writables: [vid, ...]   │  │
//! └───────────────────────────┘   │  └──────────────────────────┘  │
//!                                 └────────────────────────────────┘
//! ```
//!
//! A data node replays its on-disk index log into a [`NeedleIndex`] at
//! startup and reports its volume set to the master. The master's
//! [`VolumeLayout`] records which node holds which volume and, for each
//! write-placement request, picks one writable volume at random and returns
//! its location list. The caller then uses [`upload`] to push bytes to
//! those nodes.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod index;
pub mod topology;
pub mod upload;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::Config;
pub use index::{CompactMap, NeedleIndex, NeedleValue, NeedleValueMap};
pub use topology::{
    DataNode, LayoutRegistry, ReplicationClass, VolumeId, VolumeInfo, VolumeLayout,
    VolumeLocationList,
};
pub use upload::{upload, UploadResult};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of needlestore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
