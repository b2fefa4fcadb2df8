//! Error types for needlestore
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::topology::VolumeId;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for needlestore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("index write failed for key {key} in {}: {source}", path.display())]
    IndexWrite {
        key: u64,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "index write failed for key {key} in {}: {write}; \
         truncating back to {position} also failed: {truncate}",
        path.display()
    )]
    IndexWriteRollback {
        key: u64,
        path: PathBuf,
        position: u64,
        write: std::io::Error,
        truncate: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Placement Errors
    // -------------------------------------------------------------------------
    #[error("no writable volumes")]
    NoWritableVolumes,

    #[error("volume {0} has no known locations")]
    MissingLocations(VolumeId),

    #[error("invalid replication class: {0}")]
    InvalidReplication(String),

    // -------------------------------------------------------------------------
    // Upload Errors
    // -------------------------------------------------------------------------
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload rejected by server: {0}")]
    UploadRejected(String),
}
