//! Configuration for needlestore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a needlestore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for volume data and index files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── {vid}.dat        (volume data file, managed externally)
    ///     └── {vid}.idx        (needle index log)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Placement Configuration
    // -------------------------------------------------------------------------
    /// Max size of a volume before it stops accepting writes (in bytes)
    pub volume_size_limit: u64,

    /// Heartbeat interval data nodes report on (in seconds)
    pub pulse_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./needlestore_data"),
            volume_size_limit: 32 * 1024 * 1024 * 1024, // 32 GiB
            pulse_seconds: 5,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for volume and index files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the volume size limit (in bytes)
    pub fn volume_size_limit(mut self, bytes: u64) -> Self {
        self.config.volume_size_limit = bytes;
        self
    }

    /// Set the heartbeat interval (in seconds)
    pub fn pulse_seconds(mut self, seconds: u64) -> Self {
        self.config.pulse_seconds = seconds;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
