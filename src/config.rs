//! Configuration for SegLog
//!
//! Centralized configuration with sensible defaults.

use crate::encoding::ENTRY_WIDTH;
use crate::error::{LogError, Result};

/// Size limit applied when a segment limit is left at zero
pub const DEFAULT_SEGMENT_BYTES: u64 = 1024;

/// Main configuration for a log instance
///
/// The directory is passed to `Log::open` separately. On disk it holds one
/// file pair per segment:
///   {dir}/
///     ├── 0.store
///     ├── 0.index
///     ├── 42.store
///     └── 42.index
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Per-segment limits and the starting offset
    pub segment: SegmentConfig,
}

/// Segment sizing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Rotate once the store file reaches this many bytes
    pub max_store_bytes: u64,

    /// Rotate once another index entry would exceed this many bytes.
    /// Also the size each index file is pre-allocated to.
    pub max_index_bytes: u64,

    /// Offset assigned to the first record of a brand-new log
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: DEFAULT_SEGMENT_BYTES,
            max_index_bytes: DEFAULT_SEGMENT_BYTES,
            initial_offset: 0,
        }
    }
}

impl SegmentConfig {
    /// Replace zero limits with the defaults and check the rest
    pub(crate) fn normalized(mut self) -> Result<Self> {
        if self.max_store_bytes == 0 {
            self.max_store_bytes = DEFAULT_SEGMENT_BYTES;
        }
        if self.max_index_bytes == 0 {
            self.max_index_bytes = DEFAULT_SEGMENT_BYTES;
        }
        if self.max_index_bytes < ENTRY_WIDTH {
            return Err(LogError::Config(format!(
                "max_index_bytes must hold at least one {}-byte entry, got {}",
                ENTRY_WIDTH, self.max_index_bytes
            )));
        }
        if self.initial_offset == u64::MAX {
            return Err(LogError::Config(format!(
                "initial_offset {} leaves no offset to assign",
                self.initial_offset
            )));
        }
        if usize::try_from(self.max_index_bytes).is_err() {
            return Err(LogError::Config(format!(
                "max_index_bytes {} cannot be mapped on this platform",
                self.max_index_bytes
            )));
        }
        Ok(self)
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
    /// Set the store size limit (in bytes)
    pub fn max_store_bytes(mut self, bytes: u64) -> Self {
        self.config.segment.max_store_bytes = bytes;
        self
    }

    /// Set the index size limit (in bytes)
    pub fn max_index_bytes(mut self, bytes: u64) -> Self {
        self.config.segment.max_index_bytes = bytes;
        self
    }

    /// Set the offset of the first record in a new log
    pub fn initial_offset(mut self, offset: u64) -> Self {
        self.config.segment.initial_offset = offset;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
