//! Error types for SegLog
//!
//! Provides a unified error type for all log operations.

use thiserror::Error;

/// Result type alias using LogError
pub type Result<T> = std::result::Result<T, LogError>;

/// Unified error type for SegLog operations
#[derive(Debug, Error)]
pub enum LogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    /// No segment covers the requested offset
    #[error("offset out of range: {offset}")]
    OffsetOutOfRange { offset: u64 },

    /// The index holds no entries yet
    #[error("index is empty")]
    IndexEmpty,

    /// The requested entry lies past the logical end of the index
    #[error("index entry {entry} out of bounds ({entries} entries)")]
    IndexOutOfBounds { entry: u64, entries: u64 },

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    /// The mapped index region has no room for another entry
    #[error("index full: capacity {capacity} bytes")]
    IndexFull { capacity: u64 },

    /// The offset cannot be expressed relative to the segment base
    #[error("segment {base_offset} cannot hold offset {offset}")]
    SegmentFull { base_offset: u64, offset: u64 },

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("{0} is closed")]
    Closed(String),

    #[error("log has no segments")]
    NoSegments,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
