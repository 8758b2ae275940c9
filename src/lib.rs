//! # SegLog
//!
//! A segmented, append-only commit log with:
//! - Length-prefixed record stores with buffered writes
//! - Memory-mapped, fixed-width offset indexes
//! - Segment rotation on size limits
//! - Whole-segment retention and crash-consistent reopen
//! - Raw streaming of every segment for snapshot/restore
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                            Log                               │
//! │        (RwLock over segments, last one is active)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────────┐
//!          ▼            ▼                     ▼
//!   ┌─────────────┐ ┌─────────────┐   ┌─────────────┐
//!   │ Segment 0   │ │ Segment 42  │...│ Segment N   │
//!   └──────┬──────┘ └─────────────┘   └─────────────┘
//!          │
//!    ┌─────┴──────┐
//!    ▼            ▼
//! ┌────────┐  ┌────────┐
//! │ Store  │  │ Index  │
//! │(frames)│  │ (mmap) │
//! └────────┘  └────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod encoding;
pub mod record;
pub mod storage;
pub mod reader;
pub mod log;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LogError, Result};
pub use config::{Config, SegmentConfig};
pub use log::Log;
pub use reader::LogReader;
pub use record::{BincodeCodec, Record, RecordCodec};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SegLog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
