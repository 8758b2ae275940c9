//! Storage Module
//!
//! On-disk building blocks of the log: stores, indexes and the segments that
//! pair them.
//!
//! ## Responsibilities
//! - Persist records as length-prefixed frames
//! - Map relative offsets to store positions in O(1)
//! - Recover a consistent store/index pair on reopen
//! - Decide when a segment is full
//!
//! ## File Format
//! ```text
//! <base>.store
//! ┌──────────────────┬──────────────────────────────┐
//! │ Length (8, BE)   │ Encoded record (Length bytes) │
//! └──────────────────┴──────────────────────────────┘
//! ... repeated for each record ...
//!
//! <base>.index (pre-allocated while open, trimmed on close)
//! ┌──────────────────────────┬──────────────────────┐
//! │ Relative offset (4, BE)  │ Store position (8, BE)│
//! └──────────────────────────┴──────────────────────┘
//! ... repeated for each record ...
//! ```

mod index;
mod segment;
mod store;

use std::path::{Path, PathBuf};

pub use index::Index;
pub use segment::Segment;
pub use store::Store;

/// Extension of store files
pub const STORE_EXTENSION: &str = "store";

/// Extension of index files
pub const INDEX_EXTENSION: &str = "index";

/// Path of the store file for the segment at `base_offset`
pub fn store_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(format!("{}.{}", base_offset, STORE_EXTENSION))
}

/// Path of the index file for the segment at `base_offset`
pub fn index_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(format!("{}.{}", base_offset, INDEX_EXTENSION))
}

/// Parse a segment base offset from a file name
/// "42.store" → Some(42), "42.index" → Some(42), "notes.txt" → None
pub fn parse_base_offset(path: &Path) -> Option<u64> {
    let extension = path.extension()?.to_str()?;
    if extension != STORE_EXTENSION && extension != INDEX_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}
