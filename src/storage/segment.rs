//! Segment
//!
//! A store and an index sharing one base offset. The segment turns absolute
//! offsets into relative ones and reports when it should be rotated away
//! from.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::SegmentConfig;
use crate::encoding::{ENTRY_WIDTH, LEN_WIDTH};
use crate::error::{LogError, Result};
use crate::record::{Record, RecordCodec};

use super::{Index, Store};

/// One store/index pair covering `[base_offset, next_offset)`
pub struct Segment {
    store: Arc<Store>,
    index: Index,
    base_offset: u64,
    next_offset: u64,
    config: SegmentConfig,
    codec: Arc<dyn RecordCodec>,
}

impl Segment {
    /// Open or create the segment with `base_offset` inside `dir`
    ///
    /// On open:
    /// 1. Open/create `<base>.store` and `<base>.index`
    /// 2. Drop index entries that do not line up with the store
    /// 3. Drop store bytes past the last indexed frame
    /// 4. Derive `next_offset` from the last index entry
    pub fn open(
        dir: &Path,
        base_offset: u64,
        config: SegmentConfig,
        codec: Arc<dyn RecordCodec>,
    ) -> Result<Self> {
        let store = Store::open(&super::store_path(dir, base_offset))?;
        let mut index = Index::open(&super::index_path(dir, base_offset), config.max_index_bytes)?;

        let dropped = index.recover(store.size())?;
        if dropped > 0 {
            tracing::warn!(
                "Segment {}: dropped {} index entries not backed by the store",
                base_offset,
                dropped
            );
        }

        Self::trim_store(base_offset, &store, &mut index)?;

        let next_offset = match index.read(-1) {
            Ok((relative_offset, _)) => base_offset
                .checked_add(u64::from(relative_offset) + 1)
                .ok_or_else(|| {
                    LogError::Corruption(format!(
                        "segment {} holds relative offset {} past the offset space",
                        base_offset, relative_offset
                    ))
                })?,
            Err(LogError::IndexEmpty) => base_offset,
            Err(e) => return Err(e),
        };

        tracing::debug!(
            "Opened segment {} (next_offset={}, store={} bytes, index={} bytes)",
            base_offset,
            next_offset,
            store.size(),
            index.size()
        );

        Ok(Self {
            store: Arc::new(store),
            index,
            base_offset,
            next_offset,
            config,
            codec,
        })
    }

    /// Append a record, assigning it the next offset
    ///
    /// Returns the offset and the record as stored. If the index write fails
    /// the store is cut back to where the frame started.
    pub fn append(&mut self, record: Record) -> Result<(u64, Record)> {
        let offset = self.next_offset;
        let base_offset = self.base_offset;
        let full = || LogError::SegmentFull {
            base_offset,
            offset,
        };

        // The offset after this one must stay representable
        let next_offset = offset.checked_add(1).ok_or_else(full)?;
        let relative_offset = u32::try_from(offset - base_offset).map_err(|_| full())?;

        let record = record.with_offset(offset);
        let bytes = self.codec.encode(&record)?;

        let (_, position) = self.store.append(&bytes)?;

        if let Err(e) = self.index.write(relative_offset, position) {
            if let Err(rollback) = self.store.truncate(position) {
                tracing::warn!(
                    "Segment {}: failed to roll back store to {}: {}",
                    self.base_offset,
                    position,
                    rollback
                );
            }
            return Err(e);
        }

        self.next_offset = next_offset;
        Ok((offset, record))
    }

    /// Read the record at absolute `offset`
    pub fn read(&self, offset: u64) -> Result<Record> {
        if !self.contains(offset) {
            return Err(LogError::OffsetOutOfRange { offset });
        }

        let relative_offset = (offset - self.base_offset) as i64;
        let (_, position) = self.index.read(relative_offset)?;
        let bytes = self.store.read(position)?;

        self.codec.decode(&bytes)
    }

    /// Whether the segment should stop taking appends
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes
            || self.index.size() + ENTRY_WIDTH > self.config.max_index_bytes
            || self.next_offset - self.base_offset > u64::from(u32::MAX)
    }

    /// Whether `offset` falls inside `[base_offset, next_offset)`
    pub fn contains(&self, offset: u64) -> bool {
        self.base_offset <= offset && offset < self.next_offset
    }

    /// Close the index, then the store
    pub fn close(&mut self) -> Result<()> {
        self.index.close()?;
        self.store.close()
    }

    /// Close the segment and delete both files
    pub fn remove(&mut self) -> Result<()> {
        self.close()?;
        fs::remove_file(self.index.path())?;
        fs::remove_file(self.store.path())?;
        tracing::debug!("Removed segment {}", self.base_offset);
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Lowest offset this segment is responsible for
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Offset the next appended record will get
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Logical store size in bytes
    pub fn store_size(&self) -> u64 {
        self.store.size()
    }

    /// Logical index size in bytes
    pub fn index_size(&self) -> u64 {
        self.index.size()
    }

    /// Shared handle to the store (for raw streaming)
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Make the last index entry point at a complete frame and cut the store
    /// right after it
    fn trim_store(base_offset: u64, store: &Store, index: &mut Index) -> Result<()> {
        let end = loop {
            let (_, position) = match index.read(-1) {
                Ok(entry) => entry,
                Err(LogError::IndexEmpty) => break 0,
                Err(e) => return Err(e),
            };

            match store.read(position) {
                Ok(payload) => break position + LEN_WIDTH + payload.len() as u64,
                Err(LogError::Corruption(reason)) => {
                    tracing::warn!(
                        "Segment {}: dropping index entry for incomplete frame: {}",
                        base_offset,
                        reason
                    );
                    index.truncate(index.entries() - 1);
                }
                Err(e) => return Err(e),
            }
        };

        let size = store.size();
        if size > end {
            tracing::warn!(
                "Segment {}: truncating {} unindexed store bytes",
                base_offset,
                size - end
            );
            store.truncate(end)?;
        }

        Ok(())
    }
}
