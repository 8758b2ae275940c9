//! Log Module
//!
//! The segmented log that coordinates all segments.
//!
//! ## Responsibilities
//! - Rediscover segments from the directory on startup
//! - Route appends to the active segment, rotating when it is full
//! - Route reads to the segment owning the offset
//! - Retention by removing whole segments below an offset
//! - Raw streaming of every store for snapshots, and rebuilding from one

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{Config, SegmentConfig};
use crate::error::{LogError, Result};
use crate::reader::{read_frame, LogReader, StoreReader};
use crate::record::{BincodeCodec, Record, RecordCodec};
use crate::storage::{index_path, parse_base_offset, store_path, Segment};

/// A segmented, append-only log
///
/// ## Concurrency Model
///
/// One reader/writer lock over the segment list:
/// - **Exclusive**: append, truncate, close, remove, reset, restore and
///   highest_offset (it races with rotation otherwise)
/// - **Shared**: read, lowest_offset, reader, segment_count
///
/// Each store additionally serializes its own file access. Indexes rely on
/// this lock alone.
pub struct Log {
    /// Directory holding the segment files
    dir: PathBuf,

    /// Configuration with zero limits already replaced by defaults
    config: Config,

    /// Record encoding shared by every segment
    codec: Arc<dyn RecordCodec>,

    /// Segments ordered by base offset; the last one is active
    segments: RwLock<Vec<Segment>>,
}

impl Log {
    /// Open or create a log in `dir` using the bincode record codec
    pub fn open(dir: impl AsRef<Path>, config: Config) -> Result<Self> {
        Self::with_codec(dir, config, Arc::new(BincodeCodec))
    }

    /// Open or create a log in `dir` with a custom record codec
    ///
    /// On startup:
    /// 1. Replace zero segment limits with defaults
    /// 2. Create the directory if it doesn't exist
    /// 3. Open one segment per base offset found on disk
    /// 4. Start a fresh segment at `initial_offset` if none were found
    pub fn with_codec(
        dir: impl AsRef<Path>,
        mut config: Config,
        codec: Arc<dyn RecordCodec>,
    ) -> Result<Self> {
        config.segment = config.segment.normalized()?;

        let log = Self {
            dir: dir.as_ref().to_path_buf(),
            config,
            codec,
            segments: RwLock::new(Vec::new()),
        };

        {
            let mut segments = log.segments.write();
            *segments = log.setup(log.config.segment.initial_offset)?;

            tracing::info!(
                "Opened log {} with {} segment(s), offsets {}..{}",
                log.dir.display(),
                segments.len(),
                segments.first().map(Segment::base_offset).unwrap_or_default(),
                segments.last().map(Segment::next_offset).unwrap_or_default(),
            );
        }

        Ok(log)
    }

    /// Append a record
    ///
    /// Rotates to a new segment first if the active one is full. Returns the
    /// assigned offset and the record as stored.
    pub fn append(&self, record: Record) -> Result<(u64, Record)> {
        let mut segments = self.segments.write();
        self.append_locked(&mut segments, record)
    }

    /// Read the record at `offset`
    pub fn read(&self, offset: u64) -> Result<Record> {
        let segments = self.segments.read();

        segments
            .iter()
            .find(|s| s.contains(offset))
            .ok_or(LogError::OffsetOutOfRange { offset })?
            .read(offset)
    }

    /// Base offset of the oldest segment
    pub fn lowest_offset(&self) -> Result<u64> {
        let segments = self.segments.read();
        segments
            .first()
            .map(Segment::base_offset)
            .ok_or(LogError::NoSegments)
    }

    /// Offset of the newest record, or 0 for an empty log
    pub fn highest_offset(&self) -> Result<u64> {
        let segments = self.segments.write();
        let next_offset = segments
            .last()
            .map(Segment::next_offset)
            .ok_or(LogError::NoSegments)?;
        Ok(next_offset.saturating_sub(1))
    }

    /// Remove every segment whose records all sit at or below `lowest`
    ///
    /// A segment is kept if any of its offsets is above `lowest`. If nothing
    /// would be kept, a fresh segment starts at `lowest + 1`. Fails with
    /// `OffsetOutOfRange` without removing anything when no offset above
    /// `lowest` could ever be assigned.
    pub fn truncate(&self, lowest: u64) -> Result<()> {
        let threshold = match lowest.checked_add(1) {
            Some(threshold) if threshold < u64::MAX => threshold,
            _ => return Err(LogError::OffsetOutOfRange { offset: lowest }),
        };

        let mut segments = self.segments.write();

        let mut kept = Vec::with_capacity(segments.len());
        let mut removed = 0;
        let mut remaining = std::mem::take(&mut *segments).into_iter();

        while let Some(mut segment) = remaining.next() {
            if segment.next_offset() > threshold {
                kept.push(segment);
                continue;
            }

            if let Err(e) = segment.remove() {
                kept.push(segment);
                kept.extend(remaining);
                *segments = kept;
                return Err(e);
            }
            removed += 1;
        }

        if kept.is_empty() {
            tracing::debug!("Truncate emptied log, starting new segment at {}", threshold);
            kept.push(self.new_segment(threshold)?);
        }

        *segments = kept;

        tracing::info!(
            "Truncated log {} below {}: removed {} segment(s), {} left",
            self.dir.display(),
            threshold,
            removed,
            segments.len()
        );

        Ok(())
    }

    /// Stream the raw store bytes of every segment, oldest first
    pub fn reader(&self) -> LogReader {
        let segments = self.segments.read();
        let readers = segments
            .iter()
            .map(|s| StoreReader::new(Arc::clone(s.store())))
            .collect();
        LogReader::new(readers)
    }

    /// Replace the log contents with the records in a `reader()` stream
    ///
    /// The whole stream is decoded and checked before anything is touched:
    /// offsets must be contiguous, and a truncated or undecodable frame fails
    /// with the log left as it was. The log is then reset to start at the
    /// first record's offset. An empty stream leaves the log untouched.
    /// Returns the number of records restored.
    pub fn restore<R: Read>(&self, mut reader: R) -> Result<u64> {
        let mut records: Vec<Record> = Vec::new();

        while let Some(bytes) = read_frame(&mut reader)? {
            let record = self.codec.decode(&bytes)?;

            if record.offset == u64::MAX {
                return Err(LogError::Corruption(format!(
                    "snapshot record {} carries unassignable offset {}",
                    records.len(),
                    record.offset
                )));
            }
            if let Some(previous) = records.last() {
                if record.offset != previous.offset + 1 {
                    return Err(LogError::Corruption(format!(
                        "snapshot record {} carries offset {}, expected {}",
                        records.len(),
                        record.offset,
                        previous.offset + 1
                    )));
                }
            }

            records.push(record);
        }

        let first_offset = match records.first() {
            Some(record) => record.offset,
            None => {
                tracing::info!("Empty snapshot, log {} left as is", self.dir.display());
                return Ok(0);
            }
        };

        let mut segments = self.segments.write();
        self.reset_locked(&mut segments, first_offset)?;

        let restored = records.len() as u64;
        for record in records {
            self.append_locked(&mut segments, record)?;
        }

        tracing::info!("Restored {} record(s) into {}", restored, self.dir.display());
        Ok(restored)
    }

    /// Close every segment
    pub fn close(&self) -> Result<()> {
        let mut segments = self.segments.write();
        Self::close_locked(&mut segments)
    }

    /// Close the log and delete its directory
    pub fn remove(&self) -> Result<()> {
        let mut segments = self.segments.write();
        self.remove_locked(&mut segments)
    }

    /// Remove the log and start over with a single fresh segment
    pub fn reset(&self) -> Result<()> {
        let mut segments = self.segments.write();
        self.reset_locked(&mut segments, self.config.segment.initial_offset)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Directory holding the segment files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Effective configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of segments
    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    // =========================================================================
    // Private Helpers (called with the lock held)
    // =========================================================================

    /// Open one segment per distinct base offset in the directory
    fn setup(&self, initial_offset: u64) -> Result<Vec<Segment>> {
        fs::create_dir_all(&self.dir)?;

        // Each segment contributes a .store and an .index with the same base
        let mut base_offsets = BTreeSet::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            match parse_base_offset(&path) {
                Some(base_offset) => {
                    base_offsets.insert(base_offset);
                }
                None => tracing::debug!("Skipping unrecognized file {}", path.display()),
            }
        }

        for &base_offset in &base_offsets {
            let store = store_path(&self.dir, base_offset);
            let index = index_path(&self.dir, base_offset);
            match (store.is_file(), index.is_file()) {
                (true, false) => tracing::warn!(
                    "Segment {}: index missing, its store bytes will be dropped",
                    base_offset
                ),
                (false, true) => tracing::warn!(
                    "Segment {}: store missing, its index entries will be dropped",
                    base_offset
                ),
                _ => {}
            }
        }

        let mut segments = base_offsets
            .into_iter()
            .map(|base_offset| self.new_segment(base_offset))
            .collect::<Result<Vec<_>>>()?;

        if segments.is_empty() {
            segments.push(self.new_segment(initial_offset)?);
        }

        Ok(segments)
    }

    fn new_segment(&self, base_offset: u64) -> Result<Segment> {
        Segment::open(
            &self.dir,
            base_offset,
            self.segment_config(),
            Arc::clone(&self.codec),
        )
    }

    fn segment_config(&self) -> SegmentConfig {
        self.config.segment
    }

    fn append_locked(&self, segments: &mut Vec<Segment>, record: Record) -> Result<(u64, Record)> {
        let active = segments.last().ok_or(LogError::NoSegments)?;

        if active.is_maxed() {
            let base_offset = active.next_offset();
            tracing::debug!(
                "Rotating segment {} (store={} bytes, index={} bytes) to {}",
                active.base_offset(),
                active.store_size(),
                active.index_size(),
                base_offset
            );
            segments.push(self.new_segment(base_offset)?);
        }

        segments
            .last_mut()
            .ok_or(LogError::NoSegments)?
            .append(record)
    }

    fn close_locked(segments: &mut [Segment]) -> Result<()> {
        for segment in segments.iter_mut() {
            segment.close()?;
        }
        Ok(())
    }

    fn remove_locked(&self, segments: &mut Vec<Segment>) -> Result<()> {
        Self::close_locked(segments)?;
        segments.clear();

        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::debug!("Removed log directory {}", self.dir.display());
        Ok(())
    }

    fn reset_locked(&self, segments: &mut Vec<Segment>, initial_offset: u64) -> Result<()> {
        self.remove_locked(segments)?;
        *segments = self.setup(initial_offset)?;
        tracing::info!(
            "Reset log {} to start at offset {}",
            self.dir.display(),
            initial_offset
        );
        Ok(())
    }
}
