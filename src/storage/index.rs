//! Offset index
//!
//! Fixed-width entries mapping a relative offset to a store position. The
//! file is grown to its maximum size up front and memory-mapped, so writes
//! never resize the map. `close` cuts the file back to the entries actually
//! written.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};

use crate::encoding::{get_entry, put_entry, ENTRY_WIDTH, LEN_WIDTH};
use crate::error::{LogError, Result};

/// Open file and mapping of an index
struct Mapped {
    file: File,
    mmap: MmapMut,
}

/// Memory-mapped offset index
///
/// ## Concurrency:
/// - No internal lock. Callers hold the enclosing segment/log lock; `write`
///   and `close` take `&mut self`.
pub struct Index {
    path: PathBuf,
    /// Bytes of the map holding real entries
    size: u64,
    /// `None` once the index is closed
    mapped: Option<Mapped>,
}

impl Index {
    /// Open or create the index file at `path`, pre-allocated to `max_bytes`
    pub fn open(path: &Path, max_bytes: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        let file_len = file.metadata()?.len();
        let size = file_len - file_len % ENTRY_WIDTH;
        let capacity = max_bytes.max(size);

        file.set_len(capacity)?;

        // SAFETY: the file is owned by this index and never resized while the
        // map is alive; `close` drops the map before truncating.
        let mmap = unsafe { MmapOptions::new().len(capacity as usize).map_mut(&file)? };

        Ok(Self {
            path: path.to_path_buf(),
            size,
            mapped: Some(Mapped { file, mmap }),
        })
    }

    /// Read an entry
    ///
    /// `-1` reads the last entry, any other value the n-th entry (0-based).
    /// Returns `(relative_offset, position)`.
    pub fn read(&self, n: i64) -> Result<(u32, u64)> {
        let mapped = self.mapped()?;

        if self.size == 0 {
            return Err(LogError::IndexEmpty);
        }

        let entries = self.entries();
        let entry = if n == -1 {
            entries - 1
        } else {
            u64::try_from(n).map_err(|_| LogError::IndexOutOfBounds {
                entry: n.unsigned_abs(),
                entries,
            })?
        };

        let start = entry
            .checked_mul(ENTRY_WIDTH)
            .filter(|start| start.saturating_add(ENTRY_WIDTH) <= self.size)
            .ok_or(LogError::IndexOutOfBounds { entry, entries })?;

        let start = start as usize;
        Ok(get_entry(&mapped.mmap[start..start + ENTRY_WIDTH as usize]))
    }

    /// Append an entry
    pub fn write(&mut self, relative_offset: u32, position: u64) -> Result<()> {
        let size = self.size;
        let mapped = self.mapped_mut()?;

        let capacity = mapped.mmap.len() as u64;
        if size + ENTRY_WIDTH > capacity {
            return Err(LogError::IndexFull { capacity });
        }

        let start = size as usize;
        put_entry(
            &mut mapped.mmap[start..start + ENTRY_WIDTH as usize],
            relative_offset,
            position,
        );
        self.size += ENTRY_WIDTH;

        Ok(())
    }

    /// Shrink the logical size to the longest run of believable entries
    ///
    /// Entry `i` is kept while its relative offset is `i` and its position
    /// lies past the previous frame and inside a store of `store_size`
    /// bytes. Returns the number of entries dropped.
    pub fn recover(&mut self, store_size: u64) -> Result<u64> {
        let entries = self.entries();
        let mut valid = 0;
        let mut min_position = 0;

        while valid < entries {
            let (relative_offset, position) = self.read(valid as i64)?;
            let plausible = u64::from(relative_offset) == valid
                && position >= min_position
                && position.saturating_add(LEN_WIDTH) <= store_size;
            if !plausible {
                break;
            }
            min_position = position + LEN_WIDTH;
            valid += 1;
        }

        self.size = valid * ENTRY_WIDTH;
        Ok(entries - valid)
    }

    /// Forget every entry from `entries` onwards
    pub fn truncate(&mut self, entries: u64) {
        self.size = self.size.min(entries.saturating_mul(ENTRY_WIDTH));
    }

    /// Sync the map and file, unmap, and truncate to the logical size
    pub fn close(&mut self) -> Result<()> {
        if let Some(Mapped { file, mmap }) = self.mapped.take() {
            mmap.flush()?;
            file.sync_all()?;
            drop(mmap);
            file.set_len(self.size)?;
        }
        Ok(())
    }

    /// Bytes taken up by real entries
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of entries written
    pub fn entries(&self) -> u64 {
        self.size / ENTRY_WIDTH
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn mapped(&self) -> Result<&Mapped> {
        self.mapped
            .as_ref()
            .ok_or_else(|| LogError::Closed(format!("index {}", self.path.display())))
    }

    fn mapped_mut(&mut self) -> Result<&mut Mapped> {
        let path = &self.path;
        self.mapped
            .as_mut()
            .ok_or_else(|| LogError::Closed(format!("index {}", path.display())))
    }
}

impl Drop for Index {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close index {}: {}", self.path.display(), e);
        }
    }
}
