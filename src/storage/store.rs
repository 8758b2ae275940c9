//! Record store
//!
//! Append-only file of length-prefixed frames. Writes go through a buffer;
//! every read flushes it first so positions handed out by `append` are always
//! readable.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::encoding::{decode_len, encode_frame, LEN_WIDTH};
use crate::error::{LogError, Result};

/// Open file handles of a store
struct Handles {
    /// Buffered append handle
    writer: BufWriter<File>,
    /// Separate handle used for positioned reads
    reader: File,
}

struct StoreState {
    /// Logical size, including bytes still sitting in the buffer
    size: u64,
    /// `None` once the store is closed
    handles: Option<Handles>,
}

/// Append-only store of length-prefixed records
///
/// ## Concurrency:
/// - All state behind one mutex; append, read, read_at and close are
///   serialized per store
pub struct Store {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl Store {
    /// Open or create the store file at `path`
    ///
    /// The logical size starts at the current file length.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let size = file.metadata()?.len();
        let reader = file.try_clone()?;

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(StoreState {
                size,
                handles: Some(Handles {
                    writer: BufWriter::new(file),
                    reader,
                }),
            }),
        })
    }

    /// Append one frame
    ///
    /// Returns `(bytes_written, position)` where `position` is where the frame
    /// starts and `bytes_written` includes the length prefix.
    pub fn append(&self, payload: &[u8]) -> Result<(u64, u64)> {
        let mut state = self.state.lock();
        let handles = Self::open_handles(&mut state, &self.path)?;

        let frame = encode_frame(payload);
        handles.writer.write_all(&frame)?;

        let position = state.size;
        let written = frame.len() as u64;
        state.size += written;

        Ok((written, position))
    }

    /// Read the frame starting at `position`
    pub fn read(&self, position: u64) -> Result<Vec<u8>> {
        let mut state = self.state.lock();
        let size = state.size;
        let handles = Self::open_handles(&mut state, &self.path)?;
        handles.writer.flush()?;

        if position.saturating_add(LEN_WIDTH) > size {
            return Err(LogError::Corruption(format!(
                "frame at {} past end of store {} ({} bytes)",
                position,
                self.path.display(),
                size
            )));
        }

        let mut prefix = [0u8; LEN_WIDTH as usize];
        handles.reader.seek(SeekFrom::Start(position))?;
        handles.reader.read_exact(&mut prefix)?;

        let len = decode_len(&prefix);
        if (position + LEN_WIDTH).saturating_add(len) > size {
            return Err(LogError::Corruption(format!(
                "frame at {} claims {} bytes, store {} holds {}",
                position,
                len,
                self.path.display(),
                size
            )));
        }

        let mut payload = vec![0u8; len as usize];
        handles.reader.read_exact(&mut payload)?;

        Ok(payload)
    }

    /// Read raw bytes starting at `offset`, ignoring frame boundaries
    ///
    /// Fills as much of `buf` as the file allows; returns 0 at end of file.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let mut state = self.state.lock();
        let handles = Self::open_handles(&mut state, &self.path)?;
        handles.writer.flush()?;

        handles.reader.seek(SeekFrom::Start(offset))?;

        let mut filled = 0;
        while filled < buf.len() {
            match handles.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(filled)
    }

    /// Cut the store back to `size` bytes
    pub fn truncate(&self, size: u64) -> Result<()> {
        let mut state = self.state.lock();
        let handles = Self::open_handles(&mut state, &self.path)?;
        handles.writer.flush()?;
        handles.writer.get_ref().set_len(size)?;
        state.size = size;
        Ok(())
    }

    /// Flush the buffer, sync and release the file
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(mut handles) = state.handles.take() {
            handles.writer.flush()?;
            handles.writer.get_ref().sync_all()?;
        }

        Ok(())
    }

    /// Logical size in bytes
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn open_handles<'a>(state: &'a mut StoreState, path: &Path) -> Result<&'a mut Handles> {
        state
            .handles
            .as_mut()
            .ok_or_else(|| LogError::Closed(format!("store {}", path.display())))
    }
}
