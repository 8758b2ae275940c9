//! Raw log streaming
//!
//! `LogReader` concatenates the raw bytes of every store in a log, oldest
//! segment first. The output is a plain sequence of store frames, which is
//! what `Log::restore` and `read_frame` consume.

use std::io::{self, Read};
use std::sync::Arc;

use crate::encoding::{decode_len, LEN_WIDTH};
use crate::error::{LogError, Result};
use crate::storage::Store;

/// Sequential reader over one store, tracking its own position
pub struct StoreReader {
    store: Arc<Store>,
    position: u64,
}

impl StoreReader {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store, position: 0 }
    }
}

impl Read for StoreReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self
            .store
            .read_at(buf, self.position)
            .map_err(|e| match e {
                LogError::Io(io_err) => io_err,
                other => io::Error::other(other),
            })?;
        self.position += n as u64;
        Ok(n)
    }
}

/// Chain of store readers in ascending base offset order
pub struct LogReader {
    readers: Vec<StoreReader>,
    current: usize,
}

impl LogReader {
    pub(crate) fn new(readers: Vec<StoreReader>) -> Self {
        Self {
            readers,
            current: 0,
        }
    }
}

impl Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while let Some(reader) = self.readers.get_mut(self.current) {
            let n = reader.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            self.current += 1;
        }

        Ok(0)
    }
}

/// Read one store frame from a raw stream
///
/// Returns:
/// - `Ok(Some(payload))`: a complete frame
/// - `Ok(None)`: clean end of stream
/// - `Err(Corruption)`: the stream ends inside a frame
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; LEN_WIDTH as usize];
    let mut filled = 0;

    while filled < prefix.len() {
        match reader.read(&mut prefix[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(LogError::Corruption(format!(
                    "stream ended after {} of {} length bytes",
                    filled, LEN_WIDTH
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let len = decode_len(&prefix);
    let mut payload = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut payload)?;

    if payload.len() as u64 != len {
        return Err(LogError::Corruption(format!(
            "frame claims {} bytes, stream held {}",
            len,
            payload.len()
        )));
    }

    Ok(Some(payload))
}
