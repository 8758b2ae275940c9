//! Record definitions
//!
//! A record is an opaque payload plus the offset the log assigned to it. The
//! log only ever handles the encoded bytes, so the encoding sits behind the
//! `RecordCodec` trait.

use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};

/// A single record in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque payload bytes
    pub value: Vec<u8>,

    /// Offset assigned by the log at append time
    pub offset: u64,
}

impl Record {
    /// Create a record that has not been appended yet
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            offset: 0,
        }
    }

    /// Copy of this record carrying the given offset
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// Turns records into the bytes stored in a segment and back
pub trait RecordCodec: Send + Sync {
    fn encode(&self, record: &Record) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Record>;
}

/// Default codec: bincode over the serde representation of `Record`
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl RecordCodec for BincodeCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        bincode::serialize(record).map_err(|e| LogError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record> {
        bincode::deserialize(bytes).map_err(|e| LogError::Serialization(e.to_string()))
    }
}
