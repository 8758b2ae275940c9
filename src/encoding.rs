//! Big-endian encoding shared by the store and the index
//!
//! Every multi-byte integer on disk is big-endian. These helpers are the only
//! place the widths are spelled out.

use bytes::{Buf, BufMut};

/// Width of a store frame length prefix
pub const LEN_WIDTH: u64 = 8;

/// Width of the relative offset in an index entry
pub const OFF_WIDTH: u64 = 4;

/// Width of the store position in an index entry
pub const POS_WIDTH: u64 = 8;

/// Full width of one index entry
pub const ENTRY_WIDTH: u64 = OFF_WIDTH + POS_WIDTH;

/// Build a store frame: length prefix followed by the payload
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(LEN_WIDTH as usize + payload.len());
    frame.put_u64(payload.len() as u64);
    frame.put_slice(payload);
    frame
}

/// Decode a frame length prefix
pub fn decode_len(prefix: &[u8; LEN_WIDTH as usize]) -> u64 {
    let mut buf = &prefix[..];
    buf.get_u64()
}

/// Write one index entry into a slot of exactly `ENTRY_WIDTH` bytes
pub fn put_entry(mut slot: &mut [u8], relative_offset: u32, position: u64) {
    slot.put_u32(relative_offset);
    slot.put_u64(position);
}

/// Read one index entry from a slot of exactly `ENTRY_WIDTH` bytes
pub fn get_entry(mut slot: &[u8]) -> (u32, u64) {
    let relative_offset = slot.get_u32();
    let position = slot.get_u64();
    (relative_offset, position)
}
