//! # Fixed-Width Values
//!
//! Fixed-32 and fixed-64 wire values are little-endian on the wire regardless
//! of host endianness. Loads and stores go through `zerocopy`'s little-endian
//! wrapper types, which are width-specific and make no alignment assumptions.

use zerocopy::little_endian::{U32, U64};

use crate::error::{Error, Result};

/// Reads a little-endian u32 from the front of `buf`.
pub fn decode_fixed32(buf: &[u8]) -> Result<u32> {
    let Some(raw) = buf.get(..4) else {
        return Err(Error::UnexpectedEnd);
    };
    let bytes: [u8; 4] = raw.try_into().unwrap(); // INVARIANT: get(..4) guarantees the length
    Ok(U32::from_bytes(bytes).get())
}

/// Reads a little-endian u64 from the front of `buf`.
pub fn decode_fixed64(buf: &[u8]) -> Result<u64> {
    let Some(raw) = buf.get(..8) else {
        return Err(Error::UnexpectedEnd);
    };
    let bytes: [u8; 8] = raw.try_into().unwrap(); // INVARIANT: get(..8) guarantees the length
    Ok(U64::from_bytes(bytes).get())
}

/// Appends `value` to `out` as four little-endian bytes.
pub fn encode_fixed32(value: u32, out: &mut Vec<u8>) {
    out.extend_from_slice(&U32::new(value).to_bytes());
}

/// Appends `value` to `out` as eight little-endian bytes.
pub fn encode_fixed64(value: u64, out: &mut Vec<u8>) {
    out.extend_from_slice(&U64::new(value).to_bytes());
}
