//! # Buffer
//!
//! `Buffer` owns (or borrows) a byte sequence plus a read cursor, and exposes
//! the wire primitives of [`crate::wire`] with cursor bookkeeping on top.
//!
//! ## Modes
//!
//! - **Writing**: append-only; the write point is the end of the data. A
//!   buffer reused across marshal calls keeps its capacity.
//! - **Reading**: the cursor is the next unread byte; a separate limit bounds
//!   nested length-delimited payloads so embedded messages decode in place
//!   without copying the payload out.
//!
//! ## Aliasing
//!
//! `Buffer<'a>` holds `Cow<'a, [u8]>`. A buffer built with [`Buffer::from_slice`]
//! borrows its input, and everything handed back out of it (`bytes`, `find`,
//! `decode_raw_bytes`) is a read-only reborrow of that input: the zero-copy
//! path is statically read-only. The struct decode driver always copies into
//! owned destination fields, so decoded records never alias the input.
//!
//! ## Array Fill Positions
//!
//! Fixed arrays of strings, records or durations arrive as one tagged item
//! per element, so the buffer keeps a side map from array address to the
//! number of slots already filled. `rewind` and `reset` clear this map;
//! re-decoding the same record with a rewound buffer requires that.

use std::borrow::Cow;

use hashbrown::HashMap;

use crate::error::{Error, Result};
use crate::wire::{fixed, varint, WireType};

pub struct Buffer<'a> {
    buf: Cow<'a, [u8]>,
    index: usize,
    limit: usize,
    array_indexes: HashMap<usize, usize>,
}

impl Default for Buffer<'static> {
    fn default() -> Self {
        Buffer::new()
    }
}

impl Buffer<'static> {
    /// An empty buffer ready for writing.
    pub fn new() -> Buffer<'static> {
        Buffer::from_vec(Vec::new())
    }

    /// A buffer owning `bytes`, ready for reading or appending.
    pub fn from_vec(bytes: Vec<u8>) -> Buffer<'static> {
        let limit = bytes.len();
        Buffer {
            buf: Cow::Owned(bytes),
            index: 0,
            limit,
            array_indexes: HashMap::new(),
        }
    }
}

impl<'a> Buffer<'a> {
    /// A buffer borrowing `bytes`, ready for reading. Decoded byte and string
    /// views handed out by this buffer alias `bytes`.
    pub fn from_slice(bytes: &'a [u8]) -> Buffer<'a> {
        Buffer {
            buf: Cow::Borrowed(bytes),
            index: 0,
            limit: bytes.len(),
            array_indexes: HashMap::new(),
        }
    }

    /// The full contents, written or not yet read.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the buffer and returns its contents.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_owned()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes left between the read cursor and the current limit.
    pub fn remaining(&self) -> usize {
        self.limit - self.index
    }

    /// Clears contents and cursor, keeping allocated capacity.
    pub fn reset(&mut self) {
        self.buf.to_mut().clear();
        self.index = 0;
        self.limit = 0;
        self.array_indexes.clear();
    }

    /// Moves the read cursor back to the start. Also forgets array fill
    /// positions, so a rewound buffer decodes fixed arrays from slot zero
    /// again.
    pub fn rewind(&mut self) {
        self.index = 0;
        self.limit = self.buf.len();
        self.array_indexes.clear();
    }

    // --- writing ---

    /// Appends raw bytes with no length prefix.
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.to_mut().extend_from_slice(bytes);
        self.limit = self.buf.len();
    }

    pub fn encode_varint(&mut self, value: u64) {
        varint::encode_into(value, self.buf.to_mut());
        self.limit = self.buf.len();
    }

    /// Zig-zag encodes the low 32 bits of `value` (a sign-extended i32 in the
    /// u64 channel) and writes the result as a varint.
    pub fn encode_zigzag32(&mut self, value: u64) {
        self.encode_varint(varint::zigzag32_encode(value));
    }

    pub fn encode_zigzag64(&mut self, value: u64) {
        self.encode_varint(varint::zigzag64_encode(value));
    }

    /// Writes the low 32 bits of `value` as four little-endian bytes.
    pub fn encode_fixed32(&mut self, value: u64) {
        fixed::encode_fixed32(value as u32, self.buf.to_mut());
        self.limit = self.buf.len();
    }

    pub fn encode_fixed64(&mut self, value: u64) {
        fixed::encode_fixed64(value, self.buf.to_mut());
        self.limit = self.buf.len();
    }

    /// Writes a varint byte count followed by the bytes themselves.
    pub fn encode_raw_bytes(&mut self, bytes: &[u8]) {
        self.encode_varint(bytes.len() as u64);
        self.append(bytes);
    }

    // --- reading ---

    fn window(&self) -> &[u8] {
        &self.buf[self.index..self.limit]
    }

    pub fn decode_varint(&mut self) -> Result<u64> {
        let (v, used) = varint::decode(self.window())?;
        self.index += used;
        Ok(v)
    }

    pub fn decode_zigzag32(&mut self) -> Result<u64> {
        Ok(varint::zigzag32_decode(self.decode_varint()?))
    }

    pub fn decode_zigzag64(&mut self) -> Result<u64> {
        Ok(varint::zigzag64_decode(self.decode_varint()?))
    }

    pub fn decode_fixed32(&mut self) -> Result<u64> {
        let v = fixed::decode_fixed32(self.window())?;
        self.index += 4;
        Ok(u64::from(v))
    }

    pub fn decode_fixed64(&mut self) -> Result<u64> {
        let v = fixed::decode_fixed64(self.window())?;
        self.index += 8;
        Ok(v)
    }

    /// Reads a varint byte count followed by that many raw bytes. The
    /// returned slice aliases the buffer; treat it as read-only.
    pub fn decode_raw_bytes(&mut self) -> Result<&[u8]> {
        let count = self.decode_varint()?;
        let n = usize::try_from(count).map_err(|_| Error::BadLength(count))?;
        if n > self.remaining() {
            return Err(Error::UnexpectedEnd);
        }
        let start = self.index;
        self.index += n;
        Ok(&self.buf[start..self.index])
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        if self.index >= self.limit {
            return Err(Error::UnexpectedEnd);
        }
        let b = self.buf[self.index];
        self.index += 1;
        Ok(b)
    }

    // --- skipping ---

    /// Advances past a varint without materializing its value. Unlike
    /// `decode_varint` this does not care about 64-bit overflow.
    pub fn skip_varint(&mut self) -> Result<()> {
        let used = varint::skip(self.window())?;
        self.index += used;
        Ok(())
    }

    /// Advances past `n` bytes. Covers fixed-32 and fixed-64 with the right
    /// argument, and arbitrary payload lengths.
    pub fn skip_fixed(&mut self, n: u64) -> Result<()> {
        let n = usize::try_from(n).map_err(|_| Error::BadLength(n))?;
        if n > self.remaining() {
            return Err(Error::UnexpectedEnd);
        }
        self.index += n;
        Ok(())
    }

    /// Advances past a length-delimited value.
    pub fn skip_raw_bytes(&mut self) -> Result<()> {
        let count = self.decode_varint()?;
        self.skip_fixed(count)
    }

    /// Skips one value of the given wire type. Group wire types cannot be
    /// skipped and are fatal.
    pub(crate) fn skip_wire(&mut self, wire: WireType) -> Result<()> {
        match wire {
            WireType::Varint => self.skip_varint(),
            WireType::Bytes => self.skip_raw_bytes(),
            WireType::Fixed64 => self.skip_fixed(8),
            WireType::Fixed32 => self.skip_fixed(4),
            WireType::StartGroup | WireType::EndGroup => {
                Err(Error::UnknownWireType(wire as u8))
            }
        }
    }

    /// Like `skip_wire` but returns the value bytes: the varint bytes, the
    /// fixed-width bytes, or the payload after the length prefix.
    pub(crate) fn get_wire_value(&mut self, wire: WireType) -> Result<&[u8]> {
        let mut start = self.index;
        match wire {
            WireType::Varint => self.skip_varint()?,
            WireType::Bytes => {
                let count = self.decode_varint()?;
                start = self.index;
                self.skip_fixed(count)?;
            }
            WireType::Fixed64 => self.skip_fixed(8)?,
            WireType::Fixed32 => self.skip_fixed(4)?,
            WireType::StartGroup | WireType::EndGroup => {
                return Err(Error::UnknownWireType(wire as u8));
            }
        }
        Ok(&self.buf[start..self.index])
    }

    // --- tags ---

    /// Reads a field tag. One- and two-byte tags (field numbers up to 2047)
    /// are decoded inline; longer tags fall back to the general varint
    /// reader, which also rejects field number zero.
    pub(crate) fn read_tag(&mut self) -> Result<(u64, WireType)> {
        let i = self.index;
        if i < self.limit {
            let b = u64::from(self.buf[i]);
            if b < 0x80 {
                self.index = i + 1;
                return Ok((b >> 3, wire_of(b)?));
            }
            if i + 1 < self.limit && self.buf[i + 1] < 0x80 {
                let u = (b & !0x80) | (u64::from(self.buf[i + 1]) << 7);
                self.index = i + 2;
                return Ok((u >> 3, wire_of(u)?));
            }
        }
        let u = self.decode_varint()?;
        let wire = wire_of(u)?;
        if u >> 3 == 0 {
            return Err(Error::IllegalTag((u & 7) as u8));
        }
        Ok((u >> 3, wire))
    }

    // --- scanning ---

    /// Scans forward from the cursor for the next top-level item with the
    /// given field number. On a match returns the raw on-wire bytes including
    /// the tag (a valid protobuf fragment on its own), the payload slice, and
    /// the wire type. With `sorted` set, a larger field number aborts the
    /// scan early.
    pub fn find(&mut self, field_number: u32, sorted: bool) -> Result<(&[u8], &[u8], WireType)> {
        while self.index < self.limit {
            let start = self.index;
            let key = self.decode_varint()?;
            let wire = wire_of(key)?;
            let number = key >> 3;
            if number == u64::from(field_number) {
                let mut val_start = self.index;
                match wire {
                    WireType::Bytes => {
                        let count = self.decode_varint()?;
                        val_start = self.index;
                        self.skip_fixed(count)?;
                    }
                    other => self.skip_wire(other)?,
                }
                return Ok((
                    &self.buf[start..self.index],
                    &self.buf[val_start..self.index],
                    wire,
                ));
            }
            if sorted && number > u64::from(field_number) {
                break;
            }
            self.skip_wire(wire)?;
        }
        Err(Error::NotFound)
    }

    // --- packed-sequence counting ---

    /// Counts the varints between the cursor and the limit. Used to pre-size
    /// packed-sequence destinations; assumes the window holds only varints.
    pub fn count_varints(&self) -> usize {
        varint::count(self.window())
    }

    /// Counts fixed-32 values between the cursor and the limit.
    pub fn count_fixed_32s(&self) -> usize {
        self.remaining() / 4
    }

    /// Counts fixed-64 values between the cursor and the limit.
    pub fn count_fixed_64s(&self) -> usize {
        self.remaining() / 8
    }

    /// Counts how many further items with the same field number and wire type
    /// follow the cursor. Used to pre-size repeated string/bytes/record
    /// sequences; stops at the first foreign item or malformed byte.
    pub(crate) fn count_ahead(&self, field_number: u32, wire: WireType) -> usize {
        let window = &self.buf[..self.limit];
        let mut idx = self.index;
        let mut n = 0usize;
        loop {
            let Ok((key, used)) = varint::decode(&window[idx..]) else {
                return n;
            };
            if key >> 3 != u64::from(field_number) {
                return n;
            }
            if WireType::from_raw((key & 7) as u8) != Some(wire) {
                return n;
            }
            idx += used;
            let value_len = match wire {
                WireType::Varint => match varint::skip(&window[idx..]) {
                    Ok(u) => u,
                    Err(_) => return n,
                },
                WireType::Bytes => {
                    let Ok((count, used2)) = varint::decode(&window[idx..]) else {
                        return n;
                    };
                    let Some(len) = usize::try_from(count)
                        .ok()
                        .and_then(|c| c.checked_add(used2))
                    else {
                        return n;
                    };
                    len
                }
                WireType::Fixed64 => 8,
                WireType::Fixed32 => 4,
                WireType::StartGroup | WireType::EndGroup => return n,
            };
            match idx.checked_add(value_len) {
                Some(end) if end <= window.len() => idx = end,
                _ => return n,
            }
            n += 1;
        }
    }

    // --- nested payload limits ---

    /// Narrows the read limit to `end`, returning the previous limit. The
    /// caller restores it with `pop_limit` once the nested payload is done.
    pub(crate) fn push_limit(&mut self, end: usize) -> Result<usize> {
        if end > self.limit {
            return Err(Error::UnexpectedEnd);
        }
        let old = self.limit;
        self.limit = end;
        Ok(old)
    }

    pub(crate) fn pop_limit(&mut self, old: usize) {
        self.limit = old;
    }

    pub(crate) fn position(&self) -> usize {
        self.index
    }

    pub(crate) fn set_position(&mut self, index: usize) {
        self.index = index;
    }

    // --- array fill positions ---

    pub(crate) fn array_index(&self, key: usize) -> usize {
        self.array_indexes.get(&key).copied().unwrap_or(0)
    }

    pub(crate) fn save_array_index(&mut self, key: usize, next: usize) {
        self.array_indexes.insert(key, next);
    }
}

fn wire_of(key: u64) -> Result<WireType> {
    WireType::from_raw((key & 7) as u8).ok_or(Error::UnknownWireType((key & 7) as u8))
}
