//! # Encode/Decode Drivers
//!
//! The drivers walk a compiled [`crate::props::StructProperties`] against a
//! live record. Encoding visits properties in field-number order and emits
//! `tag_prefix` + payload for every non-default field; decoding reads tags
//! off the wire and dispatches each one to the matching property's decoder,
//! skipping unknown field numbers.
//!
//! Decoding merges into the destination: scalars overwrite, sequences
//! append, map entries overwrite by key, nested records merge recursively.
//! Callers that want replacement semantics zero the destination first.

pub(crate) mod decode;
pub(crate) mod encode;

#[cfg(test)]
mod tests;

use crate::buffer::Buffer;
use crate::error::Result;
use crate::props::cache::get_properties;
use crate::reflect::MessageDyn;

/// Encodes `msg` into a fresh byte vector.
pub fn marshal(msg: &dyn MessageDyn) -> Result<Vec<u8>> {
    let mut buf = Buffer::new();
    buf.marshal(msg)?;
    Ok(buf.into_bytes())
}

/// Decodes `bytes` into `msg`, merging with whatever `msg` already holds.
pub fn unmarshal(bytes: &[u8], msg: &mut dyn MessageDyn) -> Result<()> {
    let mut buf = Buffer::from_slice(bytes);
    buf.unmarshal(msg)
}

impl<'a> Buffer<'a> {
    /// Appends the encoding of `msg` to the buffer. Marshaling the same or
    /// another record again concatenates, which protobuf defines as merge.
    pub fn marshal(&mut self, msg: &dyn MessageDyn) -> Result<()> {
        let plan = get_properties(msg.type_desc())?;
        encode::encode_struct(&plan, msg, self)
    }

    /// Decodes from the read cursor to the end of the buffer into `msg`,
    /// merging into existing contents.
    pub fn unmarshal(&mut self, msg: &mut dyn MessageDyn) -> Result<()> {
        let plan = get_properties(msg.type_desc())?;
        decode::decode_struct(&plan, msg, self)
    }
}
