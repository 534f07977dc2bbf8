//! # Field Plans
//!
//! A [`Property`] is the compiled plan for one field: its number, expected
//! wire type, the precomputed tag prefix, the codec variant the drivers
//! dispatch on, and (for scalar kinds) the value-codec triple used by packed
//! sequences. A [`StructProperties`] is the per-record plan: properties
//! sorted by field number plus the record's reserved numbers.
//!
//! Plans are compiled once per type by [`crate::props::cache::get_properties`]
//! and are immutable after publication.

pub mod cache;
pub(crate) mod parse;

use std::sync::{Arc, OnceLock};

use smallvec::SmallVec;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::reflect::{CustomType, ScalarKind};
use crate::wire::WireType;

/// The encode-one / decode-one / count-ahead triple for one scalar wire
/// encoding. All three work in the unsigned 64-bit channel.
#[derive(Debug, Clone, Copy)]
pub struct ValueCodec {
    pub encode: fn(&mut Buffer<'_>, u64),
    pub decode: fn(&mut Buffer<'_>) -> Result<u64>,
    pub count: fn(&Buffer<'_>) -> usize,
}

fn enc_varint(buf: &mut Buffer<'_>, v: u64) {
    buf.encode_varint(v);
}
fn enc_zigzag32(buf: &mut Buffer<'_>, v: u64) {
    buf.encode_zigzag32(v);
}
fn enc_zigzag64(buf: &mut Buffer<'_>, v: u64) {
    buf.encode_zigzag64(v);
}
fn enc_fixed32(buf: &mut Buffer<'_>, v: u64) {
    buf.encode_fixed32(v);
}
fn enc_fixed64(buf: &mut Buffer<'_>, v: u64) {
    buf.encode_fixed64(v);
}
fn dec_varint(buf: &mut Buffer<'_>) -> Result<u64> {
    buf.decode_varint()
}
fn dec_zigzag32(buf: &mut Buffer<'_>) -> Result<u64> {
    buf.decode_zigzag32()
}
fn dec_zigzag64(buf: &mut Buffer<'_>) -> Result<u64> {
    buf.decode_zigzag64()
}
fn dec_fixed32(buf: &mut Buffer<'_>) -> Result<u64> {
    buf.decode_fixed32()
}
fn dec_fixed64(buf: &mut Buffer<'_>) -> Result<u64> {
    buf.decode_fixed64()
}
fn cnt_varints(buf: &Buffer<'_>) -> usize {
    buf.count_varints()
}
fn cnt_fixed32s(buf: &Buffer<'_>) -> usize {
    buf.count_fixed_32s()
}
fn cnt_fixed64s(buf: &Buffer<'_>) -> usize {
    buf.count_fixed_64s()
}

pub(crate) const VARINT_CODEC: ValueCodec = ValueCodec {
    encode: enc_varint,
    decode: dec_varint,
    count: cnt_varints,
};
// zig-zag values ride the varint encoding, so they count like varints
pub(crate) const ZIGZAG32_CODEC: ValueCodec = ValueCodec {
    encode: enc_zigzag32,
    decode: dec_zigzag32,
    count: cnt_varints,
};
pub(crate) const ZIGZAG64_CODEC: ValueCodec = ValueCodec {
    encode: enc_zigzag64,
    decode: dec_zigzag64,
    count: cnt_varints,
};
pub(crate) const FIXED32_CODEC: ValueCodec = ValueCodec {
    encode: enc_fixed32,
    decode: dec_fixed32,
    count: cnt_fixed32s,
};
pub(crate) const FIXED64_CODEC: ValueCodec = ValueCodec {
    encode: enc_fixed64,
    decode: dec_fixed64,
    count: cnt_fixed64s,
};

/// The container-shape dispatch the drivers match on. Nested record variants
/// hold a handle to the referenced plan; map variants own their key/value
/// sub-plans.
#[derive(Debug)]
pub enum FieldCodec {
    Scalar(ScalarKind),
    OptScalar(ScalarKind),
    PackedSeq(ScalarKind),
    PackedArray(ScalarKind, usize),
    Str,
    OptStr,
    StrSeq,
    StrArray(usize),
    Bytes,
    ByteArray(usize),
    BytesSeq,
    Message(Arc<StructProperties>),
    OptMessage(Arc<StructProperties>),
    MessageSeq(Arc<StructProperties>),
    MessageArray(Arc<StructProperties>, usize),
    Map {
        key: Box<Property>,
        value: Box<Property>,
    },
    Timestamp,
    OptTimestamp,
    TimestampSeq,
    TimestampArray(usize),
    Duration,
    OptDuration,
    DurationSeq,
    DurationArray(usize),
    Custom,
    OptCustom,
    CustomSeq,
    /// Zero-length arrays: encodes nothing, decodes by skipping.
    Nothing,
}

/// How the field renders in emitted `.proto` text.
#[derive(Debug, Clone)]
pub enum SchemaType {
    Simple {
        name: &'static str,
        repeated: bool,
    },
    Message {
        name: &'static str,
        repeated: bool,
    },
    Map,
    Timestamp {
        repeated: bool,
    },
    Duration {
        repeated: bool,
    },
    Custom {
        ct: CustomType,
        repeated: bool,
    },
}

/// Compiled plan for a single field.
#[derive(Debug)]
pub struct Property {
    pub(crate) name: &'static str,
    /// The raw tag string, kept for `name=` overrides in the schema emitter.
    pub(crate) wire: &'static str,
    pub(crate) field_number: u32,
    pub(crate) wire_type: WireType,
    /// Varint bytes of `(field_number << 3) | wire_type`; emitted as one copy.
    pub(crate) tag_prefix: SmallVec<[u8; 5]>,
    /// Which member of the record this plan drives.
    pub(crate) field_index: usize,
    pub(crate) codec: FieldCodec,
    pub(crate) value_codec: Option<ValueCodec>,
    pub(crate) schema_type: SchemaType,
    pub(crate) is_optional: bool,
    pub(crate) is_marshaler: bool,
    pub(crate) is_appender: bool,
}

impl Property {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field_number(&self) -> u32 {
        self.field_number
    }

    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    pub fn is_marshaler(&self) -> bool {
        self.is_marshaler
    }

    pub fn is_appender(&self) -> bool {
        self.is_appender
    }

    /// The key/value sub-plans of a map field.
    pub fn map_plans(&self) -> Option<(&Property, &Property)> {
        match &self.codec {
            FieldCodec::Map { key, value } => Some((&**key, &**value)),
            _ => None,
        }
    }

    /// The single tag byte of a map sub-plan; key and value plans always fit
    /// one byte because their field numbers are 1 and 2.
    pub(crate) fn tag_byte(&self) -> u8 {
        self.tag_prefix[0]
    }

    /// Decodes one value of this property's scalar encoding.
    pub(crate) fn decode_scalar(&self, buf: &mut Buffer<'_>) -> Result<u64> {
        let vc = self.value_codec.as_ref().ok_or(Error::PlanMismatch(self.name))?;
        (vc.decode)(buf)
    }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.wire, self.name)
    }
}

#[derive(Debug)]
pub(crate) struct PropsBody {
    pub props: Vec<Property>,
    pub reserved: Vec<u32>,
}

/// Compiled plan for one record type: properties in strictly ascending
/// field-number order, plus a sorted deduplicated reserved list. Published to
/// the cache before its body is filled so recursive type references observe a
/// stable handle; immutable afterwards.
#[derive(Debug)]
pub struct StructProperties {
    type_name: &'static str,
    module_path: &'static str,
    body: OnceLock<PropsBody>,
}

impl StructProperties {
    pub(crate) fn new(type_name: &'static str, module_path: &'static str) -> StructProperties {
        StructProperties {
            type_name,
            module_path,
            body: OnceLock::new(),
        }
    }

    pub(crate) fn publish(&self, body: PropsBody) {
        // a plan is filled exactly once, under the cache's writer lock
        let _ = self.body.set(body);
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn module_path(&self) -> &'static str {
        self.module_path
    }

    pub fn props(&self) -> &[Property] {
        self.body.get().map(|b| b.props.as_slice()).unwrap_or(&[])
    }

    pub fn reserved(&self) -> &[u32] {
        self.body.get().map(|b| b.reserved.as_slice()).unwrap_or(&[])
    }
}
