//! # Record Introspection
//!
//! The compile-time replacement for runtime reflection. The [`message!`]
//! macro expands each record definition into three artifacts:
//!
//! 1. a static [`TypeDescriptor`]: field names, tag strings and element
//!    shapes, enough for the plan builder to compile a
//!    [`crate::props::StructProperties`] without ever seeing the Rust type;
//! 2. dynamic accessors ([`MessageDyn::field`] / [`MessageDyn::field_mut`])
//!    that surface the i-th member as a [`FieldRef`] / [`FieldMut`] sum, which
//!    is what the encode/decode drivers actually touch;
//! 3. the [`FieldValue`] impls that let the type appear inside other records
//!    (by value, optional, boxed, repeated, fixed array, map value).
//!
//! The supported element shapes mirror the plan model one to one; a plan and
//! the accessors it drives are generated from the same field list, so a
//! variant mismatch between them cannot arise from macro-generated code.
//!
//! [`message!`]: crate::message

mod impls;
mod map;
pub mod scalar;

pub use map::{MapField, MapKey, MapValue};
pub use scalar::{
    OptScalarMut, ScalarArrayMut, ScalarKind, ScalarMut, ScalarSlice, ScalarValue, ScalarVecMut,
};

use std::any::TypeId;

use crate::buffer::Buffer;
use crate::error::Result;

/// Static description of one field of a record: its name, its protobuf tag
/// string, and a thunk producing its element shape. Map fields additionally
/// carry the key and value tag strings.
pub struct FieldDescriptor {
    pub name: &'static str,
    pub tag: &'static str,
    pub key_tag: Option<&'static str>,
    pub val_tag: Option<&'static str>,
    pub element: fn() -> ElementType,
}

/// Static description of a record type. The plan cache is keyed by
/// `(type_id)()`; `module_path` feeds the schema emitter's package hook.
pub struct TypeDescriptor {
    pub name: &'static str,
    pub module_path: &'static str,
    pub type_id: fn() -> TypeId,
    pub fields: &'static [FieldDescriptor],
}

/// Schema metadata for a self-coding type: the protobuf type name it claims,
/// an optional hand-written message definition, and the imports its schema
/// needs.
#[derive(Debug, Clone, Copy)]
pub struct CustomType {
    pub proto_name: &'static str,
    pub definition: Option<&'static str>,
    pub imports: &'static [&'static str],
    /// True when encoding goes through [`Marshaler`] rather than
    /// [`Appender`].
    pub marshaler: bool,
}

/// The element shape of a field, as reported by [`FieldValue::element`].
#[derive(Clone)]
pub enum ElementType {
    Scalar(ScalarKind),
    OptScalar(ScalarKind),
    ScalarSeq(ScalarKind),
    ScalarArray(ScalarKind, usize),
    Str,
    OptStr,
    StrSeq,
    StrArray(usize),
    Bytes,
    ByteArray(usize),
    BytesSeq,
    Message(&'static TypeDescriptor),
    OptMessage(&'static TypeDescriptor),
    MessageSeq(&'static TypeDescriptor),
    MessageArray(&'static TypeDescriptor, usize),
    Map {
        key: Box<ElementType>,
        value: Box<ElementType>,
    },
    Timestamp,
    OptTimestamp,
    TimestampSeq,
    TimestampArray(usize),
    Duration,
    OptDuration,
    DurationSeq,
    DurationArray(usize),
    Custom(CustomType),
    OptCustom(CustomType),
    CustomSeq(CustomType),
    /// The zero-size reserved-numbers marker.
    Reserved,
    /// A field excluded from the codec (`skip` in the macro).
    Excluded,
}

/// Marks reserved field numbers. Declare a zero-size field of this type whose
/// tag is a comma-separated list of numbers; using any of them elsewhere in
/// the record is a plan-time error and the schema emitter renders them as a
/// `reserved` line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reserved;

impl FieldValue for Reserved {
    fn element() -> ElementType {
        ElementType::Reserved
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Skip
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Skip
    }
}

/// Element thunk for excluded fields; their types need not implement
/// [`FieldValue`].
#[doc(hidden)]
pub fn excluded_element() -> ElementType {
    ElementType::Excluded
}

/// Implemented by every type that can appear as a record field. The
/// `element` shape drives plan compilation; the two accessors surface the
/// live value to the drivers.
pub trait FieldValue {
    fn element() -> ElementType
    where
        Self: Sized;
    fn field_ref(&self) -> FieldRef<'_>;
    fn field_mut(&mut self) -> FieldMut<'_>;
}

/// Borrowed read view of one field, produced by [`MessageDyn::field`].
pub enum FieldRef<'a> {
    Scalar(ScalarValue),
    OptScalar(Option<ScalarValue>),
    Scalars(ScalarSlice<'a>),
    Str(&'a str),
    OptStr(Option<&'a str>),
    Strs(&'a [String]),
    Bytes(&'a [u8]),
    BytesSeq(&'a [Vec<u8>]),
    Msg(&'a dyn MessageDyn),
    OptMsg(Option<&'a dyn MessageDyn>),
    Msgs(&'a dyn MessageSeq),
    MsgArray(&'a dyn MessageArray),
    Map(&'a dyn MapField),
    Time(time::OffsetDateTime),
    OptTime(Option<time::OffsetDateTime>),
    Times(&'a [time::OffsetDateTime]),
    Dur(time::Duration),
    OptDur(Option<time::Duration>),
    Durs(&'a [time::Duration]),
    Custom(CustomRef<'a>),
    OptCustom(Option<CustomRef<'a>>),
    Customs(&'a dyn CustomSeq),
    Skip,
}

/// Mutable view of one field, produced by [`MessageDyn::field_mut`].
pub enum FieldMut<'a> {
    Scalar(ScalarMut<'a>),
    OptScalar(OptScalarMut<'a>),
    ScalarVec(ScalarVecMut<'a>),
    ScalarArray(ScalarArrayMut<'a>),
    Str(&'a mut String),
    OptStr(&'a mut Option<String>),
    Strs(&'a mut Vec<String>),
    StrArray(&'a mut [String]),
    Bytes(&'a mut Vec<u8>),
    ByteArray(&'a mut [u8]),
    BytesSeq(&'a mut Vec<Vec<u8>>),
    Msg(&'a mut dyn MessageDyn),
    OptMsg(&'a mut dyn MessageOpt),
    Msgs(&'a mut dyn MessageSeq),
    MsgArray(&'a mut dyn MessageArray),
    Map(&'a mut dyn MapField),
    Time(&'a mut time::OffsetDateTime),
    OptTime(&'a mut Option<time::OffsetDateTime>),
    Times(&'a mut Vec<time::OffsetDateTime>),
    TimeArray(&'a mut [time::OffsetDateTime]),
    Dur(&'a mut time::Duration),
    OptDur(&'a mut Option<time::Duration>),
    Durs(&'a mut Vec<time::Duration>),
    DurArray(&'a mut [time::Duration]),
    Custom(&'a mut dyn Unmarshaler),
    OptCustom(&'a mut dyn CustomOpt),
    Customs(&'a mut dyn CustomSeq),
    Skip,
}

/// Object-safe record access: the descriptor plus dynamic field views.
/// Implemented by the [`message!`] macro; the drivers only ever see this
/// trait.
///
/// [`message!`]: crate::message
pub trait MessageDyn: 'static {
    fn type_desc(&self) -> &'static TypeDescriptor;
    fn field(&self, index: usize) -> FieldRef<'_>;
    fn field_mut(&mut self, index: usize) -> FieldMut<'_>;
}

/// A record type with a statically known descriptor.
pub trait Message: MessageDyn + Default {
    fn descriptor() -> &'static TypeDescriptor;
}

/// Growable sequence of records (`Vec<M>`).
pub trait MessageSeq {
    fn len(&self) -> usize;
    fn get(&self, i: usize) -> &dyn MessageDyn;
    fn push_default(&mut self) -> &mut dyn MessageDyn;
    fn reserve(&mut self, additional: usize);
}

impl<M: Message> MessageSeq for Vec<M> {
    fn len(&self) -> usize {
        Vec::len(self)
    }
    fn get(&self, i: usize) -> &dyn MessageDyn {
        &self[i]
    }
    fn push_default(&mut self) -> &mut dyn MessageDyn {
        self.push(M::default());
        let i = Vec::len(self) - 1;
        &mut self[i]
    }
    fn reserve(&mut self, additional: usize) {
        Vec::reserve(self, additional);
    }
}

/// Fixed array of records (`[M; N]`), filled slot by slot.
pub trait MessageArray {
    fn len(&self) -> usize;
    fn get(&self, i: usize) -> &dyn MessageDyn;
    fn get_mut(&mut self, i: usize) -> &mut dyn MessageDyn;
    /// Stable address of the first slot; keys the buffer's fill-position
    /// side map.
    fn data_key(&self) -> usize;
}

impl<M: Message> MessageArray for [M] {
    fn len(&self) -> usize {
        <[M]>::len(self)
    }
    fn get(&self, i: usize) -> &dyn MessageDyn {
        &self[i]
    }
    fn get_mut(&mut self, i: usize) -> &mut dyn MessageDyn {
        &mut self[i]
    }
    fn data_key(&self) -> usize {
        self.as_ptr() as usize
    }
}

/// Optional record handle (`Option<M>` or `Option<Box<M>>`); decoding merges
/// into the existing value or allocates a default first.
pub trait MessageOpt {
    fn get(&self) -> Option<&dyn MessageDyn>;
    fn get_or_insert_default(&mut self) -> &mut dyn MessageDyn;
}

/// A self-coding type that appends its wire payload directly into a buffer.
/// For `bytes`-typed fields the codec writes the tag and length prefix; the
/// appender writes only the payload.
pub trait Appender {
    fn append_to(&self, buf: &mut Buffer<'_>) -> Result<()>;
}

/// A self-coding type that produces its wire payload as a byte vector.
pub trait Marshaler {
    fn marshal(&self) -> Result<Vec<u8>>;
}

/// A self-coding type that reconstructs itself from its wire payload. The
/// payload excludes the tag and, for `bytes` fields, the length prefix.
pub trait Unmarshaler {
    fn unmarshal(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Read handle to a self-coding value, whichever capability it carries.
#[derive(Clone, Copy)]
pub enum CustomRef<'a> {
    Appender(&'a dyn Appender),
    Marshaler(&'a dyn Marshaler),
}

/// Optional self-coding handle (`Option<Box<T>>`).
pub trait CustomOpt {
    fn get_or_insert_default(&mut self) -> &mut dyn Unmarshaler;
}

/// Growable sequence of self-coding values (`Vec<T>`).
pub trait CustomSeq {
    fn len(&self) -> usize;
    fn get(&self, i: usize) -> CustomRef<'_>;
    fn push_default(&mut self) -> &mut dyn Unmarshaler;
    fn reserve(&mut self, additional: usize);
}
