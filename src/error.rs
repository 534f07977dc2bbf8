//! # Error Types
//!
//! Two taxonomies share one enum: plan-time errors raised while compiling a
//! field plan (malformed tags, duplicate or reserved field numbers, wire/kind
//! mismatches) and wire-time errors raised while reading or writing the byte
//! stream (truncation, varint overflow, bad lengths, wire-type disagreements).
//!
//! Plan-time errors are programmer errors: they are logged through `log::warn!`
//! at the point of failure and the partially built cache entry is rolled back.
//! Wire-time errors are returned to the caller and never logged.

use crate::wire::WireType;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Returned by `Buffer::find` when no item with the requested field
    /// number exists ahead of the cursor.
    #[error("field number not found in buffer")]
    NotFound,

    /// The input ended in the middle of a value.
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// A varint ran past 10 bytes, or its 10th byte carries bits that do not
    /// fit in 64 bits.
    #[error("varint overflows 64 bits")]
    Overflow,

    /// A length-delimited byte count is not representable or exceeds the
    /// remaining input.
    #[error("byte length {0} out of range")]
    BadLength(u64),

    /// A field arrived with a wire type other than the one its plan expects.
    #[error("bad wire type for field '{field}': got {got}, want {want}")]
    BadWireType {
        field: &'static str,
        got: WireType,
        want: WireType,
    },

    /// An unknown field whose wire type the decoder cannot skip.
    #[error("cannot skip unknown wire type {0}")]
    UnknownWireType(u8),

    /// A tag varint decoded to field number zero.
    #[error("illegal field number 0 (wire type {0})")]
    IllegalTag(u8),

    /// A field tag string with fewer than the two mandatory items.
    #[error("tag of '{field}' has too few fields: '{tag}'")]
    MissingTag { field: String, tag: String },

    /// A field tag string whose first item is not a recognized wire-encoding
    /// name.
    #[error("tag of '{field}' has unknown wire token: '{tag}'")]
    UnknownWireToken { field: String, tag: String },

    /// A field number that is not a positive integer.
    #[error("tag id of '{field}' out of range: '{tag}'")]
    BadTagNumber { field: String, tag: String },

    /// Two fields of one record share a field number.
    #[error("duplicate field number {number} assigned to {owner}")]
    DuplicateTag { owner: String, number: u32 },

    /// A field uses a number listed as reserved on the same record.
    #[error("reserved field number {number} assigned to {owner}")]
    ReservedTag { owner: String, number: u32 },

    /// The declared wire encoding cannot represent the field's element kind,
    /// e.g. `f32` with anything but `fixed32`.
    #[error("field '{field}' ({kind}) cannot have wire type {wire}")]
    WireMismatch {
        field: String,
        kind: &'static str,
        wire: WireType,
    },

    /// The field's element shape has no codec at all.
    #[error("no encoder/decoder for field '{0}'")]
    Unsupported(String),

    /// A malformed map field: missing or wrong key/value sub-tags at plan
    /// time, or an entry on the wire carrying a tag other than the key or
    /// value tag.
    #[error("bad map entry for '{field}': {detail}")]
    BadMapEntry { field: String, detail: String },

    /// A plan and the record it is being executed against disagree. Plans are
    /// derived from the same generated descriptors the accessors come from,
    /// so this indicates a hand-rolled accessor gone wrong.
    #[error("field plan does not match record layout at field '{0}'")]
    PlanMismatch(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
