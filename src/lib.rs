//! # protoplan - Plan-Driven Protobuf v3 Codec
//!
//! protoplan converts native Rust record types to and from the Protocol
//! Buffers v3 binary wire format. Its core is a reflection-style codec: for
//! every record type it synthesizes a per-field encode/decode plan once,
//! caches it for the life of the process, and then executes that plan in
//! tight loops over a byte stream. Plans are derived from per-field tag
//! strings attached to the record definition by the [`message!`] macro.
//!
//! ## Quick Start
//!
//! ```ignore
//! protoplan::message! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Sample {
//!         pub id: u32 => "varint,1",
//!         pub label: String => "bytes,2",
//!         pub readings: Vec<i32> => "varint,6",
//!     }
//! }
//!
//! let s = Sample { id: 7, label: "probe".into(), readings: vec![3, 270] };
//! let bytes = protoplan::marshal(&s)?;
//!
//! let mut back = Sample::default();
//! protoplan::unmarshal(&bytes, &mut back)?;
//! assert_eq!(s, back);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │  Public API (marshal / unmarshal /     │
//! │  Buffer / as_proto)                    │
//! ├────────────────────────────────────────┤
//! │  Drivers (codec::encode, codec::decode)│
//! ├────────────────────────────────────────┤
//! │  Field plans (props) + plan cache      │
//! ├────────────────────────────────────────┤
//! │  Record introspection (reflect +       │
//! │  message! expansion)                   │
//! ├────────────────────────────────────────┤
//! │  Buffer (cursor, limits, side maps)    │
//! ├────────────────────────────────────────┤
//! │  Wire primitives (varint, zig-zag,     │
//! │  fixed-32/64, length-delimited)        │
//! └────────────────────────────────────────┘
//! ```
//!
//! ## Design Notes
//!
//! - Plans are data, not code: a [`StructProperties`] is a
//!   field-number-sorted table of [`Property`] entries; the drivers dispatch
//!   on each property's codec variant. [`get_properties`] exposes the table,
//!   and the schema emitter walks the same tables to reconstruct `.proto`
//!   text.
//! - The plan cache takes a shared lock on the hit path and builds plans
//!   under a writer lock; recursive type references resolve because a
//!   type's plan handle is registered before its fields are walked.
//! - Decoding merges: scalars overwrite, sequences append, map entries
//!   overwrite by key, nested records merge recursively. Zero the
//!   destination first for replacement semantics.
//! - Buffers either own their bytes or borrow the caller's input; borrowed
//!   payload views are read-only reborrows, and decoded records never alias
//!   the input.
//!
//! ## Module Overview
//!
//! - [`wire`]: stateless wire-format primitives
//! - [`buffer`]: the reusable marshal/unmarshal [`Buffer`]
//! - [`reflect`]: record descriptors and dynamic field access
//! - [`props`]: compiled field plans and the process-wide plan cache
//! - [`codec`]: the encode/decode drivers
//! - [`schema`]: `.proto` text reconstruction
//! - [`debug`]: a wire-level dump for troubleshooting

pub mod buffer;
pub mod codec;
pub mod debug;
pub mod error;
pub mod macros;
pub mod props;
pub mod reflect;
pub mod schema;
pub mod wire;

pub use buffer::Buffer;
pub use codec::{marshal, unmarshal};
pub use debug::debug_print;
pub use error::{Error, Result};
pub use props::cache::{get_properties, get_properties_of};
pub use props::{Property, StructProperties};
pub use reflect::{Appender, Marshaler, Message, MessageDyn, Reserved, Unmarshaler};
pub use schema::{as_proto, as_proto_full, as_proto_full_with, SchemaOptions};
pub use wire::WireType;

#[doc(hidden)]
pub mod __private {
    pub use crate::codec::decode::decode_embedded_value;
}
