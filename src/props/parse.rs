//! # Tag Parsing and Codec Selection
//!
//! A field tag is a comma-separated string whose first two items are
//! mandatory: the wire-encoding name and the field number.
//!
//! | Token | Wire type | Integer semantics |
//! |-------|-----------|-------------------|
//! | `varint` | varint | plain unsigned/signed varint |
//! | `zigzag32` | varint | zig-zag signed 32 |
//! | `zigzag64` | varint | zig-zag signed 64 |
//! | `fixed32` | fixed-32 | unsigned 32 |
//! | `fixed64` | fixed-64 | unsigned 64 |
//! | `bytes` | length-delimited | strings, byte buffers, records, maps |
//! | `-` (alone) | (none) | field excluded from the codec |
//!
//! Further recognized items: `optional` (schema metadata only) and
//! `name=<id>` (overrides the emitted schema field name). Codec selection
//! crosses the parsed encoding with the field's element shape and rejects
//! impossible pairings at plan time: `f32` demands `fixed32`, `f64` demands
//! `fixed64`, strings, records and maps demand `bytes`, and an integer
//! encoding must cover its element's width.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::props::{
    FieldCodec, Property, SchemaType, StructProperties, ValueCodec, FIXED32_CODEC, FIXED64_CODEC,
    VARINT_CODEC, ZIGZAG32_CODEC, ZIGZAG64_CODEC,
};
use crate::reflect::{ElementType, FieldDescriptor, ScalarKind, TypeDescriptor};
use crate::wire::{self, WireType, MAX_FIELD_NUMBER};

/// The declared integer encoding of a field tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IntEncoder {
    /// `bytes` fields have no integer encoding.
    None,
    Varint,
    Fixed32,
    Fixed64,
    Zigzag32,
    Zigzag64,
}

/// The outcome of parsing a tag string's mandatory items.
pub(crate) struct TagInfo {
    pub encoder: IntEncoder,
    pub wire_type: WireType,
    pub value_codec: Option<ValueCodec>,
    pub field_number: u32,
    pub is_optional: bool,
}

/// The outcome of crossing a tag with an element shape.
pub(crate) struct Selection {
    pub codec: FieldCodec,
    pub wire_type: WireType,
    pub value_codec: Option<ValueCodec>,
    pub schema_type: SchemaType,
    pub is_marshaler: bool,
    pub is_appender: bool,
}

pub(crate) type Resolver<'r> =
    dyn FnMut(&'static TypeDescriptor) -> Result<Arc<StructProperties>> + 'r;

/// Parses a tag string. Returns `None` for the exclusion marker `"-"`.
pub(crate) fn parse_tag(field_name: &str, tag: &str) -> Result<Option<TagInfo>> {
    let mut items = tag.split(',');
    let head = items.next().unwrap_or("");

    let Some(number_item) = items.next() else {
        if head == "-" {
            return Ok(None);
        }
        return Err(Error::MissingTag {
            field: field_name.to_string(),
            tag: tag.to_string(),
        });
    };

    let (encoder, wire_type, value_codec) = match head {
        "varint" => (IntEncoder::Varint, WireType::Varint, Some(VARINT_CODEC)),
        "zigzag32" => (IntEncoder::Zigzag32, WireType::Varint, Some(ZIGZAG32_CODEC)),
        "zigzag64" => (IntEncoder::Zigzag64, WireType::Varint, Some(ZIGZAG64_CODEC)),
        "fixed32" => (IntEncoder::Fixed32, WireType::Fixed32, Some(FIXED32_CODEC)),
        "fixed64" => (IntEncoder::Fixed64, WireType::Fixed64, Some(FIXED64_CODEC)),
        "bytes" => (IntEncoder::None, WireType::Bytes, None),
        _ => {
            return Err(Error::UnknownWireToken {
                field: field_name.to_string(),
                tag: tag.to_string(),
            });
        }
    };

    let field_number = match number_item.parse::<i64>() {
        Ok(n) if n > 0 && n <= i64::from(MAX_FIELD_NUMBER) => n as u32,
        _ => {
            return Err(Error::BadTagNumber {
                field: field_name.to_string(),
                tag: tag.to_string(),
            });
        }
    };

    let mut is_optional = false;
    for item in items {
        if item == "optional" {
            // schema metadata only; the codec itself ignores it
            is_optional = true;
        }
        // unrecognized items (including name=) are handled elsewhere or ignored
    }

    Ok(Some(TagInfo {
        encoder,
        wire_type,
        value_codec,
        field_number,
        is_optional,
    }))
}

/// Parses the comma-separated number list of a `Reserved` field into `out`.
pub(crate) fn parse_reserved(owner: &str, tag: &str, out: &mut Vec<u32>) -> Result<()> {
    for item in tag.split(',') {
        match item.trim().parse::<i64>() {
            Ok(n) if n > 0 && n <= i64::from(MAX_FIELD_NUMBER) => out.push(n as u32),
            _ => {
                return Err(Error::BadTagNumber {
                    field: format!("{owner} reserved list"),
                    tag: item.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// The `.proto` scalar type implied by an element kind crossed with its
/// declared integer encoding, or a `WireMismatch` when the pairing cannot
/// work.
fn scalar_proto_name(
    field_name: &str,
    kind: ScalarKind,
    info: &TagInfo,
) -> Result<&'static str> {
    let mismatch = || Error::WireMismatch {
        field: field_name.to_string(),
        kind: kind.rust_name(),
        wire: info.wire_type,
    };

    if kind == ScalarKind::F32 {
        return if info.encoder == IntEncoder::Fixed32 {
            Ok("float")
        } else {
            Err(mismatch())
        };
    }
    if kind == ScalarKind::F64 {
        return if info.encoder == IntEncoder::Fixed64 {
            Ok("double")
        } else {
            Err(mismatch())
        };
    }
    if kind == ScalarKind::Bool {
        // any integer encoding carries a bool; the schema type stays `bool`
        return if info.encoder == IntEncoder::None {
            Err(mismatch())
        } else {
            Ok("bool")
        };
    }

    match info.encoder {
        IntEncoder::None => Err(mismatch()),
        IntEncoder::Varint => Ok(match (kind.is_signed(), kind.is_wide()) {
            (true, false) => "int32",
            (false, false) => "uint32",
            (true, true) => "int64",
            (false, true) => "uint64",
        }),
        IntEncoder::Fixed32 if !kind.is_wide() => {
            Ok(if kind.is_signed() { "sfixed32" } else { "fixed32" })
        }
        IntEncoder::Fixed64 if kind.is_wide() => {
            Ok(if kind.is_signed() { "sfixed64" } else { "fixed64" })
        }
        IntEncoder::Zigzag32 if !kind.is_wide() => Ok("sint32"),
        IntEncoder::Zigzag64 if kind.is_wide() => Ok("sint64"),
        _ => Err(mismatch()),
    }
}

fn require_bytes(field_name: &str, kind: &'static str, info: &TagInfo) -> Result<()> {
    if info.wire_type == WireType::Bytes {
        Ok(())
    } else {
        Err(Error::WireMismatch {
            field: field_name.to_string(),
            kind,
            wire: info.wire_type,
        })
    }
}

/// Crosses an element shape with a parsed tag and picks the codec, the
/// effective wire type (repeated scalars collapse to one length-delimited
/// packed block), the value codec, and the schema rendering.
pub(crate) fn select_codec(
    field_name: &str,
    element: &ElementType,
    info: &TagInfo,
    key_tag: Option<&'static str>,
    val_tag: Option<&'static str>,
    resolve: &mut Resolver<'_>,
) -> Result<Selection> {
    let mut sel = Selection {
        codec: FieldCodec::Nothing,
        wire_type: info.wire_type,
        value_codec: info.value_codec,
        schema_type: SchemaType::Simple {
            name: "bool",
            repeated: false,
        },
        is_marshaler: false,
        is_appender: false,
    };

    match element {
        ElementType::Scalar(kind) => {
            let name = scalar_proto_name(field_name, *kind, info)?;
            sel.codec = FieldCodec::Scalar(*kind);
            sel.schema_type = SchemaType::Simple {
                name,
                repeated: false,
            };
        }
        ElementType::OptScalar(kind) => {
            let name = scalar_proto_name(field_name, *kind, info)?;
            sel.codec = FieldCodec::OptScalar(*kind);
            sel.schema_type = SchemaType::Simple {
                name,
                repeated: false,
            };
        }
        ElementType::ScalarSeq(kind) => {
            let name = scalar_proto_name(field_name, *kind, info)?;
            sel.codec = FieldCodec::PackedSeq(*kind);
            // packed is implied in protobuf v3: one length-delimited block
            sel.wire_type = WireType::Bytes;
            sel.schema_type = SchemaType::Simple {
                name,
                repeated: true,
            };
        }
        ElementType::ScalarArray(kind, n) => {
            let name = scalar_proto_name(field_name, *kind, info)?;
            sel.codec = if *n == 0 {
                FieldCodec::Nothing
            } else {
                FieldCodec::PackedArray(*kind, *n)
            };
            sel.wire_type = WireType::Bytes;
            sel.schema_type = SchemaType::Simple {
                name,
                repeated: true,
            };
        }
        ElementType::Str => {
            require_bytes(field_name, "String", info)?;
            sel.codec = FieldCodec::Str;
            sel.schema_type = SchemaType::Simple {
                name: "string",
                repeated: false,
            };
        }
        ElementType::OptStr => {
            require_bytes(field_name, "Option<String>", info)?;
            sel.codec = FieldCodec::OptStr;
            sel.schema_type = SchemaType::Simple {
                name: "string",
                repeated: false,
            };
        }
        ElementType::StrSeq => {
            require_bytes(field_name, "Vec<String>", info)?;
            sel.codec = FieldCodec::StrSeq;
            sel.schema_type = SchemaType::Simple {
                name: "string",
                repeated: true,
            };
        }
        ElementType::StrArray(n) => {
            require_bytes(field_name, "[String; N]", info)?;
            sel.codec = if *n == 0 {
                FieldCodec::Nothing
            } else {
                FieldCodec::StrArray(*n)
            };
            sel.schema_type = SchemaType::Simple {
                name: "string",
                repeated: true,
            };
        }
        ElementType::Bytes => {
            require_bytes(field_name, "Vec<u8>", info)?;
            sel.codec = FieldCodec::Bytes;
            sel.schema_type = SchemaType::Simple {
                name: "bytes",
                repeated: false,
            };
        }
        ElementType::ByteArray(n) => {
            require_bytes(field_name, "[u8; N]", info)?;
            sel.codec = if *n == 0 {
                FieldCodec::Nothing
            } else {
                FieldCodec::ByteArray(*n)
            };
            sel.schema_type = SchemaType::Simple {
                name: "bytes",
                repeated: false,
            };
        }
        ElementType::BytesSeq => {
            require_bytes(field_name, "Vec<Vec<u8>>", info)?;
            sel.codec = FieldCodec::BytesSeq;
            sel.schema_type = SchemaType::Simple {
                name: "bytes",
                repeated: true,
            };
        }
        ElementType::Message(desc) => {
            require_bytes(field_name, "record", info)?;
            sel.codec = FieldCodec::Message(resolve(desc)?);
            sel.schema_type = SchemaType::Message {
                name: desc.name,
                repeated: false,
            };
        }
        ElementType::OptMessage(desc) => {
            require_bytes(field_name, "record", info)?;
            sel.codec = FieldCodec::OptMessage(resolve(desc)?);
            sel.schema_type = SchemaType::Message {
                name: desc.name,
                repeated: false,
            };
        }
        ElementType::MessageSeq(desc) => {
            require_bytes(field_name, "record sequence", info)?;
            sel.codec = FieldCodec::MessageSeq(resolve(desc)?);
            sel.schema_type = SchemaType::Message {
                name: desc.name,
                repeated: true,
            };
        }
        ElementType::MessageArray(desc, n) => {
            require_bytes(field_name, "record array", info)?;
            sel.codec = if *n == 0 {
                FieldCodec::Nothing
            } else {
                FieldCodec::MessageArray(resolve(desc)?, *n)
            };
            sel.schema_type = SchemaType::Message {
                name: desc.name,
                repeated: true,
            };
        }
        ElementType::Map { key, value } => {
            require_bytes(field_name, "map", info)?;
            let key_prop = build_map_side(field_name, "key", key_tag, key.as_ref(), 1, resolve)?;
            let val_prop =
                build_map_side(field_name, "value", val_tag, value.as_ref(), 2, resolve)?;
            sel.codec = FieldCodec::Map {
                key: Box::new(key_prop),
                value: Box::new(val_prop),
            };
            sel.schema_type = SchemaType::Map;
        }
        ElementType::Timestamp => {
            require_bytes(field_name, "timestamp", info)?;
            sel.codec = FieldCodec::Timestamp;
            sel.schema_type = SchemaType::Timestamp { repeated: false };
        }
        ElementType::OptTimestamp => {
            require_bytes(field_name, "timestamp", info)?;
            sel.codec = FieldCodec::OptTimestamp;
            sel.schema_type = SchemaType::Timestamp { repeated: false };
        }
        ElementType::TimestampSeq => {
            require_bytes(field_name, "timestamp sequence", info)?;
            sel.codec = FieldCodec::TimestampSeq;
            sel.schema_type = SchemaType::Timestamp { repeated: true };
        }
        ElementType::TimestampArray(n) => {
            require_bytes(field_name, "timestamp array", info)?;
            sel.codec = if *n == 0 {
                FieldCodec::Nothing
            } else {
                FieldCodec::TimestampArray(*n)
            };
            sel.schema_type = SchemaType::Timestamp { repeated: true };
        }
        ElementType::Duration => {
            require_bytes(field_name, "duration", info)?;
            sel.codec = FieldCodec::Duration;
            sel.schema_type = SchemaType::Duration { repeated: false };
        }
        ElementType::OptDuration => {
            require_bytes(field_name, "duration", info)?;
            sel.codec = FieldCodec::OptDuration;
            sel.schema_type = SchemaType::Duration { repeated: false };
        }
        ElementType::DurationSeq => {
            require_bytes(field_name, "duration sequence", info)?;
            sel.codec = FieldCodec::DurationSeq;
            sel.schema_type = SchemaType::Duration { repeated: true };
        }
        ElementType::DurationArray(n) => {
            require_bytes(field_name, "duration array", info)?;
            sel.codec = if *n == 0 {
                FieldCodec::Nothing
            } else {
                FieldCodec::DurationArray(*n)
            };
            sel.schema_type = SchemaType::Duration { repeated: true };
        }
        ElementType::Custom(ct) => {
            sel.codec = FieldCodec::Custom;
            sel.is_marshaler = ct.marshaler;
            sel.is_appender = !ct.marshaler;
            sel.schema_type = SchemaType::Custom {
                ct: *ct,
                repeated: false,
            };
        }
        ElementType::OptCustom(ct) => {
            sel.codec = FieldCodec::OptCustom;
            sel.is_marshaler = ct.marshaler;
            sel.is_appender = !ct.marshaler;
            sel.schema_type = SchemaType::Custom {
                ct: *ct,
                repeated: false,
            };
        }
        ElementType::CustomSeq(ct) => {
            sel.codec = FieldCodec::CustomSeq;
            sel.is_marshaler = ct.marshaler;
            sel.is_appender = !ct.marshaler;
            sel.schema_type = SchemaType::Custom {
                ct: *ct,
                repeated: true,
            };
        }
        ElementType::Reserved | ElementType::Excluded => {
            // handled before codec selection
            return Err(Error::Unsupported(field_name.to_string()));
        }
    }

    Ok(sel)
}

/// Builds the key or value sub-plan of a map field and enforces its field
/// number (key = 1, value = 2).
fn build_map_side(
    owner_field: &str,
    side: &'static str,
    tag: Option<&'static str>,
    element: &ElementType,
    expect_number: u32,
    resolve: &mut Resolver<'_>,
) -> Result<Property> {
    let bad = |detail: String| Error::BadMapEntry {
        field: owner_field.to_string(),
        detail,
    };

    let tag = tag.ok_or_else(|| bad(format!("lacks a {side} tag")))?;
    let info = parse_tag(side, tag)?.ok_or_else(|| bad(format!("{side} tag cannot be \"-\"")))?;
    if info.field_number != expect_number {
        return Err(bad(format!(
            "{side} tag ({tag}) doesn't use field number {expect_number}"
        )));
    }
    if matches!(element, ElementType::Map { .. }) {
        return Err(bad(format!("{side} cannot itself be a map")));
    }

    let sel = select_codec(side, element, &info, None, None, resolve)?;
    Ok(Property {
        name: side,
        wire: tag,
        field_number: info.field_number,
        wire_type: sel.wire_type,
        tag_prefix: wire::tag_prefix(info.field_number, sel.wire_type),
        field_index: 0,
        codec: sel.codec,
        value_codec: sel.value_codec,
        schema_type: sel.schema_type,
        is_optional: info.is_optional,
        is_marshaler: sel.is_marshaler,
        is_appender: sel.is_appender,
    })
}

/// Compiles one descriptor field into a property. Returns `None` for
/// excluded fields.
pub(crate) fn build_property(
    field: &'static FieldDescriptor,
    field_index: usize,
    resolve: &mut Resolver<'_>,
) -> Result<Option<Property>> {
    let Some(info) = parse_tag(field.name, field.tag)? else {
        return Ok(None);
    };

    let element = (field.element)();
    let sel = select_codec(
        field.name,
        &element,
        &info,
        field.key_tag,
        field.val_tag,
        resolve,
    )?;

    Ok(Some(Property {
        name: field.name,
        wire: field.tag,
        field_number: info.field_number,
        wire_type: sel.wire_type,
        tag_prefix: wire::tag_prefix(info.field_number, sel.wire_type),
        field_index,
        codec: sel.codec,
        value_codec: sel.value_codec,
        schema_type: sel.schema_type,
        is_optional: info.is_optional,
        is_marshaler: sel.is_marshaler,
        is_appender: sel.is_appender,
    }))
}
