//! # Field Encoders
//!
//! One encoding rule per container shape, driven by the property's
//! [`FieldCodec`] variant. Default omission follows proto3: zero scalars,
//! empty strings, empty byte buffers and empty sequences/maps emit nothing;
//! optional fields emit whenever present, even holding the default value;
//! fixed arrays and by-value composites always emit.
//!
//! Nested payloads are length-then-bytes, and the length cannot be known
//! before encoding, so composite encoders write the payload into a scratch
//! buffer, measure it, then emit the length and copy the bytes.

use time::{Duration, OffsetDateTime};

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::props::{FieldCodec, Property, StructProperties};
use crate::reflect::{CustomRef, FieldRef, MessageDyn};
use crate::wire::WireType;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Encodes every field of `msg` in field-number order.
pub(crate) fn encode_struct(
    plan: &StructProperties,
    msg: &dyn MessageDyn,
    buf: &mut Buffer<'_>,
) -> Result<()> {
    for prop in plan.props() {
        encode_field(prop, msg.field(prop.field_index), buf)?;
    }
    Ok(())
}

pub(crate) fn encode_field(
    prop: &Property,
    value: FieldRef<'_>,
    buf: &mut Buffer<'_>,
) -> Result<()> {
    match (&prop.codec, value) {
        (FieldCodec::Scalar(_), FieldRef::Scalar(v)) => {
            if v.is_zero() {
                return Ok(());
            }
            let vc = prop.value_codec.as_ref().ok_or(Error::PlanMismatch(prop.name))?;
            buf.append(&prop.tag_prefix);
            (vc.encode)(buf, v.to_raw());
        }
        (FieldCodec::OptScalar(_), FieldRef::OptScalar(v)) => {
            // presence, not value, decides: Some(0) still encodes
            let Some(v) = v else { return Ok(()) };
            let vc = prop.value_codec.as_ref().ok_or(Error::PlanMismatch(prop.name))?;
            buf.append(&prop.tag_prefix);
            (vc.encode)(buf, v.to_raw());
        }
        (FieldCodec::PackedSeq(_), FieldRef::Scalars(s)) => {
            if s.is_empty() {
                return Ok(());
            }
            encode_packed(prop, s, buf)?;
        }
        (FieldCodec::PackedArray(_, _), FieldRef::Scalars(s)) => {
            // fixed arrays have no empty state; the packed block always goes out
            encode_packed(prop, s, buf)?;
        }
        (FieldCodec::Str, FieldRef::Str(s)) => {
            if s.is_empty() {
                return Ok(());
            }
            buf.append(&prop.tag_prefix);
            buf.encode_raw_bytes(s.as_bytes());
        }
        (FieldCodec::OptStr, FieldRef::OptStr(s)) => {
            let Some(s) = s else { return Ok(()) };
            buf.append(&prop.tag_prefix);
            buf.encode_raw_bytes(s.as_bytes());
        }
        (FieldCodec::StrSeq, FieldRef::Strs(v)) | (FieldCodec::StrArray(_), FieldRef::Strs(v)) => {
            for s in v {
                buf.append(&prop.tag_prefix);
                buf.encode_raw_bytes(s.as_bytes());
            }
        }
        (FieldCodec::Bytes, FieldRef::Bytes(b)) => {
            if b.is_empty() {
                return Ok(());
            }
            buf.append(&prop.tag_prefix);
            buf.encode_raw_bytes(b);
        }
        (FieldCodec::ByteArray(_), FieldRef::Bytes(b)) => {
            buf.append(&prop.tag_prefix);
            buf.encode_raw_bytes(b);
        }
        (FieldCodec::BytesSeq, FieldRef::BytesSeq(v)) => {
            for b in v {
                buf.append(&prop.tag_prefix);
                buf.encode_raw_bytes(b);
            }
        }
        (FieldCodec::Message(plan), FieldRef::Msg(m)) => {
            buf.append(&prop.tag_prefix);
            encode_embedded(plan, m, buf)?;
        }
        (FieldCodec::OptMessage(plan), FieldRef::OptMsg(m)) => {
            let Some(m) = m else { return Ok(()) };
            buf.append(&prop.tag_prefix);
            encode_embedded(plan, m, buf)?;
        }
        (FieldCodec::MessageSeq(plan), FieldRef::Msgs(seq)) => {
            for i in 0..seq.len() {
                buf.append(&prop.tag_prefix);
                encode_embedded(plan, seq.get(i), buf)?;
            }
        }
        (FieldCodec::MessageArray(plan, _), FieldRef::MsgArray(arr)) => {
            for i in 0..arr.len() {
                buf.append(&prop.tag_prefix);
                encode_embedded(plan, arr.get(i), buf)?;
            }
        }
        (FieldCodec::Map { key, value }, FieldRef::Map(map)) => {
            if map.is_empty() {
                return Ok(());
            }
            map.visit_entries(&mut |kr, vr| {
                let mut entry = Buffer::new();
                encode_field(key, kr, &mut entry)?;
                encode_field(value, vr, &mut entry)?;
                buf.append(&prop.tag_prefix);
                buf.encode_raw_bytes(entry.bytes());
                Ok(())
            })?;
        }
        (FieldCodec::Timestamp, FieldRef::Time(t)) => {
            buf.append(&prop.tag_prefix);
            encode_timestamp(t, buf);
        }
        (FieldCodec::OptTimestamp, FieldRef::OptTime(t)) => {
            let Some(t) = t else { return Ok(()) };
            buf.append(&prop.tag_prefix);
            encode_timestamp(t, buf);
        }
        (FieldCodec::TimestampSeq, FieldRef::Times(ts))
        | (FieldCodec::TimestampArray(_), FieldRef::Times(ts)) => {
            for &t in ts {
                buf.append(&prop.tag_prefix);
                encode_timestamp(t, buf);
            }
        }
        (FieldCodec::Duration, FieldRef::Dur(d)) => {
            buf.append(&prop.tag_prefix);
            encode_duration(d, buf);
        }
        (FieldCodec::OptDuration, FieldRef::OptDur(d)) => {
            let Some(d) = d else { return Ok(()) };
            buf.append(&prop.tag_prefix);
            encode_duration(d, buf);
        }
        (FieldCodec::DurationSeq, FieldRef::Durs(ds))
        | (FieldCodec::DurationArray(_), FieldRef::Durs(ds)) => {
            for &d in ds {
                buf.append(&prop.tag_prefix);
                encode_duration(d, buf);
            }
        }
        (FieldCodec::Custom, FieldRef::Custom(c)) => {
            encode_custom(prop, c, buf)?;
        }
        (FieldCodec::OptCustom, FieldRef::OptCustom(c)) => {
            let Some(c) = c else { return Ok(()) };
            encode_custom(prop, c, buf)?;
        }
        (FieldCodec::CustomSeq, FieldRef::Customs(seq)) => {
            for i in 0..seq.len() {
                encode_custom(prop, seq.get(i), buf)?;
            }
        }
        (FieldCodec::Nothing, _) => {}
        (_, FieldRef::Skip) => {}
        _ => return Err(Error::PlanMismatch(prop.name)),
    }
    Ok(())
}

/// One length-delimited block of concatenated values.
fn encode_packed(
    prop: &Property,
    values: crate::reflect::ScalarSlice<'_>,
    buf: &mut Buffer<'_>,
) -> Result<()> {
    let vc = prop.value_codec.as_ref().ok_or(Error::PlanMismatch(prop.name))?;
    let mut block = Buffer::new();
    for i in 0..values.len() {
        (vc.encode)(&mut block, values.raw_at(i));
    }
    buf.append(&prop.tag_prefix);
    buf.encode_raw_bytes(block.bytes());
    Ok(())
}

/// Writes a nested record as length-then-bytes via a scratch buffer.
pub(crate) fn encode_embedded(
    plan: &StructProperties,
    msg: &dyn MessageDyn,
    buf: &mut Buffer<'_>,
) -> Result<()> {
    let mut payload = Buffer::new();
    encode_struct(plan, msg, &mut payload)?;
    buf.encode_raw_bytes(payload.bytes());
    Ok(())
}

/// `google.protobuf.Timestamp`: seconds (#1, varint) and nanos (#2, varint),
/// both omitted when zero.
fn encode_timestamp(t: OffsetDateTime, buf: &mut Buffer<'_>) {
    let total = t.unix_timestamp_nanos();
    let secs = total.div_euclid(NANOS_PER_SEC) as i64;
    let nanos = total.rem_euclid(NANOS_PER_SEC) as i64;
    encode_secs_nanos(secs, nanos, buf);
}

/// `google.protobuf.Duration`: same two-field shape; seconds and nanos carry
/// the same sign.
fn encode_duration(d: Duration, buf: &mut Buffer<'_>) {
    encode_secs_nanos(d.whole_seconds(), i64::from(d.subsec_nanoseconds()), buf);
}

fn encode_secs_nanos(secs: i64, nanos: i64, buf: &mut Buffer<'_>) {
    let mut payload = Buffer::new();
    if secs != 0 {
        payload.append(&[0x08]);
        payload.encode_varint(secs as u64);
    }
    if nanos != 0 {
        payload.append(&[0x10]);
        payload.encode_varint(nanos as u64);
    }
    buf.encode_raw_bytes(payload.bytes());
}

/// Self-coding values: the type produces its own payload; the codec supplies
/// the tag and, for length-delimited fields, the length prefix.
fn encode_custom(prop: &Property, value: CustomRef<'_>, buf: &mut Buffer<'_>) -> Result<()> {
    buf.append(&prop.tag_prefix);
    match (value, prop.wire_type) {
        (CustomRef::Marshaler(m), WireType::Bytes) => {
            let bytes = m.marshal()?;
            buf.encode_raw_bytes(&bytes);
        }
        (CustomRef::Marshaler(m), _) => {
            let bytes = m.marshal()?;
            buf.append(&bytes);
        }
        (CustomRef::Appender(a), WireType::Bytes) => {
            let mut payload = Buffer::new();
            a.append_to(&mut payload)?;
            buf.encode_raw_bytes(payload.bytes());
        }
        (CustomRef::Appender(a), _) => {
            a.append_to(buf)?;
        }
    }
    Ok(())
}
