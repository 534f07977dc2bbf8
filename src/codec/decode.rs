//! # Field Decoders
//!
//! The decode driver reads tags off the wire and dispatches to the matching
//! property. The sorted plan is walked with a remembered index: consecutive
//! wire fields usually arrive in ascending order, so the common case is a
//! short forward scan; if the incoming field number regresses (legal but
//! unusual), the scan restarts from the front of the plan.
//!
//! Unknown field numbers are skipped by their wire type. Unknown wire types
//! and wire types that disagree with the plan are fatal. Nested payloads
//! decode in place by narrowing the buffer's read limit rather than copying
//! the payload out.

use time::{Duration, OffsetDateTime};

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::props::{FieldCodec, Property, StructProperties};
use crate::reflect::{
    FieldMut, Message, MessageDyn, ScalarArrayMut, ScalarVecMut,
};
use crate::wire::WireType;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Decodes from the cursor to the buffer limit into `msg`.
pub(crate) fn decode_struct(
    plan: &StructProperties,
    msg: &mut dyn MessageDyn,
    buf: &mut Buffer<'_>,
) -> Result<()> {
    let props = plan.props();
    let mut pidx = 0usize; // where the next plan search starts
    let mut prev_number = 0u64; // last field number looked up
    let mut current: Option<usize> = None; // plan slot for prev_number, if any

    while buf.remaining() > 0 {
        let (number, wire) = buf.read_tag()?;

        if number != prev_number {
            if number < prev_number {
                // the order on the wire has jumped backwards; restart the scan
                pidx = 0;
            }
            prev_number = number;
            current = None;
            while pidx < props.len() {
                let n = u64::from(props[pidx].field_number);
                if n >= number {
                    if n == number {
                        current = Some(pidx);
                    }
                    break;
                }
                pidx += 1;
            }
        }

        let Some(ci) = current else {
            // unknown field: skip it by its own wire type
            buf.skip_wire(wire)?;
            continue;
        };

        let prop = &props[ci];
        if wire != prop.wire_type {
            return Err(Error::BadWireType {
                field: prop.name,
                got: wire,
                want: prop.wire_type,
            });
        }

        decode_field(prop, msg.field_mut(prop.field_index), buf)?;
    }

    Ok(())
}

pub(crate) fn decode_field(
    prop: &Property,
    target: FieldMut<'_>,
    buf: &mut Buffer<'_>,
) -> Result<()> {
    match (&prop.codec, target) {
        (FieldCodec::Scalar(_), FieldMut::Scalar(mut slot)) => {
            slot.store_raw(prop.decode_scalar(buf)?);
        }
        (FieldCodec::OptScalar(_), FieldMut::OptScalar(mut slot)) => {
            slot.store_raw(prop.decode_scalar(buf)?);
        }
        (FieldCodec::PackedSeq(_), FieldMut::ScalarVec(vec)) => {
            decode_packed_seq(prop, vec, buf)?;
        }
        (FieldCodec::PackedArray(_, _), FieldMut::ScalarArray(arr)) => {
            decode_packed_array(prop, arr, buf)?;
        }
        (FieldCodec::Str, FieldMut::Str(slot)) => {
            *slot = decode_string(buf)?;
        }
        (FieldCodec::OptStr, FieldMut::OptStr(slot)) => {
            *slot = Some(decode_string(buf)?);
        }
        (FieldCodec::StrSeq, FieldMut::Strs(seq)) => {
            seq.push(decode_string(buf)?);
            if seq.len() == 1 {
                seq.reserve(buf.count_ahead(prop.field_number, prop.wire_type));
            }
        }
        (FieldCodec::StrArray(_), FieldMut::StrArray(arr)) => {
            // one tagged string per wire item; remember the fill position
            // across occurrences
            let key = arr.as_ptr() as usize;
            let s = decode_string(buf)?;
            let i = buf.array_index(key);
            if i < arr.len() {
                arr[i] = s;
                buf.save_array_index(key, i + 1);
            }
        }
        (FieldCodec::Bytes, FieldMut::Bytes(slot)) => {
            *slot = buf.decode_raw_bytes()?.to_vec();
        }
        (FieldCodec::ByteArray(_), FieldMut::ByteArray(arr)) => {
            // packed bytes arrive in one block; fill from slot zero and
            // discard overflow
            let raw = buf.decode_raw_bytes()?;
            let n = raw.len().min(arr.len());
            arr[..n].copy_from_slice(&raw[..n]);
        }
        (FieldCodec::BytesSeq, FieldMut::BytesSeq(seq)) => {
            let v = buf.decode_raw_bytes()?.to_vec();
            seq.push(v);
            if seq.len() == 1 {
                seq.reserve(buf.count_ahead(prop.field_number, prop.wire_type));
            }
        }
        (FieldCodec::Message(plan), FieldMut::Msg(m)) => {
            merge_embedded(plan, m, buf)?;
        }
        (FieldCodec::OptMessage(plan), FieldMut::OptMsg(opt)) => {
            merge_embedded(plan, opt.get_or_insert_default(), buf)?;
        }
        (FieldCodec::MessageSeq(plan), FieldMut::Msgs(seq)) => {
            merge_embedded(plan, seq.push_default(), buf)?;
            if seq.len() == 1 {
                seq.reserve(buf.count_ahead(prop.field_number, prop.wire_type));
            }
        }
        (FieldCodec::MessageArray(plan, _), FieldMut::MsgArray(arr)) => {
            let key = arr.data_key();
            let end = delimited_end(buf)?;
            let i = buf.array_index(key);
            if i < arr.len() {
                let old = buf.push_limit(end)?;
                let r = decode_struct(plan, arr.get_mut(i), buf);
                buf.pop_limit(old);
                r?;
                buf.save_array_index(key, i + 1);
            } else {
                // array full: consume and discard
                buf.set_position(end);
            }
        }
        (FieldCodec::Map { .. }, FieldMut::Map(map)) => {
            map.decode_entry(buf, prop)?;
        }
        (FieldCodec::Timestamp, FieldMut::Time(slot)) => {
            *slot = decode_timestamp(buf)?;
        }
        (FieldCodec::OptTimestamp, FieldMut::OptTime(slot)) => {
            *slot = Some(decode_timestamp(buf)?);
        }
        (FieldCodec::TimestampSeq, FieldMut::Times(seq)) => {
            seq.push(decode_timestamp(buf)?);
            if seq.len() == 1 {
                seq.reserve(buf.count_ahead(prop.field_number, prop.wire_type));
            }
        }
        (FieldCodec::TimestampArray(_), FieldMut::TimeArray(arr)) => {
            let key = arr.as_ptr() as usize;
            let t = decode_timestamp(buf)?;
            let i = buf.array_index(key);
            if i < arr.len() {
                arr[i] = t;
                buf.save_array_index(key, i + 1);
            }
        }
        (FieldCodec::Duration, FieldMut::Dur(slot)) => {
            *slot = decode_duration(buf)?;
        }
        (FieldCodec::OptDuration, FieldMut::OptDur(slot)) => {
            *slot = Some(decode_duration(buf)?);
        }
        (FieldCodec::DurationSeq, FieldMut::Durs(seq)) => {
            seq.push(decode_duration(buf)?);
            if seq.len() == 1 {
                seq.reserve(buf.count_ahead(prop.field_number, prop.wire_type));
            }
        }
        (FieldCodec::DurationArray(_), FieldMut::DurArray(arr)) => {
            let key = arr.as_ptr() as usize;
            let d = decode_duration(buf)?;
            let i = buf.array_index(key);
            if i < arr.len() {
                arr[i] = d;
                buf.save_array_index(key, i + 1);
            }
        }
        (FieldCodec::Custom, FieldMut::Custom(u)) => {
            let raw = buf.get_wire_value(prop.wire_type)?;
            u.unmarshal(raw)?;
        }
        (FieldCodec::OptCustom, FieldMut::OptCustom(opt)) => {
            let raw = buf.get_wire_value(prop.wire_type)?;
            opt.get_or_insert_default().unmarshal(raw)?;
        }
        (FieldCodec::CustomSeq, FieldMut::Customs(seq)) => {
            let raw = buf.get_wire_value(prop.wire_type)?;
            seq.push_default().unmarshal(raw)?;
            if seq.len() == 1 {
                seq.reserve(buf.count_ahead(prop.field_number, prop.wire_type));
            }
        }
        (FieldCodec::Nothing, _) => {
            // zero-length array: nothing to store, but the wire value must go
            buf.skip_wire(prop.wire_type)?;
        }
        _ => return Err(Error::PlanMismatch(prop.name)),
    }
    Ok(())
}

/// Reads a length prefix and returns the payload's end position, which is
/// checked to lie within the current read window.
fn delimited_end(buf: &mut Buffer<'_>) -> Result<usize> {
    let count = buf.decode_varint()?;
    let n = usize::try_from(count).map_err(|_| Error::BadLength(count))?;
    if n > buf.remaining() {
        return Err(Error::UnexpectedEnd);
    }
    Ok(buf.position() + n)
}

fn decode_string(buf: &mut Buffer<'_>) -> Result<String> {
    let raw = buf.decode_raw_bytes()?;
    Ok(String::from_utf8_lossy(raw).into_owned())
}

/// Decodes one packed block into a growable sequence, pre-sizing an empty
/// destination with the count-ahead scan over the block.
fn decode_packed_seq(
    prop: &Property,
    mut seq: ScalarVecMut<'_>,
    buf: &mut Buffer<'_>,
) -> Result<()> {
    let vc = prop.value_codec.as_ref().ok_or(Error::PlanMismatch(prop.name))?;
    let end = delimited_end(buf)?;
    let old = buf.push_limit(end)?;
    if seq.len() == 0 {
        seq.reserve((vc.count)(buf));
    }
    let mut r = Ok(());
    while buf.remaining() > 0 {
        match (vc.decode)(buf) {
            Ok(raw) => seq.push_raw(raw),
            Err(e) => {
                r = Err(e);
                break;
            }
        }
    }
    buf.pop_limit(old);
    r
}

/// Decodes one packed block into a fixed array, filling in order and
/// discarding overflow. Packed blocks arrive whole, so filling restarts at
/// slot zero on every occurrence.
fn decode_packed_array(
    prop: &Property,
    mut arr: ScalarArrayMut<'_>,
    buf: &mut Buffer<'_>,
) -> Result<()> {
    let vc = prop.value_codec.as_ref().ok_or(Error::PlanMismatch(prop.name))?;
    let end = delimited_end(buf)?;
    let old = buf.push_limit(end)?;
    let mut filled = 0usize;
    let mut r = Ok(());
    while buf.remaining() > 0 {
        match (vc.decode)(buf) {
            Ok(raw) => {
                if filled < arr.capacity() {
                    arr.set_raw(filled, raw);
                    filled += 1;
                }
            }
            Err(e) => {
                r = Err(e);
                break;
            }
        }
    }
    buf.pop_limit(old);
    r
}

/// Recursively merges a length-delimited record payload into `msg`.
pub(crate) fn merge_embedded(
    plan: &StructProperties,
    msg: &mut dyn MessageDyn,
    buf: &mut Buffer<'_>,
) -> Result<()> {
    let end = delimited_end(buf)?;
    let old = buf.push_limit(end)?;
    let r = decode_struct(plan, msg, buf);
    buf.pop_limit(old);
    r
}

/// Decodes a map-value record payload into a fresh default record. Exposed
/// for the `message!` macro's `MapValue` impls.
#[doc(hidden)]
pub fn decode_embedded_value<M: Message>(buf: &mut Buffer<'_>, prop: &Property) -> Result<M> {
    let FieldCodec::Message(plan) = &prop.codec else {
        return Err(Error::PlanMismatch(prop.name()));
    };
    let mut value = M::default();
    merge_embedded(plan, &mut value, buf)?;
    Ok(value)
}

/// Reads the seconds/nanos pair shared by the two well-known types. Unknown
/// tags inside the payload are skipped; missing fields stay zero.
fn decode_secs_nanos(buf: &mut Buffer<'_>) -> Result<(i64, i64)> {
    let end = delimited_end(buf)?;
    let old = buf.push_limit(end)?;
    let mut secs = 0u64;
    let mut nanos = 0u64;
    let r = loop {
        if buf.remaining() == 0 {
            break Ok(());
        }
        let tag = match buf.decode_varint() {
            Ok(t) => t,
            Err(e) => break Err(e),
        };
        let item = match tag {
            0x08 => buf.decode_varint().map(|v| secs = v),
            0x10 => buf.decode_varint().map(|v| nanos = v),
            other => match WireType::from_raw((other & 7) as u8) {
                Some(w) => buf.skip_wire(w),
                None => Err(Error::UnknownWireType((other & 7) as u8)),
            },
        };
        if let Err(e) = item {
            break Err(e);
        }
    };
    buf.pop_limit(old);
    r?;
    Ok((secs as i64, nanos as i64))
}

fn decode_timestamp(buf: &mut Buffer<'_>) -> Result<OffsetDateTime> {
    let (secs, nanos) = decode_secs_nanos(buf)?;
    let total = i128::from(secs) * i128::from(NANOS_PER_SEC) + i128::from(nanos);
    OffsetDateTime::from_unix_timestamp_nanos(total).map_err(|_| Error::Overflow)
}

fn decode_duration(buf: &mut Buffer<'_>) -> Result<Duration> {
    let (secs, nanos) = decode_secs_nanos(buf)?;
    let extra = nanos.div_euclid(NANOS_PER_SEC);
    let rem = nanos.rem_euclid(NANOS_PER_SEC) as i32;
    Ok(Duration::new(secs.saturating_add(extra), rem))
}
