//! # Map Field Access
//!
//! On the wire a map is a repeated length-delimited entry, each entry a
//! two-field record with the key at field number 1 and the value at field
//! number 2. [`MapField`] is the object-safe container view the drivers use;
//! it is implemented for `HashMap` and `BTreeMap` over any legal key/value
//! pairing. Encoding iterates entries in the container's own order; decoding
//! inserts, so a repeated key overwrites.
//!
//! Protobuf restricts map keys to the integer kinds, bool and string; that
//! restriction is what [`MapKey`] encodes. Values additionally admit bytes
//! and record types (the `message!` macro emits the [`MapValue`] impl for
//! each record it defines).

use std::collections::{BTreeMap, HashMap};

use paste::paste;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::props::Property;
use crate::reflect::scalar::{ScalarKind, ScalarMut, ScalarValue};
use crate::reflect::{ElementType, FieldMut, FieldRef, FieldValue};

/// A type usable as a map key.
pub trait MapKey: Default {
    fn element() -> ElementType;
    fn entry_ref(&self) -> FieldRef<'_>;
    fn decode_value(buf: &mut Buffer<'_>, prop: &Property) -> Result<Self>;
}

/// A type usable as a map value.
pub trait MapValue: Default {
    fn element() -> ElementType;
    fn entry_ref(&self) -> FieldRef<'_>;
    fn decode_value(buf: &mut Buffer<'_>, prop: &Property) -> Result<Self>;
}

/// Object-safe view of a map-shaped field.
pub trait MapField {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Calls `visit` with the key and value views of every entry, in the
    /// container's iteration order.
    fn visit_entries(
        &self,
        visit: &mut dyn FnMut(FieldRef<'_>, FieldRef<'_>) -> Result<()>,
    ) -> Result<()>;
    /// Decodes one length-delimited entry payload from `buf` and inserts it.
    fn decode_entry(&mut self, buf: &mut Buffer<'_>, prop: &Property) -> Result<()>;
}

macro_rules! scalar_map_keys {
    ($( $ty:ident ),*) => { paste! {
        $(
            impl MapKey for $ty {
                fn element() -> ElementType {
                    ElementType::Scalar(ScalarKind::[<$ty:camel>])
                }
                fn entry_ref(&self) -> FieldRef<'_> {
                    FieldRef::Scalar(ScalarValue::[<$ty:camel>](*self))
                }
                fn decode_value(buf: &mut Buffer<'_>, prop: &Property) -> Result<Self> {
                    let mut v = <$ty>::default();
                    ScalarMut::[<$ty:camel>](&mut v).store_raw(prop.decode_scalar(buf)?);
                    Ok(v)
                }
            }

            impl MapValue for $ty {
                fn element() -> ElementType {
                    <$ty as MapKey>::element()
                }
                fn entry_ref(&self) -> FieldRef<'_> {
                    <$ty as MapKey>::entry_ref(self)
                }
                fn decode_value(buf: &mut Buffer<'_>, prop: &Property) -> Result<Self> {
                    <$ty as MapKey>::decode_value(buf, prop)
                }
            }
        )*
    } };
}

scalar_map_keys!(bool, i8, u8, i16, u16, i32, u32, i64, u64);

impl MapKey for String {
    fn element() -> ElementType {
        ElementType::Str
    }
    fn entry_ref(&self) -> FieldRef<'_> {
        FieldRef::Str(self)
    }
    fn decode_value(buf: &mut Buffer<'_>, _prop: &Property) -> Result<Self> {
        let raw = buf.decode_raw_bytes()?;
        Ok(String::from_utf8_lossy(raw).into_owned())
    }
}

impl MapValue for String {
    fn element() -> ElementType {
        <String as MapKey>::element()
    }
    fn entry_ref(&self) -> FieldRef<'_> {
        <String as MapKey>::entry_ref(self)
    }
    fn decode_value(buf: &mut Buffer<'_>, prop: &Property) -> Result<Self> {
        <String as MapKey>::decode_value(buf, prop)
    }
}

impl MapValue for Vec<u8> {
    fn element() -> ElementType {
        ElementType::Bytes
    }
    fn entry_ref(&self) -> FieldRef<'_> {
        FieldRef::Bytes(self)
    }
    fn decode_value(buf: &mut Buffer<'_>, _prop: &Property) -> Result<Self> {
        Ok(buf.decode_raw_bytes()?.to_vec())
    }
}

/// Reads one map entry payload: a varint length, then key/value items
/// recognized by their single-byte tag codes. A missing key or value decodes
/// as the default; any foreign tag is an error.
fn decode_map_entry<K: MapKey, V: MapValue>(
    buf: &mut Buffer<'_>,
    prop: &Property,
) -> Result<(K, V)> {
    let (key_prop, val_prop) = prop.map_plans().ok_or(Error::PlanMismatch(prop.name()))?;
    let count = buf.decode_varint()?;
    let n = usize::try_from(count).map_err(|_| Error::BadLength(count))?;
    let end = buf
        .position()
        .checked_add(n)
        .ok_or(Error::BadLength(count))?;
    let old = buf.push_limit(end)?;

    let mut key: Option<K> = None;
    let mut val: Option<V> = None;
    let r = loop {
        if buf.remaining() == 0 {
            break Ok(());
        }
        let tag = match buf.read_byte() {
            Ok(t) => t,
            Err(e) => break Err(e),
        };
        let item = if tag == key_prop.tag_byte() {
            K::decode_value(buf, key_prop).map(|k| key = Some(k))
        } else if tag == val_prop.tag_byte() {
            V::decode_value(buf, val_prop).map(|v| val = Some(v))
        } else {
            Err(Error::BadMapEntry {
                field: prop.name().to_string(),
                detail: format!("unexpected tag {tag:#04x}"),
            })
        };
        if let Err(e) = item {
            break Err(e);
        }
    };
    buf.pop_limit(old);
    r?;
    Ok((key.unwrap_or_default(), val.unwrap_or_default()))
}

impl<K, V> MapField for HashMap<K, V>
where
    K: MapKey + Eq + std::hash::Hash,
    V: MapValue,
{
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn visit_entries(
        &self,
        visit: &mut dyn FnMut(FieldRef<'_>, FieldRef<'_>) -> Result<()>,
    ) -> Result<()> {
        for (k, v) in self {
            visit(k.entry_ref(), v.entry_ref())?;
        }
        Ok(())
    }

    fn decode_entry(&mut self, buf: &mut Buffer<'_>, prop: &Property) -> Result<()> {
        let (k, v) = decode_map_entry::<K, V>(buf, prop)?;
        self.insert(k, v);
        Ok(())
    }
}

impl<K, V> MapField for BTreeMap<K, V>
where
    K: MapKey + Ord,
    V: MapValue,
{
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn visit_entries(
        &self,
        visit: &mut dyn FnMut(FieldRef<'_>, FieldRef<'_>) -> Result<()>,
    ) -> Result<()> {
        for (k, v) in self {
            visit(k.entry_ref(), v.entry_ref())?;
        }
        Ok(())
    }

    fn decode_entry(&mut self, buf: &mut Buffer<'_>, prop: &Property) -> Result<()> {
        let (k, v) = decode_map_entry::<K, V>(buf, prop)?;
        self.insert(k, v);
        Ok(())
    }
}

impl<K, V> FieldValue for HashMap<K, V>
where
    K: MapKey + Eq + std::hash::Hash + 'static,
    V: MapValue + 'static,
{
    fn element() -> ElementType {
        ElementType::Map {
            key: Box::new(K::element()),
            value: Box::new(V::element()),
        }
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Map(self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Map(self)
    }
}

impl<K, V> FieldValue for BTreeMap<K, V>
where
    K: MapKey + Ord + 'static,
    V: MapValue + 'static,
{
    fn element() -> ElementType {
        ElementType::Map {
            key: Box::new(K::element()),
            value: Box::new(V::element()),
        }
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Map(self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Map(self)
    }
}
