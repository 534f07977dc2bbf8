//! Field access for the string, byte-buffer and well-known time shapes.

use crate::reflect::{ElementType, FieldMut, FieldRef, FieldValue};

impl FieldValue for String {
    fn element() -> ElementType {
        ElementType::Str
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Str(self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Str(self)
    }
}

impl FieldValue for Option<String> {
    fn element() -> ElementType {
        ElementType::OptStr
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::OptStr(self.as_deref())
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::OptStr(self)
    }
}

impl FieldValue for Vec<String> {
    fn element() -> ElementType {
        ElementType::StrSeq
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Strs(self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Strs(self)
    }
}

impl<const N: usize> FieldValue for [String; N] {
    fn element() -> ElementType {
        ElementType::StrArray(N)
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Strs(self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::StrArray(self)
    }
}

impl FieldValue for Vec<u8> {
    fn element() -> ElementType {
        ElementType::Bytes
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Bytes(self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Bytes(self)
    }
}

impl<const N: usize> FieldValue for [u8; N] {
    fn element() -> ElementType {
        ElementType::ByteArray(N)
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Bytes(self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::ByteArray(self)
    }
}

impl FieldValue for Vec<Vec<u8>> {
    fn element() -> ElementType {
        ElementType::BytesSeq
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::BytesSeq(self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::BytesSeq(self)
    }
}

impl FieldValue for time::OffsetDateTime {
    fn element() -> ElementType {
        ElementType::Timestamp
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Time(*self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Time(self)
    }
}

impl FieldValue for Option<time::OffsetDateTime> {
    fn element() -> ElementType {
        ElementType::OptTimestamp
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::OptTime(*self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::OptTime(self)
    }
}

impl FieldValue for Vec<time::OffsetDateTime> {
    fn element() -> ElementType {
        ElementType::TimestampSeq
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Times(self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Times(self)
    }
}

impl<const N: usize> FieldValue for [time::OffsetDateTime; N] {
    fn element() -> ElementType {
        ElementType::TimestampArray(N)
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Times(self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::TimeArray(self)
    }
}

impl FieldValue for time::Duration {
    fn element() -> ElementType {
        ElementType::Duration
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Dur(*self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Dur(self)
    }
}

impl FieldValue for Option<time::Duration> {
    fn element() -> ElementType {
        ElementType::OptDuration
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::OptDur(*self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::OptDur(self)
    }
}

impl FieldValue for Vec<time::Duration> {
    fn element() -> ElementType {
        ElementType::DurationSeq
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Durs(self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Durs(self)
    }
}

impl<const N: usize> FieldValue for [time::Duration; N] {
    fn element() -> ElementType {
        ElementType::DurationArray(N)
    }
    fn field_ref(&self) -> FieldRef<'_> {
        FieldRef::Durs(self)
    }
    fn field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::DurArray(self)
    }
}
