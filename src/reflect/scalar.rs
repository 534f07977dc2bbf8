//! # Scalar Access Grid
//!
//! Eleven scalar kinds (bool, the eight fixed-width integers, f32, f64) flow
//! through the codec in a single unsigned 64-bit channel: signed values are
//! sign-extended into it, floats travel as their bit patterns. The enums here
//! are the typed views the generated accessors hand to the drivers, one
//! variant per kind and one enum per container position (value, mutable slot,
//! optional slot, slice, growable sequence, fixed array).
//!
//! Everything is generated by the `scalars!` macro below; the per-kind
//! conversion closures are the only non-mechanical part.

use paste::paste;

use crate::reflect::{ElementType, FieldMut, FieldRef, FieldValue};

macro_rules! scalars {
    ($( $ty:ident : to_raw $to:expr , from_raw $from:expr ;)*) => { paste! {
        /// The element kind of a scalar field.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum ScalarKind {
            $( [<$ty:camel>], )*
        }

        impl ScalarKind {
            pub fn rust_name(self) -> &'static str {
                match self {
                    $( ScalarKind::[<$ty:camel>] => stringify!($ty), )*
                }
            }
        }

        /// One scalar, copied out of a record field.
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum ScalarValue {
            $( [<$ty:camel>]($ty), )*
        }

        impl ScalarValue {
            pub fn kind(self) -> ScalarKind {
                match self {
                    $( ScalarValue::[<$ty:camel>](_) => ScalarKind::[<$ty:camel>], )*
                }
            }

            /// The value in the u64 channel: sign-extended for signed kinds,
            /// bit pattern for floats.
            pub fn to_raw(self) -> u64 {
                match self {
                    $( ScalarValue::[<$ty:camel>](v) => { let conv = $to; conv(v) } )*
                }
            }

            /// Zero test in the raw channel; note `-0.0` has a non-zero bit
            /// pattern and therefore encodes.
            pub fn is_zero(self) -> bool {
                self.to_raw() == 0
            }
        }

        /// Mutable slot for one scalar field.
        pub enum ScalarMut<'a> {
            $( [<$ty:camel>](&'a mut $ty), )*
        }

        impl ScalarMut<'_> {
            pub fn store_raw(&mut self, raw: u64) {
                match self {
                    $( ScalarMut::[<$ty:camel>](slot) => { let conv = $from; **slot = conv(raw); } )*
                }
            }
        }

        /// Mutable slot for an optional scalar field; storing always makes
        /// the field present.
        pub enum OptScalarMut<'a> {
            $( [<$ty:camel>](&'a mut Option<$ty>), )*
        }

        impl OptScalarMut<'_> {
            pub fn store_raw(&mut self, raw: u64) {
                match self {
                    $( OptScalarMut::[<$ty:camel>](slot) => { let conv = $from; **slot = Some(conv(raw)); } )*
                }
            }
        }

        /// Borrowed view over a sequence or array of scalars, used by the
        /// packed encoder.
        #[derive(Clone, Copy)]
        pub enum ScalarSlice<'a> {
            $( [<$ty:camel>](&'a [$ty]), )*
        }

        impl ScalarSlice<'_> {
            pub fn len(&self) -> usize {
                match self {
                    $( ScalarSlice::[<$ty:camel>](s) => s.len(), )*
                }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn raw_at(&self, i: usize) -> u64 {
                match self {
                    $( ScalarSlice::[<$ty:camel>](s) => { let conv = $to; conv(s[i]) } )*
                }
            }
        }

        /// Mutable growable sequence of scalars, filled by the packed decoder.
        pub enum ScalarVecMut<'a> {
            $( [<$ty:camel>](&'a mut Vec<$ty>), )*
        }

        impl ScalarVecMut<'_> {
            pub fn len(&self) -> usize {
                match self {
                    $( ScalarVecMut::[<$ty:camel>](v) => v.len(), )*
                }
            }

            pub fn reserve(&mut self, additional: usize) {
                match self {
                    $( ScalarVecMut::[<$ty:camel>](v) => v.reserve(additional), )*
                }
            }

            pub fn push_raw(&mut self, raw: u64) {
                match self {
                    $( ScalarVecMut::[<$ty:camel>](v) => { let conv = $from; v.push(conv(raw)); } )*
                }
            }
        }

        /// Mutable fixed array of scalars; the packed decoder fills slots in
        /// order and discards overflow.
        pub enum ScalarArrayMut<'a> {
            $( [<$ty:camel>](&'a mut [$ty]), )*
        }

        impl ScalarArrayMut<'_> {
            pub fn capacity(&self) -> usize {
                match self {
                    $( ScalarArrayMut::[<$ty:camel>](s) => s.len(), )*
                }
            }

            pub fn set_raw(&mut self, i: usize, raw: u64) {
                match self {
                    $( ScalarArrayMut::[<$ty:camel>](s) => { let conv = $from; s[i] = conv(raw); } )*
                }
            }
        }

        /// Field access for the scalar and optional-scalar shapes of every
        /// kind.
        $(
            impl FieldValue for $ty {
                fn element() -> ElementType {
                    ElementType::Scalar(ScalarKind::[<$ty:camel>])
                }
                fn field_ref(&self) -> FieldRef<'_> {
                    FieldRef::Scalar(ScalarValue::[<$ty:camel>](*self))
                }
                fn field_mut(&mut self) -> FieldMut<'_> {
                    FieldMut::Scalar(ScalarMut::[<$ty:camel>](self))
                }
            }

            impl FieldValue for Option<$ty> {
                fn element() -> ElementType {
                    ElementType::OptScalar(ScalarKind::[<$ty:camel>])
                }
                fn field_ref(&self) -> FieldRef<'_> {
                    FieldRef::OptScalar(self.map(ScalarValue::[<$ty:camel>]))
                }
                fn field_mut(&mut self) -> FieldMut<'_> {
                    FieldMut::OptScalar(OptScalarMut::[<$ty:camel>](self))
                }
            }
        )*
    } };
}

scalars! {
    bool: to_raw |v: bool| u64::from(v), from_raw |r: u64| r != 0;
    i8:   to_raw |v: i8| v as i64 as u64, from_raw |r: u64| r as i8;
    u8:   to_raw |v: u8| u64::from(v), from_raw |r: u64| r as u8;
    i16:  to_raw |v: i16| v as i64 as u64, from_raw |r: u64| r as i16;
    u16:  to_raw |v: u16| u64::from(v), from_raw |r: u64| r as u16;
    i32:  to_raw |v: i32| v as i64 as u64, from_raw |r: u64| r as i32;
    u32:  to_raw |v: u32| u64::from(v), from_raw |r: u64| r as u32;
    i64:  to_raw |v: i64| v as u64, from_raw |r: u64| r as i64;
    u64:  to_raw |v: u64| v, from_raw |r: u64| r;
    f32:  to_raw |v: f32| u64::from(v.to_bits()), from_raw |r: u64| f32::from_bits(r as u32);
    f64:  to_raw |v: f64| v.to_bits(), from_raw |r: u64| f64::from_bits(r);
}

impl ScalarKind {
    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ScalarKind::I8 | ScalarKind::I16 | ScalarKind::I32 | ScalarKind::I64
        )
    }

    /// True for kinds that need the full 64-bit channel width.
    pub fn is_wide(self) -> bool {
        matches!(self, ScalarKind::I64 | ScalarKind::U64 | ScalarKind::F64)
    }
}

/// Sequence and array shapes for every scalar kind except u8: `Vec<u8>` and
/// `[u8; N]` are protobuf `bytes`, not packed sequences, and get their own
/// impls alongside the string shapes.
macro_rules! scalar_sequences {
    ($( $ty:ident ),*) => { paste! {
        $(
            impl FieldValue for Vec<$ty> {
                fn element() -> ElementType {
                    ElementType::ScalarSeq(ScalarKind::[<$ty:camel>])
                }
                fn field_ref(&self) -> FieldRef<'_> {
                    FieldRef::Scalars(ScalarSlice::[<$ty:camel>](self))
                }
                fn field_mut(&mut self) -> FieldMut<'_> {
                    FieldMut::ScalarVec(ScalarVecMut::[<$ty:camel>](self))
                }
            }

            impl<const N: usize> FieldValue for [$ty; N] {
                fn element() -> ElementType {
                    ElementType::ScalarArray(ScalarKind::[<$ty:camel>], N)
                }
                fn field_ref(&self) -> FieldRef<'_> {
                    FieldRef::Scalars(ScalarSlice::[<$ty:camel>](self))
                }
                fn field_mut(&mut self) -> FieldMut<'_> {
                    FieldMut::ScalarArray(ScalarArrayMut::[<$ty:camel>](self))
                }
            }
        )*
    } };
}

scalar_sequences!(bool, i8, i16, u16, i32, u32, i64, u64, f32, f64);
