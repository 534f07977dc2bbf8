//! # Record Definition Macros
//!
//! [`message!`] expands a struct definition whose fields carry protobuf tag
//! strings into the struct itself plus everything the codec needs: a static
//! descriptor, dynamic field accessors, and the `FieldValue` impls that let
//! the type nest inside other records and maps.
//!
//! ## Usage
//!
//! ```ignore
//! protoplan::message! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Telemetry {
//!         pub count: u32 => "varint,1",
//!         pub name: String => "bytes,2",
//!         pub samples: Vec<i32> => "varint,6",
//!         // maps take (field tag, key tag, value tag); the key must use
//!         // field number 1, the value number 2
//!         pub attrs: HashMap<String, u64> => ("bytes,7", "bytes,1", "varint,2"),
//!         // fields the codec must ignore
//!         pub scratch: RefCell<u8> => skip,
//!         // reserved field numbers
//!         reserved: Reserved => "3,4",
//!     }
//! }
//! ```
//!
//! The macro derives `Default` (every field type must implement it) and
//! passes any other attributes through. Tag strings follow
//! `"<wire>,<number>[,optional][,name=<id>]"`; `skip` excludes a field the
//! same way a `"-"` tag does.
//!
//! [`self_coding!`] opts a hand-written type into the codec through its
//! [`Appender`]/[`Marshaler`]/[`Unmarshaler`] capabilities instead of a
//! field plan.
//!
//! [`message!`]: crate::message
//! [`self_coding!`]: crate::self_coding
//! [`Appender`]: crate::reflect::Appender
//! [`Marshaler`]: crate::reflect::Marshaler
//! [`Unmarshaler`]: crate::reflect::Unmarshaler

/// Defines a protobuf-taggable record type. See the [module docs](crate::macros).
#[macro_export]
macro_rules! message {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $fname:ident : $fty:ty => $spec:tt
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Default)]
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $fname : $fty, )*
        }

        impl $crate::reflect::MessageDyn for $name {
            fn type_desc(&self) -> &'static $crate::reflect::TypeDescriptor {
                <$name as $crate::reflect::Message>::descriptor()
            }

            fn field(&self, index: usize) -> $crate::reflect::FieldRef<'_> {
                let mut i = index;
                $(
                    if i == 0 {
                        return $crate::__field_ref!(self, $fname, $spec);
                    }
                    i -= 1;
                )*
                let _ = i;
                $crate::reflect::FieldRef::Skip
            }

            fn field_mut(&mut self, index: usize) -> $crate::reflect::FieldMut<'_> {
                let mut i = index;
                $(
                    if i == 0 {
                        return $crate::__field_mut!(self, $fname, $spec);
                    }
                    i -= 1;
                )*
                let _ = i;
                $crate::reflect::FieldMut::Skip
            }
        }

        impl $crate::reflect::Message for $name {
            fn descriptor() -> &'static $crate::reflect::TypeDescriptor {
                static FIELDS: &[$crate::reflect::FieldDescriptor] = &[
                    $( $crate::__field_desc!($fname, $fty, $spec), )*
                ];
                static DESC: $crate::reflect::TypeDescriptor = $crate::reflect::TypeDescriptor {
                    name: ::core::stringify!($name),
                    module_path: ::core::module_path!(),
                    type_id: ::std::any::TypeId::of::<$name>,
                    fields: FIELDS,
                };
                &DESC
            }
        }

        impl $crate::reflect::FieldValue for $name {
            fn element() -> $crate::reflect::ElementType {
                $crate::reflect::ElementType::Message(
                    <$name as $crate::reflect::Message>::descriptor(),
                )
            }
            fn field_ref(&self) -> $crate::reflect::FieldRef<'_> {
                $crate::reflect::FieldRef::Msg(self)
            }
            fn field_mut(&mut self) -> $crate::reflect::FieldMut<'_> {
                $crate::reflect::FieldMut::Msg(self)
            }
        }

        impl $crate::reflect::FieldValue for ::std::option::Option<$name> {
            fn element() -> $crate::reflect::ElementType {
                $crate::reflect::ElementType::OptMessage(
                    <$name as $crate::reflect::Message>::descriptor(),
                )
            }
            fn field_ref(&self) -> $crate::reflect::FieldRef<'_> {
                $crate::reflect::FieldRef::OptMsg(
                    self.as_ref().map(|m| m as &dyn $crate::reflect::MessageDyn),
                )
            }
            fn field_mut(&mut self) -> $crate::reflect::FieldMut<'_> {
                $crate::reflect::FieldMut::OptMsg(self)
            }
        }

        impl $crate::reflect::MessageOpt for ::std::option::Option<$name> {
            fn get(&self) -> ::std::option::Option<&dyn $crate::reflect::MessageDyn> {
                self.as_ref().map(|m| m as &dyn $crate::reflect::MessageDyn)
            }
            fn get_or_insert_default(&mut self) -> &mut dyn $crate::reflect::MessageDyn {
                self.get_or_insert_with(<$name as ::std::default::Default>::default)
            }
        }

        impl $crate::reflect::FieldValue for ::std::option::Option<::std::boxed::Box<$name>> {
            fn element() -> $crate::reflect::ElementType {
                $crate::reflect::ElementType::OptMessage(
                    <$name as $crate::reflect::Message>::descriptor(),
                )
            }
            fn field_ref(&self) -> $crate::reflect::FieldRef<'_> {
                $crate::reflect::FieldRef::OptMsg(
                    self.as_deref().map(|m| m as &dyn $crate::reflect::MessageDyn),
                )
            }
            fn field_mut(&mut self) -> $crate::reflect::FieldMut<'_> {
                $crate::reflect::FieldMut::OptMsg(self)
            }
        }

        impl $crate::reflect::MessageOpt for ::std::option::Option<::std::boxed::Box<$name>> {
            fn get(&self) -> ::std::option::Option<&dyn $crate::reflect::MessageDyn> {
                self.as_deref().map(|m| m as &dyn $crate::reflect::MessageDyn)
            }
            fn get_or_insert_default(&mut self) -> &mut dyn $crate::reflect::MessageDyn {
                &mut **self.get_or_insert_with(|| {
                    ::std::boxed::Box::new(<$name as ::std::default::Default>::default())
                })
            }
        }

        impl $crate::reflect::FieldValue for ::std::vec::Vec<$name> {
            fn element() -> $crate::reflect::ElementType {
                $crate::reflect::ElementType::MessageSeq(
                    <$name as $crate::reflect::Message>::descriptor(),
                )
            }
            fn field_ref(&self) -> $crate::reflect::FieldRef<'_> {
                $crate::reflect::FieldRef::Msgs(self)
            }
            fn field_mut(&mut self) -> $crate::reflect::FieldMut<'_> {
                $crate::reflect::FieldMut::Msgs(self)
            }
        }

        impl<const N: usize> $crate::reflect::FieldValue for [$name; N] {
            fn element() -> $crate::reflect::ElementType {
                $crate::reflect::ElementType::MessageArray(
                    <$name as $crate::reflect::Message>::descriptor(),
                    N,
                )
            }
            fn field_ref(&self) -> $crate::reflect::FieldRef<'_> {
                $crate::reflect::FieldRef::MsgArray(&self[..])
            }
            fn field_mut(&mut self) -> $crate::reflect::FieldMut<'_> {
                $crate::reflect::FieldMut::MsgArray(&mut self[..])
            }
        }

        impl $crate::reflect::MapValue for $name {
            fn element() -> $crate::reflect::ElementType {
                <$name as $crate::reflect::FieldValue>::element()
            }
            fn entry_ref(&self) -> $crate::reflect::FieldRef<'_> {
                $crate::reflect::FieldRef::Msg(self)
            }
            fn decode_value(
                buf: &mut $crate::Buffer<'_>,
                prop: &$crate::Property,
            ) -> $crate::Result<Self> {
                $crate::__private::decode_embedded_value::<$name>(buf, prop)
            }
        }
    };
}

/// Opts a hand-written self-coding type into the codec. The type must
/// implement [`Appender`](crate::reflect::Appender) (first form) or
/// [`Marshaler`](crate::reflect::Marshaler) (second form), plus
/// [`Unmarshaler`](crate::reflect::Unmarshaler) and `Default`.
///
/// ```ignore
/// protoplan::self_coding!(appender Fixed128 {
///     name: "Fixed128",
///     definition: "message Fixed128 {\n  bytes be_bytes = 1;\n}",
///     imports: [],
/// });
/// ```
#[macro_export]
macro_rules! self_coding {
    (appender $ty:ident { $($body:tt)* }) => {
        $crate::__self_coding!(@impl Appender, false, $ty { $($body)* });
    };
    (marshaler $ty:ident { $($body:tt)* }) => {
        $crate::__self_coding!(@impl Marshaler, true, $ty { $($body)* });
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __opt_lit {
    () => {
        ::std::option::Option::None
    };
    ($l:literal) => {
        ::std::option::Option::Some($l)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __self_coding {
    (@impl $variant:ident, $marshaler:expr, $ty:ident {
        name: $pname:literal
        $(, definition: $def:literal)?
        $(, imports: [$($imp:literal),* $(,)?])?
        $(,)?
    }) => {
        impl $ty {
            #[doc(hidden)]
            fn __proto_custom_type() -> $crate::reflect::CustomType {
                $crate::reflect::CustomType {
                    proto_name: $pname,
                    definition: $crate::__opt_lit!($($def)?),
                    imports: &[$($($imp),*)?],
                    marshaler: $marshaler,
                }
            }
        }

        impl $crate::reflect::FieldValue for $ty {
            fn element() -> $crate::reflect::ElementType {
                $crate::reflect::ElementType::Custom($ty::__proto_custom_type())
            }
            fn field_ref(&self) -> $crate::reflect::FieldRef<'_> {
                $crate::reflect::FieldRef::Custom($crate::reflect::CustomRef::$variant(self))
            }
            fn field_mut(&mut self) -> $crate::reflect::FieldMut<'_> {
                $crate::reflect::FieldMut::Custom(self)
            }
        }

        impl $crate::reflect::FieldValue for ::std::option::Option<::std::boxed::Box<$ty>> {
            fn element() -> $crate::reflect::ElementType {
                $crate::reflect::ElementType::OptCustom($ty::__proto_custom_type())
            }
            fn field_ref(&self) -> $crate::reflect::FieldRef<'_> {
                $crate::reflect::FieldRef::OptCustom(
                    self.as_deref().map(|v| $crate::reflect::CustomRef::$variant(v)),
                )
            }
            fn field_mut(&mut self) -> $crate::reflect::FieldMut<'_> {
                $crate::reflect::FieldMut::OptCustom(self)
            }
        }

        impl $crate::reflect::CustomOpt for ::std::option::Option<::std::boxed::Box<$ty>> {
            fn get_or_insert_default(&mut self) -> &mut dyn $crate::reflect::Unmarshaler {
                &mut **self.get_or_insert_with(|| {
                    ::std::boxed::Box::new(<$ty as ::std::default::Default>::default())
                })
            }
        }

        impl $crate::reflect::FieldValue for ::std::vec::Vec<$ty> {
            fn element() -> $crate::reflect::ElementType {
                $crate::reflect::ElementType::CustomSeq($ty::__proto_custom_type())
            }
            fn field_ref(&self) -> $crate::reflect::FieldRef<'_> {
                $crate::reflect::FieldRef::Customs(self)
            }
            fn field_mut(&mut self) -> $crate::reflect::FieldMut<'_> {
                $crate::reflect::FieldMut::Customs(self)
            }
        }

        impl $crate::reflect::CustomSeq for ::std::vec::Vec<$ty> {
            fn len(&self) -> usize {
                ::std::vec::Vec::len(self)
            }
            fn get(&self, i: usize) -> $crate::reflect::CustomRef<'_> {
                $crate::reflect::CustomRef::$variant(&self[i])
            }
            fn push_default(&mut self) -> &mut dyn $crate::reflect::Unmarshaler {
                self.push(<$ty as ::std::default::Default>::default());
                let i = ::std::vec::Vec::len(self) - 1;
                &mut self[i]
            }
            fn reserve(&mut self, additional: usize) {
                ::std::vec::Vec::reserve(self, additional);
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __field_desc {
    ($fname:ident, $fty:ty, skip) => {
        $crate::reflect::FieldDescriptor {
            name: ::core::stringify!($fname),
            tag: "-",
            key_tag: ::std::option::Option::None,
            val_tag: ::std::option::Option::None,
            element: $crate::reflect::excluded_element,
        }
    };
    ($fname:ident, $fty:ty, ($tag:literal, $ktag:literal, $vtag:literal)) => {
        $crate::reflect::FieldDescriptor {
            name: ::core::stringify!($fname),
            tag: $tag,
            key_tag: ::std::option::Option::Some($ktag),
            val_tag: ::std::option::Option::Some($vtag),
            element: <$fty as $crate::reflect::FieldValue>::element,
        }
    };
    ($fname:ident, $fty:ty, $tag:literal) => {
        $crate::reflect::FieldDescriptor {
            name: ::core::stringify!($fname),
            tag: $tag,
            key_tag: ::std::option::Option::None,
            val_tag: ::std::option::Option::None,
            element: <$fty as $crate::reflect::FieldValue>::element,
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __field_ref {
    ($self:ident, $fname:ident, skip) => {
        $crate::reflect::FieldRef::Skip
    };
    ($self:ident, $fname:ident, $spec:tt) => {
        $crate::reflect::FieldValue::field_ref(&$self.$fname)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __field_mut {
    ($self:ident, $fname:ident, skip) => {
        $crate::reflect::FieldMut::Skip
    };
    ($self:ident, $fname:ident, $spec:tt) => {
        $crate::reflect::FieldValue::field_mut(&mut $self.$fname)
    };
}
