//! # Codec Tests
//!
//! End-to-end tests of the encode/decode drivers over macro-defined record
//! types: byte-exact wire vectors, round trips across the field-shape grid,
//! merge semantics, unknown-field tolerance, and the plan-time error
//! surface.

use std::collections::{BTreeMap, HashMap};

use crate::buffer::Buffer;
use crate::error::Error;
use crate::props::cache::get_properties_of;
use crate::reflect::{Appender, Reserved, Unmarshaler};
use crate::{marshal, unmarshal};

crate::message! {
    #[derive(Debug, Clone, PartialEq)]
    struct Scalars {
        v_bool: bool => "varint,1",
        v_i32: i32 => "varint,2",
        v_u32: u32 => "varint,3",
        v_i64: i64 => "varint,4",
        v_u64: u64 => "varint,5",
        v_sint32: i32 => "zigzag32,6",
        v_sint64: i64 => "zigzag64,7",
        v_fix32: u32 => "fixed32,8",
        v_fix64: u64 => "fixed64,9",
        v_float: f32 => "fixed32,10",
        v_double: f64 => "fixed64,11",
        v_small: i16 => "varint,12",
    }
}

crate::message! {
    #[derive(Debug, Clone, PartialEq)]
    struct Optionals {
        count: Option<u32> => "varint,1,optional",
        label: Option<String> => "bytes,2,optional",
    }
}

crate::message! {
    #[derive(Debug, Clone, PartialEq)]
    struct Repeats {
        ints: Vec<i32> => "varint,6",
        longs: Vec<u64> => "fixed64,2",
        names: Vec<String> => "bytes,3",
        blobs: Vec<Vec<u8>> => "bytes,4",
        floats: Vec<f32> => "fixed32,5",
    }
}

crate::message! {
    #[derive(Debug, Clone, PartialEq)]
    struct Arrays {
        slots: [u16; 4] => "varint,1",
        labels: [String; 2] => "bytes,2",
        digest: [u8; 4] => "bytes,3",
    }
}

crate::message! {
    #[derive(Debug, Clone, PartialEq)]
    struct Inner {
        x: i32 => "varint,1",
        tags: Vec<String> => "bytes,2",
    }
}

crate::message! {
    #[derive(Debug, Clone, PartialEq)]
    struct Outer {
        name: String => "bytes,1",
        inner: Inner => "bytes,2",
        next: Option<Box<Outer>> => "bytes,3",
        items: Vec<Inner> => "bytes,4",
        boxed: Option<Inner> => "bytes,5",
    }
}

crate::message! {
    #[derive(Debug, Clone, PartialEq)]
    struct Maps {
        attrs: HashMap<String, u64> => ("bytes,7", "bytes,1", "varint,2"),
        scores: BTreeMap<i32, String> => ("bytes,2", "varint,1", "bytes,2"),
        nested: BTreeMap<String, Inner> => ("bytes,3", "bytes,1", "bytes,2"),
    }
}

crate::message! {
    #[derive(Debug, Clone, PartialEq)]
    struct Stamped {
        at: Option<time::OffsetDateTime> => "bytes,1",
        took: time::Duration => "bytes,2",
        laps: Vec<time::Duration> => "bytes,3",
        marks: Vec<time::OffsetDateTime> => "bytes,4",
    }
}

mod wire_vectors {
    use super::*;

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct OneVarint {
            a: u64 => "varint,1",
        }
    }

    #[test]
    fn varint_field_150() {
        let bytes = marshal(&OneVarint { a: 150 }).unwrap();
        assert_eq!(bytes, [0x08, 0x96, 0x01]);
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct PackedSix {
            vals: Vec<i32> => "varint,6",
        }
    }

    #[test]
    fn packed_repeated_int32() {
        let bytes = marshal(&PackedSix {
            vals: vec![3, 270, 86942],
        })
        .unwrap();
        assert_eq!(bytes, [0x32, 0x06, 0x03, 0x8E, 0x02, 0x9E, 0xA7, 0x05]);
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct OneString {
            b: String => "bytes,2",
        }
    }

    #[test]
    fn length_delimited_string() {
        let bytes = marshal(&OneString {
            b: "testing".to_string(),
        })
        .unwrap();
        assert_eq!(
            bytes,
            [0x12, 0x07, 0x74, 0x65, 0x73, 0x74, 0x69, 0x6E, 0x67]
        );
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct OneMap {
            m: HashMap<String, u64> => ("bytes,7", "bytes,1", "varint,2"),
        }
    }

    #[test]
    fn map_entry_bytes() {
        let mut v = OneMap::default();
        v.m.insert("key".to_string(), 1);
        let bytes = marshal(&v).unwrap();
        assert_eq!(
            bytes,
            [0x3A, 0x08, 0x0A, 0x03, 0x6B, 0x65, 0x79, 0x10, 0x01]
        );
    }

    #[test]
    fn zero_values_are_omitted() {
        assert!(marshal(&Scalars::default()).unwrap().is_empty());
        assert!(marshal(&OneString::default()).unwrap().is_empty());
        assert!(marshal(&Repeats::default()).unwrap().is_empty());
        assert!(marshal(&Maps::default()).unwrap().is_empty());
    }

    #[test]
    fn fields_emit_in_ascending_number_order() {
        let v = Repeats {
            ints: vec![1],
            longs: vec![2],
            names: vec!["a".into()],
            blobs: vec![],
            floats: vec![],
        };
        let bytes = marshal(&v).unwrap();
        // longs (#2, packed fixed64) precede names (#3) precede ints (#6)
        assert_eq!(bytes[0], 0x12);
        let names_at = bytes.iter().position(|&b| b == 0x1A).unwrap();
        let ints_at = bytes.iter().position(|&b| b == 0x32).unwrap();
        assert!(names_at < ints_at);
    }
}

mod round_trips {
    use super::*;

    fn cycle<M: crate::Message + PartialEq + std::fmt::Debug + Clone>(v: &M) {
        let bytes = marshal(v).unwrap();
        let mut back = M::default();
        unmarshal(&bytes, &mut back).unwrap();
        assert_eq!(&back, v);
    }

    #[test]
    fn scalar_grid() {
        cycle(&Scalars {
            v_bool: true,
            v_i32: -123456,
            v_u32: u32::MAX,
            v_i64: i64::MIN,
            v_u64: u64::MAX,
            v_sint32: -1,
            v_sint64: i64::MIN / 3,
            v_fix32: 0xDEAD_BEEF,
            v_fix64: 0xFEED_FACE_CAFE_BEEF,
            v_float: -2.5,
            v_double: 1e300,
            v_small: -7,
        });
    }

    #[test]
    fn optionals_present_and_absent() {
        cycle(&Optionals {
            count: Some(0),
            label: Some(String::new()),
        });
        let bytes = marshal(&Optionals {
            count: Some(0),
            label: None,
        })
        .unwrap();
        // presence survives even for the zero value
        assert_eq!(bytes, [0x08, 0x00]);
        cycle(&Optionals::default());
    }

    #[test]
    fn repeated_shapes() {
        cycle(&Repeats {
            ints: vec![3, -1, 270, 86942],
            longs: vec![0, u64::MAX],
            names: vec!["".into(), "hello".into(), "world".into()],
            blobs: vec![vec![], vec![1, 2, 3]],
            floats: vec![0.0, -0.5, 3.25],
        });
    }

    #[test]
    fn fixed_arrays() {
        cycle(&Arrays {
            slots: [1, 0, 65535, 42],
            labels: ["alpha".into(), "beta".into()],
            digest: [0xDE, 0xAD, 0xBE, 0xEF],
        });
    }

    #[test]
    fn nested_records_and_recursion() {
        cycle(&Outer {
            name: "root".into(),
            inner: Inner {
                x: 5,
                tags: vec!["a".into()],
            },
            next: Some(Box::new(Outer {
                name: "leaf".into(),
                ..Outer::default()
            })),
            items: vec![
                Inner {
                    x: 1,
                    tags: vec![],
                },
                Inner {
                    x: 2,
                    tags: vec!["b".into(), "c".into()],
                },
            ],
            boxed: Some(Inner {
                x: -9,
                tags: vec![],
            }),
        });
    }

    #[test]
    fn maps_round_trip() {
        let mut v = Maps::default();
        v.attrs.insert("alpha".into(), 1);
        v.attrs.insert("beta".into(), 0);
        v.scores.insert(-3, "minus".into());
        v.scores.insert(7, "plus".into());
        v.nested.insert(
            "in".into(),
            Inner {
                x: 11,
                tags: vec!["t".into()],
            },
        );
        cycle(&v);
    }

    #[test]
    fn well_known_types() {
        use time::macros::datetime;
        cycle(&Stamped {
            at: Some(datetime!(2024-11-05 13:37:21.000000500 UTC)),
            took: time::Duration::new(3, 500_000_000),
            laps: vec![
                time::Duration::ZERO,
                time::Duration::new(-2, -500_000_000),
                time::Duration::seconds(86_400),
            ],
            marks: vec![
                datetime!(2024-11-05 13:37:21 UTC),
                datetime!(1970-01-01 00:00:00 UTC),
                datetime!(2031-02-28 06:00:00.000000001 UTC),
            ],
        });
    }

    #[test]
    fn pre_epoch_timestamp() {
        use time::macros::datetime;
        cycle(&Stamped {
            at: Some(datetime!(1969-12-31 23:59:59.25 UTC)),
            took: time::Duration::ZERO,
            laps: vec![],
            marks: vec![],
        });
    }
}

mod merge_semantics {
    use super::*;

    #[test]
    fn double_decode_appends_sequences_and_overwrites_scalars() {
        let first = Repeats {
            ints: vec![1, 2],
            names: vec!["a".into()],
            ..Repeats::default()
        };
        let bytes = marshal(&first).unwrap();

        let mut dst = Repeats::default();
        unmarshal(&bytes, &mut dst).unwrap();
        unmarshal(&bytes, &mut dst).unwrap();
        assert_eq!(dst.ints, vec![1, 2, 1, 2]);
        assert_eq!(dst.names, vec!["a".to_string(), "a".to_string()]);
    }

    #[test]
    fn concatenated_encodings_merge() {
        // two encodings back to back in one buffer: scalars take the second
        // source, repeated fields concatenate in order
        let a = Outer {
            name: "first".into(),
            items: vec![Inner {
                x: 1,
                tags: vec![],
            }],
            ..Outer::default()
        };
        let b = Outer {
            name: "second".into(),
            items: vec![Inner {
                x: 2,
                tags: vec![],
            }],
            ..Outer::default()
        };

        let mut buf = Buffer::new();
        buf.marshal(&a).unwrap();
        buf.marshal(&b).unwrap();
        buf.rewind();

        let mut dst = Outer::default();
        buf.unmarshal(&mut dst).unwrap();
        assert_eq!(dst.name, "second");
        assert_eq!(dst.items.len(), 2);
        assert_eq!(dst.items[0].x, 1);
        assert_eq!(dst.items[1].x, 2);
    }

    #[test]
    fn map_entries_overwrite_by_key() {
        let mut a = Maps::default();
        a.attrs.insert("k".into(), 1);
        let mut b = Maps::default();
        b.attrs.insert("k".into(), 2);

        let mut buf = Buffer::new();
        buf.marshal(&a).unwrap();
        buf.marshal(&b).unwrap();
        buf.rewind();

        let mut dst = Maps::default();
        buf.unmarshal(&mut dst).unwrap();
        assert_eq!(dst.attrs.get("k"), Some(&2));
        assert_eq!(dst.attrs.len(), 1);
    }

    #[test]
    fn nested_records_merge_recursively() {
        let a = Outer {
            inner: Inner {
                x: 1,
                tags: vec!["a".into()],
            },
            ..Outer::default()
        };
        let b = Outer {
            inner: Inner {
                x: 2,
                tags: vec!["b".into()],
            },
            ..Outer::default()
        };

        let mut buf = Buffer::new();
        buf.marshal(&a).unwrap();
        buf.marshal(&b).unwrap();
        buf.rewind();

        let mut dst = Outer::default();
        buf.unmarshal(&mut dst).unwrap();
        assert_eq!(dst.inner.x, 2);
        assert_eq!(dst.inner.tags, vec!["a".to_string(), "b".to_string()]);
    }
}

mod tolerance {
    use super::*;

    #[test]
    fn unknown_fields_are_skipped() {
        let v = Inner {
            x: 5,
            tags: vec!["keep".into()],
        };
        let known = marshal(&v).unwrap();

        // splice in an unknown field 15 with a length-delimited payload,
        // then an unknown varint field 14
        let mut spliced = Vec::new();
        spliced.extend_from_slice(&[0x7A, 0x03, 1, 2, 3]);
        spliced.extend_from_slice(&known);
        spliced.extend_from_slice(&[0x70, 0x2A]);

        let mut back = Inner::default();
        unmarshal(&spliced, &mut back).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn wrong_wire_type_is_fatal() {
        // field 1 of Inner expects varint; hand it a length-delimited item
        let bytes = [0x0A, 0x01, 0x00];
        let mut back = Inner::default();
        let err = unmarshal(&bytes, &mut back).unwrap_err();
        assert!(matches!(err, Error::BadWireType { .. }), "{err}");
    }

    #[test]
    fn unknown_wire_type_is_fatal() {
        // wire type 7 does not exist
        let bytes = [0x0F, 0x00];
        let mut back = Inner::default();
        let err = unmarshal(&bytes, &mut back).unwrap_err();
        assert!(matches!(err, Error::UnknownWireType(7)), "{err}");
    }

    #[test]
    fn truncated_payload_is_fatal() {
        let v = Inner {
            x: 300,
            tags: vec![],
        };
        let bytes = marshal(&v).unwrap();
        let mut back = Inner::default();
        let err = unmarshal(&bytes[..bytes.len() - 1], &mut back).unwrap_err();
        assert_eq!(err, Error::UnexpectedEnd);
    }

    #[test]
    fn descending_field_order_still_decodes() {
        // protobuf permits fields in any order; encode two fields manually
        // with the higher number first
        let mut buf = Buffer::new();
        buf.append(&[0x12, 0x01, b'z']); // Inner field 2 ("tags" element)
        buf.append(&[0x08, 0x07]); // Inner field 1 = 7
        buf.rewind();
        let mut back = Inner::default();
        buf.unmarshal(&mut back).unwrap();
        assert_eq!(back.x, 7);
        assert_eq!(back.tags, vec!["z".to_string()]);
    }
}

mod array_fills {
    use super::*;

    #[test]
    fn overflowing_packed_array_discards_extra() {
        // Arrays.slots is [u16; 4]; feed six values
        let mut buf = Buffer::new();
        buf.append(&[0x0A, 0x06, 1, 2, 3, 4, 5, 6]);
        buf.rewind();
        let mut back = Arrays::default();
        buf.unmarshal(&mut back).unwrap();
        assert_eq!(back.slots, [1, 2, 3, 4]);
    }

    #[test]
    fn string_array_fills_across_occurrences() {
        let mut buf = Buffer::new();
        buf.append(&[0x12, 0x01, b'a']);
        buf.append(&[0x12, 0x01, b'b']);
        buf.append(&[0x12, 0x01, b'c']); // third occurrence overflows
        buf.rewind();
        let mut back = Arrays::default();
        buf.unmarshal(&mut back).unwrap();
        assert_eq!(back.labels, ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn rewind_resets_array_fill_positions() {
        let mut buf = Buffer::new();
        buf.append(&[0x12, 0x01, b'x']);
        buf.rewind();
        let mut rec = Arrays::default();
        buf.unmarshal(&mut rec).unwrap();
        assert_eq!(rec.labels[0], "x");

        // re-decode the same record through a rewound buffer: the fill
        // position must restart at slot zero, not continue at slot one
        buf.rewind();
        rec.labels[0].clear();
        buf.unmarshal(&mut rec).unwrap();
        assert_eq!(rec.labels[0], "x");
        assert_eq!(rec.labels[1], "");
    }
}

mod self_coding {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Opaque {
        data: Vec<u8>,
    }

    impl Appender for Opaque {
        fn append_to(&self, buf: &mut Buffer<'_>) -> crate::Result<()> {
            buf.append(&self.data);
            Ok(())
        }
    }

    impl Unmarshaler for Opaque {
        fn unmarshal(&mut self, bytes: &[u8]) -> crate::Result<()> {
            self.data = bytes.to_vec();
            Ok(())
        }
    }

    crate::self_coding!(appender Opaque {
        name: "Opaque",
        definition: "message Opaque {\n  bytes data = 1;\n}",
    });

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct Envelope {
            id: u32 => "varint,1",
            body: Opaque => "bytes,2",
            trailers: Vec<Opaque> => "bytes,3",
        }
    }

    #[test]
    fn appender_round_trip() {
        let v = Envelope {
            id: 9,
            body: Opaque {
                data: vec![1, 2, 3],
            },
            trailers: vec![
                Opaque { data: vec![4] },
                Opaque {
                    data: vec![5, 6],
                },
            ],
        };
        let bytes = marshal(&v).unwrap();
        // the body rides as an ordinary length-delimited field
        assert!(bytes.windows(5).any(|w| w == [0x12, 0x03, 1, 2, 3]));
        let mut back = Envelope::default();
        unmarshal(&bytes, &mut back).unwrap();
        assert_eq!(back, v);
    }
}

mod plans {
    use super::*;

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct WithReserved {
            a: u32 => "varint,1",
            gaps: Reserved => "3,4,4,9",
            b: u32 => "varint,2",
        }
    }

    #[test]
    fn reserved_numbers_sorted_and_deduped() {
        let plan = get_properties_of::<WithReserved>().unwrap();
        assert_eq!(plan.reserved(), &[3, 4, 9]);
        let numbers: Vec<u32> = plan.props().iter().map(|p| p.field_number()).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct UsesReserved {
            a: u32 => "varint,3",
            gaps: Reserved => "3",
        }
    }

    #[test]
    fn reserved_collision_is_rejected() {
        let err = get_properties_of::<UsesReserved>().unwrap_err();
        assert!(matches!(err, Error::ReservedTag { number: 3, .. }), "{err}");
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct Duplicated {
            a: u32 => "varint,5",
            b: String => "bytes,5",
        }
    }

    #[test]
    fn duplicate_numbers_are_rejected() {
        let err = get_properties_of::<Duplicated>().unwrap_err();
        assert!(matches!(err, Error::DuplicateTag { number: 5, .. }), "{err}");
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct FloatMismatch {
            f: f32 => "fixed64,1",
        }
    }

    #[test]
    fn float_requires_fixed32() {
        let err = get_properties_of::<FloatMismatch>().unwrap_err();
        assert!(matches!(err, Error::WireMismatch { .. }), "{err}");
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct StringMismatch {
            s: String => "varint,1",
        }
    }

    #[test]
    fn strings_require_bytes() {
        let err = get_properties_of::<StringMismatch>().unwrap_err();
        assert!(matches!(err, Error::WireMismatch { .. }), "{err}");
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct BadMapKeyNumber {
            m: HashMap<String, u64> => ("bytes,1", "bytes,2", "varint,2"),
        }
    }

    #[test]
    fn map_key_must_use_number_one() {
        let err = get_properties_of::<BadMapKeyNumber>().unwrap_err();
        assert!(matches!(err, Error::BadMapEntry { .. }), "{err}");
    }

    crate::message! {
        #[derive(Debug, Clone, PartialEq)]
        struct Excluded {
            a: u32 => "varint,1",
            scratch: std::cell::RefCell<u8> => skip,
        }
    }

    #[test]
    fn skipped_fields_stay_out_of_the_plan() {
        let plan = get_properties_of::<Excluded>().unwrap();
        assert_eq!(plan.props().len(), 1);
        let bytes = marshal(&Excluded {
            a: 3,
            scratch: std::cell::RefCell::new(9),
        })
        .unwrap();
        assert_eq!(bytes, [0x08, 0x03]);
    }

    #[test]
    fn failed_plans_are_rolled_back_and_fail_again() {
        assert!(get_properties_of::<Duplicated>().is_err());
        assert!(get_properties_of::<Duplicated>().is_err());
    }

    #[test]
    fn plan_handles_are_shared_across_threads() {
        let first = get_properties_of::<Scalars>().unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(get_properties_of::<Scalars>))
            .collect();
        for h in handles {
            let plan = h.join().unwrap().unwrap();
            assert!(std::sync::Arc::ptr_eq(&first, &plan));
        }
    }

    #[test]
    fn properties_are_sorted_by_field_number() {
        let plan = get_properties_of::<Repeats>().unwrap();
        let numbers: Vec<u32> = plan.props().iter().map(|p| p.field_number()).collect();
        let mut sorted = numbers.clone();
        sorted.sort_unstable();
        assert_eq!(numbers, sorted);
    }
}
