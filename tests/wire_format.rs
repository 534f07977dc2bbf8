//! # Wire Format Conformance
//!
//! Byte-exact checks of the published protobuf v3 encoding through the
//! public API, plus the buffer scanning helpers:
//!
//! 1. Varint tag: field 1, wire type 0, value 150 encodes as `08 96 01`
//! 2. Packed repeated int32: field 6, `[3, 270, 86942]` encodes as
//!    `32 06 03 8E 02 9E A7 05`
//! 3. Length-delimited string: field 2, `"testing"` encodes as
//!    `12 07 74 65 73 74 69 6E 67`
//! 4. Map entry: field 7, `{"key": 1}` encodes as `3A 08 0A 03 6B 65 79 10 01`

use std::collections::HashMap;

use protoplan::{Buffer, Error, WireType};

protoplan::message! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Probe {
        pub id: u64 => "varint,1",
        pub name: String => "bytes,2",
        pub samples: Vec<i32> => "varint,6",
        pub attrs: HashMap<String, u64> => ("bytes,7", "bytes,1", "varint,2"),
    }
}

#[test]
fn canonical_wire_vectors() {
    let mut probe = Probe {
        id: 150,
        ..Probe::default()
    };
    assert_eq!(protoplan::marshal(&probe).unwrap(), [0x08, 0x96, 0x01]);

    probe = Probe {
        samples: vec![3, 270, 86942],
        ..Probe::default()
    };
    assert_eq!(
        protoplan::marshal(&probe).unwrap(),
        [0x32, 0x06, 0x03, 0x8E, 0x02, 0x9E, 0xA7, 0x05]
    );

    probe = Probe {
        name: "testing".into(),
        ..Probe::default()
    };
    assert_eq!(
        protoplan::marshal(&probe).unwrap(),
        [0x12, 0x07, 0x74, 0x65, 0x73, 0x74, 0x69, 0x6E, 0x67]
    );

    probe = Probe::default();
    probe.attrs.insert("key".into(), 1);
    assert_eq!(
        protoplan::marshal(&probe).unwrap(),
        [0x3A, 0x08, 0x0A, 0x03, 0x6B, 0x65, 0x79, 0x10, 0x01]
    );
}

#[test]
fn output_is_in_ascending_field_order() {
    let probe = Probe {
        id: 1,
        name: "n".into(),
        samples: vec![1],
        attrs: HashMap::new(),
    };
    let bytes = protoplan::marshal(&probe).unwrap();

    let mut buf = Buffer::from_slice(&bytes);
    let mut last = 0u32;
    while buf.remaining() > 0 {
        let key = buf.decode_varint().unwrap();
        let number = (key >> 3) as u32;
        assert!(number > last, "field {number} out of order after {last}");
        last = number;
        let wire = WireType::from_raw((key & 7) as u8).unwrap();
        match wire {
            WireType::Varint => buf.skip_varint().unwrap(),
            WireType::Bytes => buf.skip_raw_bytes().unwrap(),
            WireType::Fixed32 => buf.skip_fixed(4).unwrap(),
            WireType::Fixed64 => buf.skip_fixed(8).unwrap(),
            other => panic!("unexpected wire type {other}"),
        }
    }
}

#[test]
fn count_ahead_matches_packed_extraction() {
    let probe = Probe {
        samples: vec![5, -5, 1 << 20, 0, 42],
        ..Probe::default()
    };
    let bytes = protoplan::marshal(&probe).unwrap();

    // the payload of field 6 holds exactly as many varints as the decoder
    // will extract
    let mut buf = Buffer::from_slice(&bytes);
    let (_, payload, wire) = buf.find(6, true).unwrap();
    assert_eq!(wire, WireType::Bytes);
    let payload_buf = Buffer::from_slice(payload);
    assert_eq!(payload_buf.count_varints(), 5);

    let mut back = Probe::default();
    protoplan::unmarshal(&bytes, &mut back).unwrap();
    assert_eq!(back.samples.len(), 5);
}

#[test]
fn find_returns_standalone_items() {
    let probe = Probe {
        id: 7,
        name: "abc".into(),
        samples: vec![1, 2],
        attrs: HashMap::new(),
    };
    let bytes = protoplan::marshal(&probe).unwrap();

    let mut buf = Buffer::from_slice(&bytes);
    let (item, payload, wire) = buf.find(2, true).unwrap();
    assert_eq!(wire, WireType::Bytes);
    assert_eq!(payload, b"abc");
    // the item includes its tag and length, making it a valid fragment
    assert_eq!(item, [0x12, 0x03, b'a', b'b', b'c']);

    buf.rewind();
    assert_eq!(buf.find(5, true).unwrap_err(), Error::NotFound);
}

#[test]
fn varint_boundary_encodings() {
    // each 7-bit step grows the encoding by one byte
    for (value, len) in [
        (0u64, 1usize),
        (127, 1),
        (128, 2),
        (16383, 2),
        (16384, 3),
        (u64::MAX, 10),
    ] {
        let mut buf = Buffer::new();
        buf.encode_varint(value);
        assert_eq!(buf.len(), len, "value {value}");
        buf.rewind();
        assert_eq!(buf.decode_varint().unwrap(), value);
    }
}

#[test]
fn truncated_and_oversized_varints() {
    let mut buf = Buffer::from_slice(&[0x80, 0x80]);
    assert_eq!(buf.decode_varint().unwrap_err(), Error::UnexpectedEnd);

    let eleven = [0xFFu8; 11];
    let mut buf = Buffer::from_slice(&eleven);
    assert_eq!(buf.decode_varint().unwrap_err(), Error::Overflow);

    // a 10-byte varint whose final byte carries bits 65+ must be rejected
    let bad_last = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
    let mut buf = Buffer::from_slice(&bad_last);
    assert_eq!(buf.decode_varint().unwrap_err(), Error::Overflow);
}

#[test]
fn zigzag_laws_through_the_buffer() {
    let mut buf = Buffer::new();
    for v in [0i64, -1, 1, -2, i64::MAX, i64::MIN] {
        buf.reset();
        buf.encode_zigzag64(v as u64);
        buf.rewind();
        assert_eq!(buf.decode_zigzag64().unwrap() as i64, v);
    }

    buf.reset();
    buf.encode_zigzag64(-1i64 as u64);
    assert_eq!(buf.len(), 1, "zigzag(-1) must fit one byte");
}

#[test]
fn debug_print_renders_items() {
    let probe = Probe {
        id: 150,
        name: "hi".into(),
        ..Probe::default()
    };
    let bytes = protoplan::marshal(&probe).unwrap();
    let dump = protoplan::debug_print(&bytes);
    assert!(dump.contains("varint 150"), "{dump}");
    assert!(dump.contains("bytes [2] 68 69"), "{dump}");
}

#[test]
fn decoded_bytes_do_not_alias_the_input() {
    protoplan::message! {
        #[derive(Debug, Clone, PartialEq)]
        pub struct Blobby {
            pub blob: Vec<u8> => "bytes,1",
        }
    }

    let src = Blobby {
        blob: vec![9, 8, 7, 6],
    };
    let bytes = protoplan::marshal(&src).unwrap();
    let range = bytes.as_ptr() as usize..bytes.as_ptr() as usize + bytes.len();

    let mut back = Blobby::default();
    protoplan::unmarshal(&bytes, &mut back).unwrap();
    let p = back.blob.as_ptr() as usize;
    assert!(
        !range.contains(&p),
        "decoded field storage must be a copy, not a view of the input"
    );

    // the borrow-returning path, by contrast, stays inside the input
    let mut buf = Buffer::from_slice(&bytes);
    let (_, payload, _) = buf.find(1, true).unwrap();
    assert!(range.contains(&(payload.as_ptr() as usize)));
}
