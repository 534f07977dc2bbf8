//! # Wire Dump
//!
//! A debugging formatter for raw protobuf bytes: one line per item with its
//! byte offset, field number, wire type and value. Useful when a decode
//! fails and the question is "what is actually on the wire".
//!
//! Unlike the codec proper, the printer accepts the two legacy group wire
//! types (protobuf v2 emitted them; v3 never does) and renders them as
//! indentation, flagging unbalanced nesting at the end. This is a read-only
//! compatibility feature; the codec still refuses to skip groups.

use std::fmt::Write;

use crate::buffer::Buffer;
use crate::wire::WireType;

/// Formats `bytes` as a line-per-item dump.
pub fn debug_print(bytes: &[u8]) -> String {
    let mut buf = Buffer::from_slice(bytes);
    let mut out = String::new();
    let mut depth = 0usize;

    loop {
        for _ in 0..depth {
            out.push(' ');
        }

        let index = bytes.len() - buf.remaining();
        if buf.remaining() == 0 {
            break;
        }

        let key = match buf.decode_varint() {
            Ok(k) => k,
            Err(e) => {
                let _ = writeln!(out, "{index:3}: fetching tag err {e}");
                break;
            }
        };
        let number = key >> 3;
        let Some(wire) = WireType::from_raw((key & 7) as u8) else {
            let _ = writeln!(out, "{index:3}: t={number:3}, unknown wire={}", key & 7);
            break;
        };

        match wire {
            WireType::Bytes => match buf.decode_raw_bytes() {
                Ok(r) => {
                    let _ = write!(out, "{index:3}: t={number:3}, bytes [{}]", r.len());
                    if r.len() <= 8 {
                        for b in r {
                            let _ = write!(out, " {b:02x}");
                        }
                    } else {
                        for b in &r[..4] {
                            let _ = write!(out, " {b:02x}");
                        }
                        let _ = write!(out, " ..");
                        for b in &r[r.len() - 4..] {
                            let _ = write!(out, " {b:02x}");
                        }
                    }
                    out.push('\n');
                }
                Err(_) => break,
            },
            WireType::Fixed32 => match buf.decode_fixed32() {
                Ok(u) => {
                    let _ = writeln!(out, "{index:3}: t={number:3}, fix32 {u}");
                }
                Err(e) => {
                    let _ = writeln!(out, "{index:3}: t={number:3}, fix32 err {e}");
                    break;
                }
            },
            WireType::Fixed64 => match buf.decode_fixed64() {
                Ok(u) => {
                    let _ = writeln!(out, "{index:3}: t={number:3}, fix64 {u}");
                }
                Err(e) => {
                    let _ = writeln!(out, "{index:3}: t={number:3}, fix64 err {e}");
                    break;
                }
            },
            WireType::Varint => match buf.decode_varint() {
                Ok(u) => {
                    let _ = writeln!(out, "{index:3}: t={number:3}, varint {u}");
                }
                Err(e) => {
                    let _ = writeln!(out, "{index:3}: t={number:3}, varint err {e}");
                    break;
                }
            },
            WireType::StartGroup => {
                let _ = writeln!(out, "{index:3}: t={number:3}, start");
                depth += 1;
            }
            WireType::EndGroup => {
                depth = depth.saturating_sub(1);
                let _ = writeln!(out, "{index:3}: t={number:3}, end");
            }
        }
    }

    if depth != 0 {
        let _ = writeln!(
            out,
            "{:3}: start-end not balanced {depth}",
            bytes.len() - buf.remaining()
        );
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumps_scalar_items() {
        // field 1 varint 150, field 2 "hi"
        let bytes = [0x08, 0x96, 0x01, 0x12, 0x02, b'h', b'i'];
        let dump = debug_print(&bytes);
        assert!(dump.contains("t=  1, varint 150"), "{dump}");
        assert!(dump.contains("t=  2, bytes [2] 68 69"), "{dump}");
    }

    #[test]
    fn groups_render_as_nesting() {
        // field 1 start-group, field 2 varint 1, field 1 end-group
        let bytes = [0x0B, 0x10, 0x01, 0x0C];
        let dump = debug_print(&bytes);
        assert!(dump.contains("start"), "{dump}");
        assert!(dump.contains("end"), "{dump}");
        assert!(!dump.contains("not balanced"), "{dump}");
    }

    #[test]
    fn unbalanced_groups_are_flagged() {
        let bytes = [0x0B, 0x10, 0x01];
        let dump = debug_print(&bytes);
        assert!(dump.contains("start-end not balanced 1"), "{dump}");
    }

    #[test]
    fn long_bytes_are_elided() {
        let mut bytes = vec![0x12, 12];
        bytes.extend_from_slice(b"abcdefghijkl");
        let dump = debug_print(&bytes);
        assert!(dump.contains("bytes [12] 61 62 63 64 .. 69 6a 6b 6c"), "{dump}");
    }
}
