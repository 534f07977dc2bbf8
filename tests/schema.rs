//! # Schema Emission
//!
//! Checks the `.proto` text reconstructed from field plans: single message
//! blocks, the full-file emitter with transitive discovery, well-known-type
//! imports, reserved lines, `optional` prefixes and `name=` overrides.

use std::collections::BTreeMap;

use protoplan::{as_proto, as_proto_full, Reserved, SchemaOptions};

protoplan::message! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Port {
        pub number: u32 => "varint,1",
        pub label: String => "bytes,2,name=port_label",
    }
}

protoplan::message! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct Device {
        pub host_name: String => "bytes,1",
        pub ports: Vec<Port> => "bytes,2",
        pub seen: Option<time::OffsetDateTime> => "bytes,3,optional",
        pub uptime: time::Duration => "bytes,4",
        pub attrs: BTreeMap<String, String> => ("bytes,5", "bytes,1", "bytes,2"),
        old: Reserved => "6,7",
    }
}

#[test]
fn single_message_block() {
    let text = as_proto::<Port>().unwrap();
    assert_eq!(
        text,
        "message Port {\n  uint32 number = 1;\n  string port_label = 2;\n}"
    );
}

#[test]
fn block_with_all_field_flavors() {
    let text = as_proto::<Device>().unwrap();
    let expected = "\
message Device {
  string host_name = 1;
  repeated Port ports = 2;
  optional google.protobuf.Timestamp seen = 3;
  google.protobuf.Duration uptime = 4;
  map<string, string> attrs = 5;
  reserved 6, 7;
}";
    assert_eq!(text, expected);
}

#[test]
fn full_file_discovers_referenced_types() {
    let text = as_proto_full::<Device>(&SchemaOptions::default()).unwrap();
    let expected = "\
// protobuf definitions generated by protoplan::as_proto_full(schema::Device)

syntax = \"proto3\";

package schema;

import \"google/protobuf/duration.proto\";
import \"google/protobuf/timestamp.proto\";

message Device {
  string host_name = 1;
  repeated Port ports = 2;
  optional google.protobuf.Timestamp seen = 3;
  google.protobuf.Duration uptime = 4;
  map<string, string> attrs = 5;
  reserved 6, 7;
}

message Port {
  uint32 number = 1;
  string port_label = 2;
}";
    assert_eq!(text, expected);
}

#[test]
fn extra_headers_follow_the_package_line() {
    let options = SchemaOptions {
        extra_headers: vec!["option go_package = \"example/devices\";".to_string()],
        ..SchemaOptions::default()
    };
    let text = as_proto_full::<Port>(&options).unwrap();
    let package_at = text.find("package schema;").unwrap();
    let option_at = text.find("option go_package").unwrap();
    assert!(package_at < option_at);
}

#[test]
fn custom_naming_hooks() {
    fn shouty(name: &str) -> String {
        name.to_uppercase()
    }
    let options = SchemaOptions {
        field_name: shouty,
        ..SchemaOptions::default()
    };
    let text = as_proto_full::<Port>(&options).unwrap();
    assert!(text.contains("uint32 NUMBER = 1;"), "{text}");
    // the name= override beats the hook
    assert!(text.contains("string port_label = 2;"), "{text}");
}

#[test]
fn output_is_reproducible() {
    let a = as_proto_full::<Device>(&SchemaOptions::default()).unwrap();
    let b = as_proto_full::<Device>(&SchemaOptions::default()).unwrap();
    assert_eq!(a, b);
}
