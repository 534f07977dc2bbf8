//! # Schema Emitter
//!
//! Reconstructs `.proto` source text from compiled field plans: one
//! `message` block per record type, a `reserved` line where numbers are
//! reserved, imports for the well-known types actually used, and any
//! definitions or imports contributed by self-coding types.
//!
//! [`as_proto`] renders a single message block. [`as_proto_full`] chases
//! every record type transitively referenced from the roots and produces a
//! complete compilable file. Discovery is a worklist; output order is
//! lexicographic by type name and imports are sorted, so the text is
//! reproducible run to run and diffs stay small.
//!
//! Naming goes through three hooks carried in [`SchemaOptions`]; the
//! defaults lowercase field names camel-to-snake, reuse Rust type names as
//! message names, and take the last module-path segment as the package.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::Result;
use crate::props::cache::get_properties;
use crate::props::{FieldCodec, Property, SchemaType, StructProperties};
use crate::reflect::{Message, TypeDescriptor};

/// Naming hooks and extra header lines for schema generation. Replaces the
/// original's process-global configuration: pass a value, get deterministic
/// output.
pub struct SchemaOptions {
    /// Maps a record field name to the emitted field name.
    pub field_name: fn(&str) -> String,
    /// Maps (record type name, field name) to the emitted message type name.
    pub type_name: fn(&str, &str) -> String,
    /// Maps the root type's module path to the `package` name.
    pub package_name: fn(&str) -> String,
    /// Extra lines inserted after the `package` line.
    pub extra_headers: Vec<String>,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        SchemaOptions {
            field_name: lowercase_field_name,
            type_name: uppercase_type_name,
            package_name: same_package_name,
            extra_headers: Vec::new(),
        }
    }
}

/// Default field-name hook: camel case to snake case, inserting an
/// underscore before each uppercase letter that follows a lowercase one.
/// `HelloWorld` becomes `hello_world`; acronym runs survive, so `L2TP`
/// stays `l2tp`. Names already containing `_` are lowercased unchanged.
pub fn lowercase_field_name(name: &str) -> String {
    if name.contains('_') {
        return name.to_lowercase();
    }
    let mut out = String::with_capacity(name.len() * 2);
    let mut prev_was_upper = true; // keeps the first rune from getting a '_'
    for c in name.chars() {
        if c.is_uppercase() {
            if !prev_was_upper {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_was_upper = true;
        } else {
            if c.is_lowercase() {
                prev_was_upper = false;
            }
            // digits and anything else leave the state alone; that keeps
            // names like L2TP from splitting
            out.push(c);
        }
    }
    out
}

/// Default type-name hook: the Rust type name is already a reasonable
/// message name.
pub fn uppercase_type_name(type_name: &str, field_name: &str) -> String {
    if type_name.is_empty() {
        field_name.to_string()
    } else {
        type_name.to_string()
    }
}

/// Default package-name hook: the last segment of the module path.
pub fn same_package_name(module_path: &str) -> String {
    module_path
        .rsplit("::")
        .next()
        .unwrap_or(module_path)
        .to_string()
}

/// Renders one record type as a `message` block with default options.
pub fn as_proto<M: Message>() -> Result<String> {
    as_proto_desc(M::descriptor())
}

/// Renders one record type as a `message` block.
pub fn as_proto_desc(desc: &'static TypeDescriptor) -> Result<String> {
    let plan = get_properties(desc)?;
    Ok(message_block(&plan, &SchemaOptions::default()))
}

/// Renders a complete `.proto` file for a record type and everything it
/// transitively references.
pub fn as_proto_full<M: Message>(options: &SchemaOptions) -> Result<String> {
    as_proto_full_with(&[M::descriptor()], options)
}

enum Discovered {
    Plan(Arc<StructProperties>),
    Definition(&'static str),
}

/// Renders a complete `.proto` file for several root types. The first root
/// determines the package line.
pub fn as_proto_full_with(
    roots: &[&'static TypeDescriptor],
    options: &SchemaOptions,
) -> Result<String> {
    let mut done: BTreeMap<String, Discovered> = BTreeMap::new();
    let mut imports: BTreeSet<String> = BTreeSet::new();
    let mut todo: Vec<Arc<StructProperties>> = Vec::new();

    for root in roots {
        let plan = get_properties(root)?;
        if !done.contains_key(root.name) {
            done.insert(root.name.to_string(), Discovered::Plan(plan.clone()));
            todo.push(plan);
        }
    }

    // lather, rinse, repeat until every referenced type is discovered
    while let Some(plan) = todo.pop() {
        for prop in plan.props() {
            discover(prop, &mut done, &mut imports, &mut todo);
        }
    }

    let mut lines: Vec<String> = Vec::new();
    if let Some(root) = roots.first() {
        lines.push(format!(
            "// protobuf definitions generated by protoplan::as_proto_full({}::{})",
            root.module_path, root.name
        ));
        lines.push(String::new());
        lines.push("syntax = \"proto3\";".to_string());
        lines.push(String::new());
        lines.push(format!(
            "package {};",
            (options.package_name)(root.module_path)
        ));
        lines.extend(options.extra_headers.iter().cloned());
    }

    if !imports.is_empty() {
        lines.push(String::new());
        for imp in &imports {
            lines.push(format!("import \"{imp}\";"));
        }
    }

    for entry in done.values() {
        lines.push(String::new());
        match entry {
            Discovered::Plan(plan) => lines.push(message_block(plan, options)),
            Discovered::Definition(def) => lines.push((*def).to_string()),
        }
    }

    Ok(lines.join("\n"))
}

fn discover(
    prop: &Property,
    done: &mut BTreeMap<String, Discovered>,
    imports: &mut BTreeSet<String>,
    todo: &mut Vec<Arc<StructProperties>>,
) {
    match &prop.schema_type {
        SchemaType::Timestamp { .. } => {
            imports.insert("google/protobuf/timestamp.proto".to_string());
        }
        SchemaType::Duration { .. } => {
            imports.insert("google/protobuf/duration.proto".to_string());
        }
        SchemaType::Custom { ct, .. } => {
            for imp in ct.imports {
                imports.insert((*imp).to_string());
            }
            if let Some(def) = ct.definition {
                done.entry(ct.proto_name.to_string())
                    .or_insert(Discovered::Definition(def));
            }
        }
        _ => {}
    }

    match &prop.codec {
        FieldCodec::Message(plan)
        | FieldCodec::OptMessage(plan)
        | FieldCodec::MessageSeq(plan)
        | FieldCodec::MessageArray(plan, _) => {
            if !done.contains_key(plan.type_name()) {
                done.insert(plan.type_name().to_string(), Discovered::Plan(plan.clone()));
                todo.push(plan.clone());
            }
        }
        FieldCodec::Map { key, value } => {
            discover(key, done, imports, todo);
            discover(value, done, imports, todo);
        }
        _ => {}
    }
}

fn message_block(plan: &StructProperties, options: &SchemaOptions) -> String {
    let mut lines = vec![format!("message {} {{", plan.type_name())];
    for prop in plan.props() {
        let optional = if prop.is_optional { "optional " } else { "" };
        lines.push(format!(
            "  {}{} {} = {};",
            optional,
            field_type_text(prop, options),
            schema_field_name(prop, options),
            prop.field_number
        ));
    }
    if !plan.reserved().is_empty() {
        let nums: Vec<String> = plan.reserved().iter().map(u32::to_string).collect();
        lines.push(format!("  reserved {};", nums.join(", ")));
    }
    lines.push("}".to_string());
    lines.join("\n")
}

/// The `name=` tag item overrides any computed field name; that automates
/// manual fixups that would otherwise need a hook.
fn schema_field_name(prop: &Property, options: &SchemaOptions) -> String {
    for item in prop.wire.split(',') {
        if let Some(name) = item.strip_prefix("name=") {
            return name.to_string();
        }
    }
    (options.field_name)(prop.name)
}

fn field_type_text(prop: &Property, options: &SchemaOptions) -> String {
    let (base, repeated) = match &prop.schema_type {
        SchemaType::Simple { name, repeated } => ((*name).to_string(), *repeated),
        SchemaType::Message { name, repeated } => {
            ((options.type_name)(name, prop.name), *repeated)
        }
        SchemaType::Timestamp { repeated } => {
            ("google.protobuf.Timestamp".to_string(), *repeated)
        }
        SchemaType::Duration { repeated } => ("google.protobuf.Duration".to_string(), *repeated),
        SchemaType::Custom { ct, repeated } => (ct.proto_name.to_string(), *repeated),
        SchemaType::Map => {
            let (key, value) = match prop.map_plans() {
                Some(pair) => pair,
                None => return "map<?, ?>".to_string(),
            };
            return format!(
                "map<{}, {}>",
                field_type_text(key, options),
                field_type_text(value, options)
            );
        }
    };
    if repeated {
        format!("repeated {base}")
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_to_snake() {
        assert_eq!(lowercase_field_name("HelloWorld"), "hello_world");
        assert_eq!(lowercase_field_name("Hello"), "hello");
        assert_eq!(lowercase_field_name("helloWorld"), "hello_world");
        assert_eq!(lowercase_field_name("XMLDocument"), "xmldocument");
    }

    #[test]
    fn acronym_runs_survive() {
        assert_eq!(lowercase_field_name("L2TP"), "l2tp");
    }

    #[test]
    fn underscored_names_just_lowercase() {
        assert_eq!(lowercase_field_name("already_snake"), "already_snake");
        assert_eq!(lowercase_field_name("Mixed_Case"), "mixed_case");
    }

    #[test]
    fn package_from_module_path() {
        assert_eq!(same_package_name("my_crate::telemetry::types"), "types");
        assert_eq!(same_package_name("my_crate"), "my_crate");
    }

    #[test]
    fn type_name_prefers_type() {
        assert_eq!(uppercase_type_name("Point", "location"), "Point");
        assert_eq!(uppercase_type_name("", "location"), "location");
    }
}
