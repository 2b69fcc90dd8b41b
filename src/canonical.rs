//! Canonical Encoding - Deterministic, diff-friendly template text
//!
//! Key order at every object depth: precedence keys, remaining keys sorted,
//! `location` last.

use serde_json::{Map, Value};

use crate::coerce::format_number;

/// Keys emitted first, in this order, wherever they appear.
pub const KEY_PRECEDENCE: [&str; 8] = [
    "id",
    "name",
    "description",
    "license",
    "requires",
    "settings",
    "design",
    "cookie",
];

/// Always emitted after every other key of its object.
pub const TRAILING_KEY: &str = "location";

const INDENT: &str = "  ";

/// Encode any JSON value as canonical text (no trailing newline).
pub fn encode(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0);
    out
}

pub fn encode_document(doc: &Map<String, Value>) -> String {
    let mut out = String::new();
    write_object(&mut out, doc, 0);
    out
}

/// Emission order of the keys of one object.
pub fn ordered_keys(map: &Map<String, Value>) -> Vec<&str> {
    let mut keys: Vec<&str> = KEY_PRECEDENCE
        .iter()
        .copied()
        .filter(|key| map.contains_key(*key))
        .collect();

    let mut rest: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|key| !KEY_PRECEDENCE.contains(key) && *key != TRAILING_KEY)
        .collect();
    rest.sort_unstable();
    keys.extend(rest);

    if map.contains_key(TRAILING_KEY) {
        keys.push(TRAILING_KEY);
    }
    keys
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Object(map) => write_object(out, map, depth),
        Value::Array(items) => write_array(out, items, depth),
        Value::String(s) => write_string(out, s),
        Value::Number(n) => out.push_str(&format_number(n)),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Null => out.push_str("null"),
    }
}

fn write_object(out: &mut String, map: &Map<String, Value>, depth: usize) {
    out.push_str("{\n");
    let keys = ordered_keys(map);
    for (i, key) in keys.iter().enumerate() {
        push_indent(out, depth + 1);
        write_string(out, key);
        out.push_str(": ");
        if let Some(value) = map.get(*key) {
            write_value(out, value, depth + 1);
        }
        if i + 1 < keys.len() {
            out.push(',');
        }
        out.push('\n');
    }
    push_indent(out, depth);
    out.push('}');
}

fn write_array(out: &mut String, items: &[Value], depth: usize) {
    out.push_str("[\n");
    for (i, item) in items.iter().enumerate() {
        push_indent(out, depth + 1);
        write_value(out, item, depth + 1);
        if i + 1 < items.len() {
            out.push(',');
        }
        out.push('\n');
    }
    push_indent(out, depth);
    out.push(']');
}

// JSON string escaping: quotes, backslashes and control characters only.
fn write_string(out: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}
