//! Content fingerprints.
//!
//! A fingerprint is the SHA-256 of a payload's canonical JSON form: object
//! keys sorted lexicographically at every depth, compact separators. Two
//! payloads holding the same key/value pairs always fingerprint the same,
//! whatever order they were built in.

use crate::digest::{digest, HashAlgorithm};
use crate::Payload;
use serde_json::{Map, Value};
use std::fmt::Write;

/// Algorithm used for record and state fingerprints.
pub const FINGERPRINT_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// Serialize `value` with object keys sorted at every level.
///
/// Does not rely on serde_json's map ordering, so the result is stable even
/// when the `preserve_order` feature is enabled somewhere in the build.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_object(map, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}

fn write_object(map: &Map<String, Value>, out: &mut String) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    out.push('{');
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        // Display on Value is infallible compact JSON
        let _ = write!(out, "{}", Value::String((*key).clone()));
        out.push(':');
        write_canonical(&map[key.as_str()], out);
    }
    out.push('}');
}

/// Fingerprint an arbitrary JSON value.
pub fn fingerprint(value: &Value) -> String {
    digest(canonical_json(value), FINGERPRINT_ALGORITHM)
}

/// Fingerprint a record payload.
pub fn fingerprint_map(data: &Payload) -> String {
    let mut out = String::new();
    write_object(data, &mut out);
    digest(out, FINGERPRINT_ALGORITHM)
}
