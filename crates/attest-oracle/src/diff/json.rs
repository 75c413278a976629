//! Structural diff over JSON trees.
//!
//! Objects diff shared keys by value and list added/removed keys; arrays
//! diff by index up to the shorter length and list the extra elements;
//! scalars compare directly. Paths use dotted/bracketed notation rooted at
//! the caller-supplied prefix.

use super::{DiffEntry, DiffOp};
use serde_json::Value;

/// Recursively diff `actual` against `expected`, appending one entry per
/// leaf-level difference.
pub fn diff_values(path: &str, expected: &Value, actual: &Value, out: &mut Vec<DiffEntry>) {
    match (expected, actual) {
        (Value::Object(expected_map), Value::Object(actual_map)) => {
            for (name, expected_value) in expected_map {
                let child = format!("{path}.{name}");
                match actual_map.get(name) {
                    Some(actual_value) => {
                        diff_values(&child, expected_value, actual_value, out)
                    }
                    None => out.push(DiffEntry::add(child, expected_value.clone())),
                }
            }
            for (name, actual_value) in actual_map {
                if !expected_map.contains_key(name) {
                    out.push(DiffEntry::remove(format!("{path}.{name}"), actual_value.clone()));
                }
            }
        }
        (Value::Array(expected_items), Value::Array(actual_items)) => {
            let shared = expected_items.len().min(actual_items.len());
            for i in 0..shared {
                diff_values(
                    &format!("{path}[{i}]"),
                    &expected_items[i],
                    &actual_items[i],
                    out,
                );
            }
            for (i, item) in expected_items.iter().enumerate().skip(shared) {
                out.push(DiffEntry::add(format!("{path}[{i}]"), item.clone()));
            }
            for (i, item) in actual_items.iter().enumerate().skip(shared) {
                out.push(DiffEntry::remove(format!("{path}[{i}]"), item.clone()));
            }
        }
        (expected, actual) => {
            if expected != actual {
                out.push(DiffEntry::change(
                    path.to_string(),
                    expected.clone(),
                    actual.clone(),
                ));
            }
        }
    }
}

/// Count of leaf-level differences between two JSON trees.
pub fn edit_count(expected: &Value, actual: &Value) -> usize {
    let mut out = Vec::new();
    diff_values("body", expected, actual, &mut out);
    out.len()
}
