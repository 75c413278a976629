//! Diff over parsed query-parameter mappings.

use super::{DiffEntry, DiffOp};
use crate::key::QueryParams;
use serde_json::Value;

fn values_json(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

/// Diff `actual` query parameters against `expected`, one entry per
/// parameter whose value sequence differs.
pub fn diff_query(expected: &QueryParams, actual: &QueryParams, out: &mut Vec<DiffEntry>) {
    for (name, expected_values) in expected {
        let path = format!("query.{name}");
        match actual.get(name) {
            Some(actual_values) if actual_values == expected_values => {}
            Some(actual_values) => out.push(DiffEntry::change(
                path,
                values_json(expected_values),
                values_json(actual_values),
            )),
            None => out.push(DiffEntry::add(path, values_json(expected_values))),
        }
    }
    for (name, actual_values) in actual {
        if !expected.contains_key(name) {
            out.push(DiffEntry::remove(
                format!("query.{name}"),
                values_json(actual_values),
            ));
        }
    }
}

/// Count of parameters whose value sequences differ.
pub fn edit_count(expected: &QueryParams, actual: &QueryParams) -> usize {
    let mut out = Vec::new();
    diff_query(expected, actual, &mut out);
    out.len()
}
