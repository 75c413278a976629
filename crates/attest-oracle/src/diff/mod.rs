//! Field-level diff reporting between an incoming request and a stored case.
//!
//! The output contract: applying every listed change to the request yields
//! the candidate's key exactly. `expected` is always the stored case's
//! value, `actual` the incoming request's.

pub mod json;
pub mod query;
pub mod text;

use crate::key::{BodyKey, CaseKey};
use serde::Serialize;
use serde_json::Value;

/// What kind of change an entry describes, from the request's point of view:
/// `add` this field to match, `remove` it, or `change` its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    Change,
    Add,
    Remove,
}

/// One field-level difference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    pub path: String,
    pub op: DiffOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
}

impl DiffEntry {
    pub fn change(path: String, expected: Value, actual: Value) -> Self {
        Self {
            path,
            op: DiffOp::Change,
            expected: Some(expected),
            actual: Some(actual),
        }
    }

    pub fn add(path: String, expected: Value) -> Self {
        Self {
            path,
            op: DiffOp::Add,
            expected: Some(expected),
            actual: None,
        }
    }

    pub fn remove(path: String, actual: Value) -> Self {
        Self {
            path,
            op: DiffOp::Remove,
            expected: None,
            actual: Some(actual),
        }
    }
}

fn body_value(body: &BodyKey) -> Option<Value> {
    match body {
        BodyKey::Absent => None,
        BodyKey::Json(value) => Some(value.clone()),
        BodyKey::Text(text) => Some(Value::String(text.clone())),
    }
}

/// Diff the body components of two keys.
fn diff_bodies(expected: &BodyKey, actual: &BodyKey, out: &mut Vec<DiffEntry>) {
    match (expected, actual) {
        (BodyKey::Json(expected), BodyKey::Json(actual)) => {
            json::diff_values("body", expected, actual, out)
        }
        (BodyKey::Text(expected), BodyKey::Text(actual)) => {
            if expected != actual {
                out.push(DiffEntry::change(
                    "body".to_string(),
                    Value::String(expected.clone()),
                    Value::String(actual.clone()),
                ));
            }
        }
        (BodyKey::Absent, BodyKey::Absent) => {}
        (expected, BodyKey::Absent) => {
            out.push(DiffEntry::add(
                "body".to_string(),
                body_value(expected).unwrap_or(Value::Null),
            ));
        }
        (BodyKey::Absent, actual) => {
            out.push(DiffEntry::remove(
                "body".to_string(),
                body_value(actual).unwrap_or(Value::Null),
            ));
        }
        (expected, actual) => {
            out.push(DiffEntry::change(
                "body".to_string(),
                body_value(expected).unwrap_or(Value::Null),
                body_value(actual).unwrap_or(Value::Null),
            ));
        }
    }
}

/// Number of body edits separating two keys, used as the secondary ranking
/// refinement among candidates that agree on method and URL.
pub fn body_edit_count(expected: &BodyKey, actual: &BodyKey) -> usize {
    match (expected, actual) {
        (BodyKey::Json(expected), BodyKey::Json(actual)) => json::edit_count(expected, actual),
        (BodyKey::Text(expected), BodyKey::Text(actual)) => text::edit_count(expected, actual),
        (BodyKey::Absent, BodyKey::Absent) => 0,
        _ => 1,
    }
}

/// Produce the full field-level diff between a request key and a candidate
/// case key.
pub fn describe(request: &CaseKey, candidate: &CaseKey) -> Vec<DiffEntry> {
    let mut out = Vec::new();

    if candidate.method != request.method {
        out.push(DiffEntry::change(
            "method".to_string(),
            Value::String(candidate.method.clone()),
            Value::String(request.method.clone()),
        ));
    }
    if candidate.path != request.path {
        out.push(DiffEntry::change(
            "path".to_string(),
            Value::String(candidate.path.clone()),
            Value::String(request.path.clone()),
        ));
    }
    query::diff_query(&candidate.query, &request.query, &mut out);
    diff_bodies(&candidate.body, &request.body, &mut out);

    // Extra key fields share the configured order on both sides
    for (name, candidate_value) in &candidate.extras {
        let request_value = request
            .extras
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v);
        match request_value {
            Some(value) if value == candidate_value => {}
            Some(Value::Null) | None => {
                out.push(DiffEntry::add(name.clone(), candidate_value.clone()))
            }
            Some(value) => out.push(DiffEntry::change(
                name.clone(),
                candidate_value.clone(),
                value.clone(),
            )),
        }
    }

    out
}
