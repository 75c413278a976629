//! Case key derivation.
//!
//! A [`CaseKey`] is the comparison-normalized identity of a request: method
//! (case-normalized), URL path, parsed query parameters, structural body,
//! and any configured extra key fields in configured order. Two keys compare
//! equal component-wise, never by byte equality of the source text, so query
//! parameter order and JSON object key order are irrelevant.

mod query;

pub use query::{parse_query_string, split_url, QueryParams};

use serde_json::{Map, Value};

/// One configured extra key field, with an optional default value used when
/// a record does not carry the field.
#[derive(Debug, Clone)]
pub struct KeyField {
    pub name: String,
    pub default: Option<Value>,
}

/// The ordered set of extra key fields from configuration.
#[derive(Debug, Clone, Default)]
pub struct KeySpec {
    pub fields: Vec<KeyField>,
}

impl KeySpec {
    pub fn new(fields: Vec<KeyField>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Structural view of a request body for keying purposes.
///
/// A string-valued body is opaque text; any other JSON value is compared as
/// a parsed tree (object key order irrelevant, array order significant).
#[derive(Debug, Clone, PartialEq)]
pub enum BodyKey {
    Absent,
    Json(Value),
    Text(String),
}

impl BodyKey {
    pub fn from_value(body: Option<&Value>) -> Self {
        match body {
            None | Some(Value::Null) => BodyKey::Absent,
            Some(Value::String(text)) => BodyKey::Text(text.clone()),
            Some(value) => BodyKey::Json(value.clone()),
        }
    }

    fn tagged(&self) -> Value {
        match self {
            BodyKey::Absent => Value::Null,
            BodyKey::Json(value) => serde_json::json!({ "json": value }),
            BodyKey::Text(text) => serde_json::json!({ "text": text }),
        }
    }
}

/// The derived lookup key of a request or stored case.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseKey {
    pub method: String,
    pub path: String,
    pub query: QueryParams,
    pub body: BodyKey,
    /// Configured extra fields in configured order. A record that omits a
    /// field (and has no configured default) carries an explicit
    /// `Value::Null`, so absence on both sides matches and absence against
    /// a real value does not.
    pub extras: Vec<(String, Value)>,
}

/// The raw material a key is derived from, borrowed from either a stored
/// case record or an incoming request record.
#[derive(Debug, Clone, Copy)]
pub struct RequestParts<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub body: Option<&'a Value>,
    /// Side-channel fields of the record (everything outside method/url/body).
    pub fields: &'a Map<String, Value>,
}

/// Derive the comparison key for a request or stored case.
pub fn derive_key(parts: RequestParts<'_>, spec: &KeySpec) -> CaseKey {
    let (path, query) = split_url(parts.url);

    let extras = spec
        .fields
        .iter()
        .map(|field| {
            let value = parts
                .fields
                .get(&field.name)
                .cloned()
                .or_else(|| field.default.clone())
                .unwrap_or(Value::Null);
            (field.name.clone(), value)
        })
        .collect();

    CaseKey {
        method: parts.method.to_uppercase(),
        path,
        query,
        body: BodyKey::from_value(parts.body),
        extras,
    }
}

impl CaseKey {
    /// Canonical fingerprint of this key.
    ///
    /// The fingerprint is a deterministic rendering with sorted object keys,
    /// so two keys are equal iff their fingerprints are byte-equal. It
    /// doubles as the case identifier in augmentation files.
    pub fn fingerprint(&self) -> String {
        let extras: Vec<Value> = self
            .extras
            .iter()
            .map(|(name, value)| {
                Value::Array(vec![Value::String(name.clone()), value.clone()])
            })
            .collect();

        let key = Value::Array(vec![
            Value::String(self.method.clone()),
            Value::String(self.path.clone()),
            self.query_value(),
            self.body.tagged(),
            Value::Array(extras),
        ]);

        let mut out = String::new();
        write_canonical(&key, &mut out);
        out
    }

    /// The method + URL portion of the key (used for grouping near misses).
    pub fn reqline_fingerprint(&self) -> String {
        format!("{} {}", self.method, self.url_fingerprint())
    }

    /// The path + query portion of the key.
    pub fn url_fingerprint(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.path);
        out.push('?');
        write_canonical(&self.query_value(), &mut out);
        out
    }

    fn query_value(&self) -> Value {
        self.query
            .iter()
            .map(|(name, values)| {
                (
                    name.clone(),
                    Value::Array(values.iter().cloned().map(Value::String).collect()),
                )
            })
            .collect::<Map<String, Value>>()
            .into()
    }
}

/// Write a JSON value in canonical form: compact, with object keys sorted.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
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
        Value::Object(map) => {
            let mut names: Vec<&String> = map.keys().collect();
            names.sort();
            out.push('{');
            for (i, name) in names.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(&Value::String(name.clone()), out);
                out.push(':');
                write_canonical(&map[name], out);
            }
            out.push('}');
        }
        // Scalars already render deterministically
        scalar => out.push_str(&scalar.to_string()),
    }
}
