//! Case corpus file parsing.
//!
//! A corpus file is a YAML document holding a sequence of case mappings.
//! The fields the oracle interprets are typed; everything else (response
//! payload, configured extra key fields, annotations) rides along in `rest`
//! and is preserved through commit and merge.

use crate::error::{OracleError, Result};
use crate::key::RequestParts;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// One recorded test case as it appears on disk.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub method: String,
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Expected HTTP status; filled from configuration when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,

    /// Everything else: response payload, extra key fields, annotations.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl CaseRecord {
    /// Borrow the pieces key derivation works from.
    pub fn key_parts(&self) -> RequestParts<'_> {
        RequestParts {
            method: &self.method,
            url: &self.url,
            body: self.body.as_ref(),
            fields: &self.rest,
        }
    }

    /// The full case mapping as JSON, in wire field names.
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        if let Some(description) = &self.description {
            payload.insert("description".to_string(), Value::String(description.clone()));
        }
        payload.insert("method".to_string(), Value::String(self.method.clone()));
        payload.insert("url".to_string(), Value::String(self.url.clone()));
        if let Some(body) = &self.body {
            payload.insert("body".to_string(), body.clone());
        }
        if let Some(status) = self.response_status {
            payload.insert("responseStatus".to_string(), Value::from(status));
        }
        for (name, value) in &self.rest {
            payload.insert(name.clone(), value.clone());
        }
        payload
    }
}

/// Parse a corpus file into case records.
///
/// An empty or null document is an empty corpus; anything else that fails
/// to deserialize is a data error naming the file.
pub fn parse_case_file(path: &Path) -> Result<Vec<CaseRecord>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| OracleError::data(path, format!("cannot read: {e}")))?;
    parse_cases(&contents).map_err(|reason| OracleError::data(path, reason))
}

fn parse_cases(contents: &str) -> std::result::Result<Vec<CaseRecord>, String> {
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    let doc: serde_yaml::Value =
        serde_yaml::from_str(contents).map_err(|e| format!("invalid YAML: {e}"))?;
    if doc.is_null() {
        return Ok(Vec::new());
    }
    serde_yaml::from_value(doc).map_err(|e| format!("malformed case record: {e}"))
}

/// Serialize case records back to a corpus document destined for `path`.
pub fn render_case_file(path: &Path, cases: &[CaseRecord]) -> Result<String> {
    serde_yaml::to_string(cases)
        .map_err(|e| OracleError::data(path, format!("cannot serialize cases: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CORPUS: &str = r#"
- description: list widgets
  method: GET
  url: /widgets?page=1
  responseStatus: 200
  responseBody:
    widgets: []
- method: post
  url: /widgets
  body:
    name: sprocket
  story: happy
"#;

    #[test]
    fn test_parse_corpus() {
        let cases: Vec<CaseRecord> = serde_yaml::from_str(CORPUS).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].description.as_deref(), Some("list widgets"));
        assert_eq!(cases[0].response_status, Some(200));
        assert_eq!(cases[1].body, Some(json!({"name": "sprocket"})));
        assert_eq!(cases[1].rest.get("story"), Some(&json!("happy")));
    }

    #[test]
    fn test_missing_url_is_malformed() {
        let result = parse_cases("- method: GET\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_document_is_empty_corpus() {
        assert!(parse_cases("").unwrap().is_empty());
        assert!(parse_cases("# just a comment\n").unwrap().is_empty());
    }

    #[test]
    fn test_payload_round_trip_preserves_rest_fields() {
        let cases: Vec<CaseRecord> = serde_yaml::from_str(CORPUS).unwrap();
        let payload = cases[0].to_payload();
        assert_eq!(payload.get("method"), Some(&json!("GET")));
        assert_eq!(payload.get("responseStatus"), Some(&json!(200)));
        assert_eq!(payload.get("responseBody"), Some(&json!({"widgets": []})));
    }

    #[test]
    fn test_render_parses_back() {
        let cases: Vec<CaseRecord> = serde_yaml::from_str(CORPUS).unwrap();
        let rendered = render_case_file(Path::new("cases.yaml"), &cases).unwrap();
        let reparsed: Vec<CaseRecord> = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(cases, reparsed);
    }
}
