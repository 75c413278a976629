//! Augmentation entries and update-file handling.
//!
//! Augmentation data is what a test run learns about a case after the fact
//! (an observed response status, a corrected response field). At run time it
//! is only ever appended to an update log; an explicit commit later folds
//! the log into the compact corpus. The canonical case definition is never
//! edited in place during a run.

use super::corpus::CaseRecord;
use crate::error::{OracleError, Result};
use crate::key::KeySpec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;

/// Fields an augmentation entry may never touch: rewriting them would
/// change the case's identity out from under the entry's own `case` id.
const PROTECTED_FIELDS: &[&str] = &["method", "url", "body"];

/// One learned delta for one case.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AugmentationEntry {
    /// Case key fingerprint the delta attaches to.
    pub case: String,
    /// Sparse field -> value mapping, applied last-write-wins.
    pub fields: Map<String, Value>,
}

/// Read all entries from an update log, oldest first.
///
/// A missing or empty log is an empty set of pending updates, not an error.
pub fn read_update_file(path: &Path) -> Result<Vec<AugmentationEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)
        .map_err(|e| OracleError::data(path, format!("cannot read: {e}")))?;
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    let doc: serde_yaml::Value = serde_yaml::from_str(&contents)
        .map_err(|e| OracleError::data(path, format!("invalid YAML: {e}")))?;
    if doc.is_null() {
        return Ok(Vec::new());
    }
    serde_yaml::from_value(doc)
        .map_err(|e| OracleError::data(path, format!("malformed augmentation entry: {e}")))
}

/// Append entries to an update log. The log is a YAML sequence, so new
/// entries concatenate without rewriting what is already there.
pub fn append_updates(path: &Path, entries: &[AugmentationEntry]) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let fragment = serde_yaml::to_string(entries)
        .map_err(|e| OracleError::data(path, format!("cannot serialize entries: {e}")))?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| OracleError::data(path, format!("cannot open for append: {e}")))?;
    file.write_all(fragment.as_bytes())
        .map_err(|e| OracleError::data(path, format!("cannot append: {e}")))?;
    Ok(())
}

/// Reject entries that would rewrite key-bearing fields.
pub fn validate_entry(entry: &AugmentationEntry, spec: &KeySpec, file: &Path) -> Result<()> {
    for name in entry.fields.keys() {
        let protected = PROTECTED_FIELDS.contains(&name.as_str())
            || spec.fields.iter().any(|field| &field.name == name);
        if protected {
            return Err(OracleError::data(
                file,
                format!(
                    "augmentation entry for case {} rewrites key field '{name}'",
                    entry.case
                ),
            ));
        }
    }
    Ok(())
}

/// Apply one entry's fields onto a case record.
pub fn apply_entry(record: &mut CaseRecord, entry: &AugmentationEntry, file: &Path) -> Result<()> {
    for (name, value) in &entry.fields {
        match name.as_str() {
            "description" => match value {
                Value::String(text) => record.description = Some(text.clone()),
                other => {
                    return Err(OracleError::data(
                        file,
                        format!("description for case {} is not a string: {other}", entry.case),
                    ))
                }
            },
            "responseStatus" => {
                let status = value
                    .as_u64()
                    .and_then(|n| u16::try_from(n).ok())
                    .ok_or_else(|| {
                        OracleError::data(
                            file,
                            format!(
                                "responseStatus for case {} is not a status code: {value}",
                                entry.case
                            ),
                        )
                    })?;
                record.response_status = Some(status);
            }
            _ => {
                record.rest.insert(name.clone(), value.clone());
            }
        }
    }
    Ok(())
}
