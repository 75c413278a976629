//! Folding pending update logs into the compact corpus.
//!
//! The commit path walks `Base -> Dirty -> Committing -> Base`; on any
//! failure it lands in `Failed` with the compact file byte-identical to the
//! last committed state and the update log untouched. The write itself is
//! temp-then-rename under an exclusive advisory lock, so no partial state
//! is ever observable from outside.

use super::{augment, corpus, lock};
use crate::error::{OracleError, Result};
use crate::key::{derive_key, KeySpec};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    pub entries_applied: usize,
    pub cases_updated: usize,
}

/// Fold every entry of `update_file` into `compact_file`, last-write-wins
/// per field in log order, then clear the log.
///
/// Safe to re-run: with no pending entries the compact file is not rewritten
/// at all, so repeated commits leave it byte-for-byte unchanged.
pub fn commit_updates(
    update_file: &Path,
    compact_file: &Path,
    spec: &KeySpec,
) -> Result<CommitOutcome> {
    let entries = augment::read_update_file(update_file)?;
    if entries.is_empty() {
        info!(
            update = %update_file.display(),
            "no pending augmentation entries, compact file untouched"
        );
        return Ok(CommitOutcome {
            entries_applied: 0,
            cases_updated: 0,
        });
    }
    debug!(pending = entries.len(), "entering commit");

    let _lock = lock::acquire(compact_file).map_err(|source| OracleError::CommitIo {
        file: compact_file.to_path_buf(),
        source,
    })?;

    let mut cases = corpus::parse_case_file(compact_file)?;
    let mut index: HashMap<String, usize> = HashMap::with_capacity(cases.len());
    for (i, case) in cases.iter().enumerate() {
        let fingerprint = derive_key(case.key_parts(), spec).fingerprint();
        if let Some(first) = index.insert(fingerprint, i) {
            return Err(OracleError::data(
                compact_file,
                format!("cases #{first} and #{i} share one case key"),
            ));
        }
    }

    let mut touched: HashSet<usize> = HashSet::new();
    for entry in &entries {
        augment::validate_entry(entry, spec, update_file)?;
        let i = *index.get(&entry.case).ok_or_else(|| {
            OracleError::data(
                update_file,
                format!("augmentation entry references unknown case {}", entry.case),
            )
        })?;
        augment::apply_entry(&mut cases[i], entry, update_file)?;
        touched.insert(i);
    }

    let rendered = corpus::render_case_file(compact_file, &cases)?;
    lock::write_atomic(compact_file, &rendered).map_err(|source| OracleError::CommitIo {
        file: compact_file.to_path_buf(),
        source,
    })?;

    // The compact file is committed; only now may the log be cleared.
    std::fs::File::create(update_file).map_err(|source| OracleError::CommitIo {
        file: update_file.to_path_buf(),
        source,
    })?;

    let outcome = CommitOutcome {
        entries_applied: entries.len(),
        cases_updated: touched.len(),
    };
    info!(
        entries = outcome.entries_applied,
        cases = outcome.cases_updated,
        compact = %compact_file.display(),
        "committed augmentation updates"
    );
    Ok(outcome)
}
