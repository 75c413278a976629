//! Union of interface-extension case files into a main case file.

use super::{corpus, lock};
use crate::error::{OracleError, Result};
use crate::key::{derive_key, KeySpec};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub total: usize,
    pub from_main: usize,
    pub from_extensions: usize,
}

/// Union the cases of `main_file` and every extension file into `out_file`,
/// keyed by case key.
///
/// Every source case appears exactly once in the result, with its full
/// definition preserved. A case-key collision between any two source files
/// is ambiguous (which case wins?) and is reported as a data error naming
/// both origins, never silently resolved.
pub fn merge_test_extensions(
    main_file: &Path,
    extension_files: &[PathBuf],
    out_file: &Path,
    spec: &KeySpec,
) -> Result<MergeOutcome> {
    let mut merged = corpus::parse_case_file(main_file)?;
    let from_main = merged.len();

    // fingerprint -> origin of first sighting
    let mut seen: HashMap<String, (PathBuf, usize)> = HashMap::with_capacity(merged.len());
    for (i, case) in merged.iter().enumerate() {
        let fingerprint = derive_key(case.key_parts(), spec).fingerprint();
        if let Some((first_file, first_index)) =
            seen.insert(fingerprint, (main_file.to_path_buf(), i))
        {
            return Err(collision(main_file, i, &first_file, first_index));
        }
    }

    for extension_file in extension_files {
        let extension_cases = corpus::parse_case_file(extension_file)?;
        for (i, case) in extension_cases.into_iter().enumerate() {
            let fingerprint = derive_key(case.key_parts(), spec).fingerprint();
            if let Some((first_file, first_index)) =
                seen.insert(fingerprint, (extension_file.clone(), i))
            {
                return Err(collision(extension_file, i, &first_file, first_index));
            }
            merged.push(case);
        }
    }

    let outcome = MergeOutcome {
        total: merged.len(),
        from_main,
        from_extensions: merged.len() - from_main,
    };
    let rendered = corpus::render_case_file(out_file, &merged)?;
    lock::write_atomic(out_file, &rendered)
        .map_err(|e| OracleError::data(out_file, format!("cannot write merged file: {e}")))?;

    info!(
        total = outcome.total,
        extensions = extension_files.len(),
        out = %out_file.display(),
        "merged case files"
    );
    Ok(outcome)
}

fn collision(file: &Path, index: usize, first_file: &Path, first_index: usize) -> OracleError {
    OracleError::data(
        file,
        format!(
            "case #{index} collides on case key with case #{first_index} of {}",
            first_file.display()
        ),
    )
}
