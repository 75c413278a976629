//! Case store: loading, indexing, and durably updating the corpus.
//!
//! The [`CaseSet`] is built once at startup from the compact corpus files
//! with any pending update logs overlaid, and is read-only for the life of
//! the process. Durable mutation happens only through the explicit
//! [`commit_updates`] and [`merge_test_extensions`] operations.

pub mod augment;
pub mod commit;
pub mod corpus;
mod lock;
pub mod merge;

pub use augment::AugmentationEntry;
pub use commit::{commit_updates, CommitOutcome};
pub use corpus::CaseRecord;
pub use merge::{merge_test_extensions, MergeOutcome};

use crate::config::Config;
use crate::error::{OracleError, Result};
use crate::key::{derive_key, CaseKey};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// One loaded case: derived key, effective (augmented) payload, provenance.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub key: CaseKey,
    pub fingerprint: String,
    /// Full case mapping with pending augmentation applied.
    pub payload: Map<String, Value>,
    pub description: Option<String>,
    pub response_status: Option<u16>,
    /// Corpus file this case came from.
    pub source: PathBuf,
    /// Position in corpus load order; the deterministic secondary order for
    /// candidate ranking.
    pub ordinal: usize,
}

/// The full loaded corpus with its lookup indexes.
#[derive(Debug)]
pub struct CaseSet {
    cases: Vec<TestCase>,
    /// Exact-match index: key fingerprint -> case.
    index: HashMap<String, usize>,
    /// Cases sharing method + URL (path and query), for near-miss grouping.
    by_reqline: HashMap<String, Vec<usize>>,
    /// Cases sharing URL (path and query).
    by_url: HashMap<String, Vec<usize>>,
    /// Cases sharing URL path.
    by_path: HashMap<String, Vec<usize>>,
}

impl CaseSet {
    /// Load the corpus named by `config`: all compact files, with every
    /// pending update log applied over them in file order.
    pub fn load(config: &Config) -> Result<CaseSet> {
        let spec = config.key_spec();

        let mut records: Vec<(PathBuf, usize, CaseRecord)> = Vec::new();
        for file in &config.compact_files {
            let cases = corpus::parse_case_file(file)?;
            debug!(file = %file.display(), cases = cases.len(), "parsed corpus file");
            for (i, record) in cases.into_iter().enumerate() {
                records.push((file.clone(), i, record));
            }
        }

        // Derive every key up front; collisions across the whole set are a
        // data error naming both origins.
        let mut keys = Vec::with_capacity(records.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
        for (ordinal, (file, i, record)) in records.iter().enumerate() {
            let key = derive_key(record.key_parts(), &spec);
            let fingerprint = key.fingerprint();
            if let Some(&first) = index.get(&fingerprint) {
                let (first_file, first_i, _) = &records[first];
                return Err(OracleError::data(
                    file,
                    format!(
                        "case #{i} collides on case key with case #{first_i} of {}",
                        first_file.display()
                    ),
                ));
            }
            index.insert(fingerprint.clone(), ordinal);
            keys.push((key, fingerprint));
        }

        let mut applied = 0usize;
        for update_file in &config.update_files {
            for entry in augment::read_update_file(update_file)? {
                augment::validate_entry(&entry, &spec, update_file)?;
                let ordinal = *index.get(&entry.case).ok_or_else(|| {
                    OracleError::data(
                        update_file,
                        format!("augmentation entry references unknown case {}", entry.case),
                    )
                })?;
                augment::apply_entry(&mut records[ordinal].2, &entry, update_file)?;
                applied += 1;
            }
        }

        let mut cases = Vec::with_capacity(records.len());
        let mut by_reqline: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_url: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_path: HashMap<String, Vec<usize>> = HashMap::new();
        for (ordinal, ((key, fingerprint), (file, _, record))) in
            keys.into_iter().zip(records.iter()).enumerate()
        {
            by_reqline
                .entry(key.reqline_fingerprint())
                .or_default()
                .push(ordinal);
            by_url.entry(key.url_fingerprint()).or_default().push(ordinal);
            by_path.entry(key.path.clone()).or_default().push(ordinal);
            cases.push(TestCase {
                payload: record.to_payload(),
                description: record.description.clone(),
                response_status: record.response_status,
                key,
                fingerprint,
                source: file.clone(),
                ordinal,
            });
        }

        info!(
            cases = cases.len(),
            files = config.compact_files.len(),
            augmentations = applied,
            "case set loaded"
        );
        Ok(CaseSet {
            cases,
            index,
            by_reqline,
            by_url,
            by_path,
        })
    }

    /// Indexed exact-match lookup.
    pub fn lookup_exact(&self, key: &CaseKey) -> Option<&TestCase> {
        self.lookup_fingerprint(&key.fingerprint())
    }

    pub fn lookup_fingerprint(&self, fingerprint: &str) -> Option<&TestCase> {
        self.index.get(fingerprint).map(|&i| &self.cases[i])
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Cases sharing the request's method + URL.
    pub fn reqline_group(&self, key: &CaseKey) -> &[usize] {
        self.by_reqline
            .get(&key.reqline_fingerprint())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cases sharing the request's URL (any method).
    pub fn url_group(&self, key: &CaseKey) -> &[usize] {
        self.by_url
            .get(&key.url_fingerprint())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cases sharing the request's URL path (any query).
    pub fn path_group(&self, key: &CaseKey) -> &[usize] {
        self.by_path.get(&key.path).map(Vec::as_slice).unwrap_or(&[])
    }
}
