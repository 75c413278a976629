//! Exact and nearest-candidate matching.
//!
//! The exact path is a single indexed lookup. On a miss, every stored case
//! is ranked by a structural distance over key components, with a nested
//! body-edit count refining the order among candidates that agree on
//! method and URL. All cases tied at the minimum distance are returned;
//! ties are common and all of them are informative to the caller.

use crate::diff::{self, DiffEntry};
use crate::key::CaseKey;
use crate::store::{CaseSet, TestCase};
use serde::Serialize;
use tracing::debug;

/// Candidate lists are cut here, but never inside the minimum-distance tie
/// group.
const MAX_CANDIDATES: usize = 5;

/// Structural distance between a request key and a case key.
///
/// `components` counts top-level key components that differ (method, path,
/// query set, body, each extra key field independently); `body_edits`
/// refines a body mismatch with its nested field-level diff count. Ordering
/// is lexicographic, so `body_edits` only separates keys with equal
/// component counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Distance {
    pub components: u32,
    pub body_edits: u32,
}

/// Which part of the corpus the nearest candidates were drawn from,
/// in decreasing order of how close the request already is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Nearest {
    /// Method and URL match some cases; only extra key fields differ.
    ExtraFields,
    /// Method, URL and extra fields match some cases; the body differs.
    Body,
    /// The URL is known, under a different method.
    Method,
    /// The path is known, under different query parameters.
    Query,
    /// Nothing shares the path; candidates are the closest known paths.
    Path,
}

/// One ranked near miss.
#[derive(Debug)]
pub struct Candidate<'a> {
    pub case: &'a TestCase,
    pub distance: Distance,
    pub diffs: Vec<DiffEntry>,
}

/// Result of matching one request against the case set.
#[derive(Debug)]
pub enum MatchOutcome<'a> {
    Exact(&'a TestCase),
    Candidates {
        nearest: Nearest,
        candidates: Vec<Candidate<'a>>,
    },
}

/// Distance between a request key and one stored case key.
pub fn distance(request: &CaseKey, case: &CaseKey) -> Distance {
    let mut components = 0u32;
    if request.method != case.method {
        components += 1;
    }
    if request.path != case.path {
        components += 1;
    }
    if request.query != case.query {
        components += 1;
    }
    let mut body_edits = 0u32;
    if request.body != case.body {
        components += 1;
        body_edits = diff::body_edit_count(&case.body, &request.body) as u32;
    }
    for (name, case_value) in &case.extras {
        let request_value = request.extras.iter().find(|(n, _)| n == name).map(|(_, v)| v);
        if request_value != Some(case_value) {
            components += 1;
        }
    }
    Distance {
        components,
        body_edits,
    }
}

/// Match a derived request key against the case set.
pub fn match_request<'a>(set: &'a CaseSet, key: &CaseKey) -> MatchOutcome<'a> {
    if let Some(case) = set.lookup_exact(key) {
        debug!(case = case.ordinal, "exact match");
        return MatchOutcome::Exact(case);
    }

    let mut ranked: Vec<(&TestCase, Distance)> = set
        .cases()
        .iter()
        .map(|case| (case, distance(key, &case.key)))
        .collect();
    // Within one distance, closer paths first; the stable sort then keeps
    // corpus order as the final tie-break
    ranked.sort_by_key(|(case, d)| (*d, diff::text::edit_count(&key.path, &case.key.path)));

    let minimum = ranked.first().map(|(_, d)| *d);
    let candidates: Vec<Candidate<'a>> = ranked
        .into_iter()
        .enumerate()
        .take_while(|(i, (_, d))| *i < MAX_CANDIDATES || Some(*d) == minimum)
        .map(|(_, (case, distance))| Candidate {
            diffs: diff::describe(key, &case.key),
            case,
            distance,
        })
        .collect();

    let nearest = classify(set, key);
    debug!(
        candidates = candidates.len(),
        nearest = ?nearest,
        "no exact match"
    );
    MatchOutcome::Candidates {
        nearest,
        candidates,
    }
}

/// Classify what the nearest group of cases already shares with the
/// request: known reqline, known URL, known path, or none of those.
fn classify(set: &CaseSet, key: &CaseKey) -> Nearest {
    let reqline_group = set.reqline_group(key);
    if !reqline_group.is_empty() {
        let extras_match = reqline_group
            .iter()
            .any(|&i| set.cases()[i].key.extras == key.extras);
        return if extras_match {
            Nearest::Body
        } else {
            Nearest::ExtraFields
        };
    }
    if !set.url_group(key).is_empty() {
        return Nearest::Method;
    }
    if !set.path_group(key).is_empty() {
        return Nearest::Query;
    }
    Nearest::Path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::key::{derive_key, RequestParts};
    use serde_json::{json, Map, Value};
    use std::path::Path;

    fn load(corpus: &str, request_keys: &[&str]) -> (tempfile::TempDir, CaseSet) {
        let dir = tempfile::tempdir().unwrap();
        let compact = dir.path().join("cases.yaml");
        std::fs::write(&compact, corpus).unwrap();
        let config = Config {
            compact_files: vec![compact],
            request_keys: request_keys.iter().map(|s| s.to_string()).collect(),
            ..Config::default()
        };
        let set = CaseSet::load(&config).unwrap();
        (dir, set)
    }

    fn request_key(
        set_config_keys: &[&str],
        method: &str,
        url: &str,
        body: Option<Value>,
        fields: &[(&str, Value)],
    ) -> CaseKey {
        let config = Config {
            compact_files: vec![Path::new("unused.yaml").to_path_buf()],
            request_keys: set_config_keys.iter().map(|s| s.to_string()).collect(),
            ..Config::default()
        };
        let fields: Map<String, Value> = fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        derive_key(
            RequestParts {
                method,
                url,
                body: body.as_ref(),
                fields: &fields,
            },
            &config.key_spec(),
        )
    }

    #[test]
    fn test_exact_match_ignores_query_order_and_method_case() {
        let (_dir, set) = load(
            "- method: GET\n  url: /x?b=2&a=1\n  responseBody: ok\n",
            &[],
        );
        let key = request_key(&[], "get", "/x?a=1&b=2", None, &[]);
        assert!(matches!(match_request(&set, &key), MatchOutcome::Exact(_)));
    }

    #[test]
    fn test_empty_set_yields_empty_candidates() {
        let (_dir, set) = load("", &[]);
        let key = request_key(&[], "GET", "/x", None, &[]);
        match match_request(&set, &key) {
            MatchOutcome::Candidates { candidates, .. } => assert!(candidates.is_empty()),
            MatchOutcome::Exact(_) => panic!("empty set cannot match"),
        }
    }

    #[test]
    fn test_all_minimum_ties_are_returned() {
        let corpus = "\
- method: GET
  url: /stories
  story: happy
- method: GET
  url: /stories
  story: sad
";
        let (_dir, set) = load(corpus, &["story"]);
        let key = request_key(&["story"], "GET", "/stories", None, &[]);
        match match_request(&set, &key) {
            MatchOutcome::Candidates {
                nearest,
                candidates,
            } => {
                assert_eq!(nearest, Nearest::ExtraFields);
                assert_eq!(candidates.len(), 2);
                assert_eq!(candidates[0].distance, candidates[1].distance);
                for candidate in &candidates {
                    assert_eq!(candidate.diffs.len(), 1);
                    assert_eq!(candidate.diffs[0].path, "story");
                }
            }
            MatchOutcome::Exact(_) => panic!("request without story must not match"),
        }
    }

    #[test]
    fn test_ranking_is_distance_monotonic() {
        let corpus = "\
- description: near
  method: POST
  url: /x
  body: {a: 1, b: 2, c: 3}
- description: far
  method: POST
  url: /x
  body: {a: 9, b: 8, c: 7}
";
        let (_dir, set) = load(corpus, &[]);
        let key = request_key(&[], "POST", "/x", Some(json!({"a": 1, "b": 2, "c": 4})), &[]);
        match match_request(&set, &key) {
            MatchOutcome::Candidates {
                nearest,
                candidates,
            } => {
                assert_eq!(nearest, Nearest::Body);
                assert_eq!(candidates[0].case.description.as_deref(), Some("near"));
                assert!(candidates[0].distance < candidates[1].distance);
            }
            MatchOutcome::Exact(_) => panic!("bodies differ"),
        }
    }

    #[test]
    fn test_tie_break_is_corpus_order() {
        let corpus = "\
- description: first
  method: GET
  url: /x?p=1
- description: second
  method: GET
  url: /x?p=2
";
        let (_dir, set) = load(corpus, &[]);
        let key = request_key(&[], "GET", "/x?p=3", None, &[]);
        match match_request(&set, &key) {
            MatchOutcome::Candidates { candidates, .. } => {
                assert_eq!(candidates[0].case.description.as_deref(), Some("first"));
                assert_eq!(candidates[1].case.description.as_deref(), Some("second"));
            }
            MatchOutcome::Exact(_) => panic!("queries differ"),
        }
    }

    #[test]
    fn test_nearest_tier_precedence() {
        let corpus = "\
- method: GET
  url: /known?q=1
- method: GET
  url: /other
";
        let (_dir, set) = load(corpus, &[]);

        // Known URL, wrong method
        let key = request_key(&[], "DELETE", "/known?q=1", None, &[]);
        match match_request(&set, &key) {
            MatchOutcome::Candidates { nearest, .. } => assert_eq!(nearest, Nearest::Method),
            _ => panic!(),
        }

        // Known path, wrong query
        let key = request_key(&[], "GET", "/known?q=2", None, &[]);
        match match_request(&set, &key) {
            MatchOutcome::Candidates { nearest, .. } => assert_eq!(nearest, Nearest::Query),
            _ => panic!(),
        }

        // Unknown path
        let key = request_key(&[], "GET", "/unknown", None, &[]);
        match match_request(&set, &key) {
            MatchOutcome::Candidates { nearest, .. } => assert_eq!(nearest, Nearest::Path),
            _ => panic!(),
        }
    }

    #[test]
    fn test_unknown_path_candidates_rank_by_path_closeness() {
        let corpus = "\
- description: widgets
  method: GET
  url: /api/widgets
- description: gadgets
  method: GET
  url: /api/gadgets
";
        let (_dir, set) = load(corpus, &[]);
        let key = request_key(&[], "GET", "/api/widget", None, &[]);
        match match_request(&set, &key) {
            MatchOutcome::Candidates {
                nearest,
                candidates,
            } => {
                assert_eq!(nearest, Nearest::Path);
                assert_eq!(candidates[0].case.description.as_deref(), Some("widgets"));
                assert_eq!(candidates[1].case.description.as_deref(), Some("gadgets"));
            }
            MatchOutcome::Exact(_) => panic!("paths differ"),
        }
    }

    #[test]
    fn test_candidate_list_is_truncated_beyond_ties() {
        let mut corpus = String::new();
        for i in 0..8 {
            corpus.push_str(&format!("- method: GET\n  url: /p{i}\n"));
        }
        let (_dir, set) = load(&corpus, &[]);
        let key = request_key(&[], "POST", "/q", Some(json!({"a": 1})), &[]);
        match match_request(&set, &key) {
            MatchOutcome::Candidates { candidates, .. } => {
                // All eight tie at the same distance, so none may be cut
                assert_eq!(candidates.len(), 8);
            }
            _ => panic!(),
        }

        // With distinct distances the list stops at five
        let key = request_key(&[], "GET", "/p0?extra=1", None, &[]);
        match match_request(&set, &key) {
            MatchOutcome::Candidates { candidates, .. } => {
                assert_eq!(candidates.len(), MAX_CANDIDATES);
            }
            _ => panic!(),
        }
    }
}
