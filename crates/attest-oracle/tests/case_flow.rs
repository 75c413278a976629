//! End-to-end flow: load a corpus, serve exchanges, append augmentation,
//! commit it, and observe the committed data on the next load.

use attest_oracle::store::{augment, commit_updates, merge_test_extensions, CaseSet};
use attest_oracle::Config;
use serde_json::json;
use std::path::{Path, PathBuf};

const CORPUS: &str = r#"
- description: list widgets
  method: GET
  url: /widgets?page=1&sort=asc
  responseBody:
    widgets: [1, 2, 3]
- description: create widget
  method: POST
  url: /widgets
  body:
    name: sprocket
    size: 3
  responseStatus: 201
  responseBody:
    id: 9
- description: happy story
  method: GET
  url: /stories
  story: happy
  responseBody: {mood: good}
- description: sad story
  method: GET
  url: /stories
  story: sad
  responseBody: {mood: bad}
"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn config_for(dir: &Path) -> Config {
    Config {
        compact_files: vec![dir.join("cases.yaml")],
        update_files: vec![dir.join("pending.yaml")],
        request_keys: vec!["story".to_string()],
        ..Config::default()
    }
}

#[test]
fn exact_match_then_augment_then_commit_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "cases.yaml", CORPUS);
    let config = config_for(dir.path());

    // Exact match, query order and method case normalized away
    let set = CaseSet::load(&config).unwrap();
    let reply = attest_oracle::service::exchange(
        &set,
        &config,
        r#"{"method":"get","url":"/widgets?sort=asc&page=1"}"#,
    );
    assert_eq!(reply.get("responseStatus"), Some(&json!(200)));
    assert_eq!(
        reply.get("responseBody"),
        Some(&json!({"widgets": [1, 2, 3]}))
    );

    // A test run learns the real status and appends it to the update log
    let fingerprint = set.cases()[0].fingerprint.clone();
    drop(set);
    augment::append_updates(
        &config.update_files[0],
        &[augment::AugmentationEntry {
            case: fingerprint,
            fields: [("responseStatus".to_string(), json!(203))]
                .into_iter()
                .collect(),
        }],
    )
    .unwrap();

    // Before commit: the overlay already serves the learned status
    let set = CaseSet::load(&config).unwrap();
    let reply = attest_oracle::service::exchange(
        &set,
        &config,
        r#"{"method":"GET","url":"/widgets?page=1&sort=asc"}"#,
    );
    assert_eq!(reply.get("responseStatus"), Some(&json!(203)));
    drop(set);

    // Commit folds the log into the compact file and clears the log
    let spec = config.key_spec();
    let outcome = commit_updates(&config.update_files[0], &config.compact_files[0], &spec).unwrap();
    assert_eq!(outcome.entries_applied, 1);
    assert_eq!(
        std::fs::read_to_string(&config.update_files[0]).unwrap(),
        ""
    );

    // Committing again changes nothing
    let committed = std::fs::read(&config.compact_files[0]).unwrap();
    commit_updates(&config.update_files[0], &config.compact_files[0], &spec).unwrap();
    assert_eq!(std::fs::read(&config.compact_files[0]).unwrap(), committed);

    // The committed status survives a fresh load with an empty log
    let set = CaseSet::load(&config).unwrap();
    let reply = attest_oracle::service::exchange(
        &set,
        &config,
        r#"{"method":"GET","url":"/widgets?page=1&sort=asc"}"#,
    );
    assert_eq!(reply.get("responseStatus"), Some(&json!(203)));
}

#[test]
fn near_miss_reports_are_actionable() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "cases.yaml", CORPUS);
    let config = config_for(dir.path());
    let set = CaseSet::load(&config).unwrap();

    // Story cases tie; both come back, each differing only in `story`
    let reply =
        attest_oracle::service::exchange(&set, &config, r#"{"method":"GET","url":"/stories"}"#);
    assert_eq!(reply.get("nearest"), Some(&json!("extraFields")));
    let candidates = reply["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 2);
    for candidate in candidates {
        let diffs = candidate["diffs"].as_array().unwrap();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0]["path"], json!("story"));
        assert_eq!(diffs[0]["op"], json!("add"));
    }

    // Body near miss names the exact field to change
    let reply = attest_oracle::service::exchange(
        &set,
        &config,
        r#"{"method":"POST","url":"/widgets","body":{"name":"sprocket","size":4}}"#,
    );
    assert_eq!(reply.get("nearest"), Some(&json!("body")));
    let diffs = reply["candidates"][0]["diffs"].as_array().unwrap();
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0]["path"], json!("body.size"));
    assert_eq!(diffs[0]["expected"], json!(3));
    assert_eq!(diffs[0]["actual"], json!(4));
    assert_eq!(reply.get("responseStatus"), None);
}

#[test]
fn extension_merge_is_lossless_and_collision_checked() {
    let dir = tempfile::tempdir().unwrap();
    let main = write(dir.path(), "main.yaml", CORPUS);
    let extension = write(
        dir.path(),
        "ext.yaml",
        "- method: DELETE\n  url: /widgets/9\n  responseStatus: 204\n",
    );
    let merged = dir.path().join("merged.yaml");

    let spec = config_for(dir.path()).key_spec();
    let outcome = merge_test_extensions(&main, &[extension.clone()], &merged, &spec).unwrap();
    assert_eq!(outcome.total, 5);
    assert_eq!(outcome.from_main, 4);
    assert_eq!(outcome.from_extensions, 1);

    // A colliding extension is refused and the output is untouched
    let colliding = write(
        dir.path(),
        "bad.yaml",
        "- method: get\n  url: /widgets?sort=asc&page=1\n  responseBody: {}\n",
    );
    let before = std::fs::read(&merged).unwrap();
    let err = merge_test_extensions(&main, &[colliding], &merged, &spec).unwrap_err();
    assert!(err.to_string().contains("collides"));
    assert_eq!(std::fs::read(&merged).unwrap(), before);
}
