mod common;

use simplecovrs::error::SimplecovError;
use simplecovrs::model::LineHits::{NotRelevant, Relevant};
use simplecovrs::store::CoverageStore;

#[test]
fn load_merges_suites() {
    let (_dir, store) = common::load_sample(None);

    assert_eq!(store.len(), 3);

    let user = store.get("/project/app/models/user.rb").unwrap();
    assert_eq!(
        user.lines,
        vec![
            Relevant(2),
            Relevant(1),
            Relevant(2),
            NotRelevant,
            Relevant(3),
            Relevant(0),
            NotRelevant
        ]
    );
}

#[test]
fn load_keeps_first_suite_branches() {
    let (_dir, store) = common::load_sample(None);

    let user = store.get("/project/app/models/user.rb").unwrap();
    let branches = user.branches.as_ref().unwrap();
    let (_, outcomes) = branches.iter().next().unwrap();
    let hits: Vec<u64> = outcomes.values().copied().collect();
    // RSpec is listed first; Minitest's branch counts are dropped.
    assert_eq!(hits, vec![1, 0]);
}

#[test]
fn branch_merge_depends_on_suite_order() {
    let forward = br#"{
        "A": {"coverage": {"x.rb": {"lines": [1], "branches": {"c": {"then": 1, "else": 0}}}}},
        "B": {"coverage": {"x.rb": {"lines": [0], "branches": {"c": {"then": 0, "else": 2}}}}}
    }"#;
    let reversed = br#"{
        "B": {"coverage": {"x.rb": {"lines": [0], "branches": {"c": {"then": 0, "else": 2}}}}},
        "A": {"coverage": {"x.rb": {"lines": [1], "branches": {"c": {"then": 1, "else": 0}}}}}
    }"#;

    let a_first = CoverageStore::from_slice(forward).unwrap();
    let b_first = CoverageStore::from_slice(reversed).unwrap();

    let a_file = a_first.get("x.rb").unwrap();
    let b_file = b_first.get("x.rb").unwrap();
    assert_eq!(a_file.lines, b_file.lines);
    assert_ne!(a_file.branches, b_file.branches);
}

#[test]
fn load_reads_last_run() {
    let (_dir, store) = common::load_sample(Some(r#"{"result": {"line": 91.23, "branch": 80.5}}"#));

    let last_run = store.last_run().unwrap();
    assert_eq!(last_run.line, 91.23);
    assert_eq!(last_run.branch, Some(80.5));
}

#[test]
fn load_without_last_run() {
    let (_dir, store) = common::load_sample(None);
    assert!(store.last_run().is_none());
}

#[test]
fn load_ignores_malformed_last_run() {
    let (_dir, store) = common::load_sample(Some("not json"));
    assert!(store.last_run().is_none());
    assert_eq!(store.len(), 3);
}

#[test]
fn load_missing_resultset_fails() {
    let dir = tempfile::tempdir().unwrap();

    let result = CoverageStore::load(dir.path());
    assert!(matches!(result, Err(SimplecovError::Io { .. })));
}

#[test]
fn load_malformed_resultset_fails() {
    let (_dir, coverage) = common::setup_coverage_dir(b"{\"RSpec\": {\"coverage\": 42}}", None);

    let err = CoverageStore::load(&coverage).unwrap_err();
    assert!(matches!(err, SimplecovError::Json { .. }));
    assert!(err.to_string().contains(".resultset.json"));
}

#[test]
fn discover_then_load() {
    let (dir, _) = common::setup_coverage_dir(common::SAMPLE_RESULTSET, None);
    let nested = dir.path().join("app").join("models");
    std::fs::create_dir_all(&nested).unwrap();

    let found = simplecovrs::discover::discover_from(None, &nested).unwrap();
    let store = CoverageStore::load(&found).unwrap();
    assert_eq!(store.len(), 3);
}

#[test]
fn huge_hit_counts_saturate_when_merged() {
    let data = br#"{
        "A": {"coverage": {"x.rb": {"lines": [18446744073709551615, null]}}},
        "B": {"coverage": {"x.rb": {"lines": [1, null]}}}
    }"#;

    let store = CoverageStore::from_slice(data).unwrap();
    let file = store.get("x.rb").unwrap();
    assert_eq!(file.lines, vec![Relevant(u64::MAX), NotRelevant]);
}

#[test]
fn unequal_line_arrays_keep_first_suite_length() {
    let data = br#"{
        "A": {"coverage": {"x.rb": {"lines": [1]}}},
        "B": {"coverage": {"x.rb": {"lines": [1, 0]}}}
    }"#;

    let store = CoverageStore::from_slice(data).unwrap();
    let file = store.get("x.rb").unwrap();
    assert_eq!(file.lines, vec![Relevant(2)]);

    let summary = store.summary();
    assert_eq!(summary.computed.line_coverage, 100.0);
}

#[test]
fn repeated_branch_key_keeps_last_value() {
    let data = br#"{
        "A": {"coverage": {"x.rb": {
            "lines": [1],
            "branches": {"c": {"then": 0, "then": 1}}
        }}}
    }"#;

    let store = CoverageStore::from_slice(data).unwrap();
    let stats = store.file_stats().into_iter().next().unwrap();
    assert_eq!(stats.total_branches, 1);
    assert_eq!(stats.branch_coverage, Some(100.0));
}
