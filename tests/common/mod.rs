use std::path::PathBuf;

use simplecovrs::store::CoverageStore;
use tempfile::TempDir;

pub const SAMPLE_RESULTSET: &[u8] = include_bytes!("../fixtures/sample_resultset.json");

/// Create a temporary `coverage/` directory holding the given result set and,
/// optionally, a `.last_run.json`. The caller must hold onto `TempDir` to
/// keep the directory alive.
pub fn setup_coverage_dir(resultset: &[u8], last_run: Option<&str>) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let coverage = dir.path().join("coverage");
    std::fs::create_dir_all(&coverage).unwrap();
    std::fs::write(coverage.join(".resultset.json"), resultset).unwrap();
    if let Some(last_run) = last_run {
        std::fs::write(coverage.join(".last_run.json"), last_run).unwrap();
    }
    (dir, coverage)
}

/// Load the sample fixture through the same path the binary uses.
#[allow(dead_code)]
pub fn load_sample(last_run: Option<&str>) -> (TempDir, CoverageStore) {
    let (dir, coverage) = setup_coverage_dir(SAMPLE_RESULTSET, last_run);
    let store = CoverageStore::load(&coverage).unwrap();
    (dir, store)
}
