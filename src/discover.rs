/// Locating the SimpleCov coverage directory.
///
/// Strategy:
///   1. An explicit path (CLI flag or `SIMPLECOV_COVERAGE_PATH`) must contain
///      `.resultset.json`, otherwise it is a configuration error
///   2. Otherwise walk up from the starting directory, checking each
///      ancestor for `coverage/.resultset.json`
use std::path::{Path, PathBuf};

use crate::error::{Result, SimplecovError};

pub const RESULTSET_FILE: &str = ".resultset.json";
pub const LAST_RUN_FILE: &str = ".last_run.json";
pub const COVERAGE_DIR: &str = "coverage";

/// Find the coverage directory, starting from the current working directory.
pub fn discover_coverage_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(|source| SimplecovError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    discover_from(explicit, &cwd)
}

/// Find the coverage directory, resolving relative paths against `start`.
pub fn discover_from(explicit: Option<&Path>, start: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let resolved = start.join(path);
        if resolved.join(RESULTSET_FILE).is_file() {
            return Ok(resolved);
        }
        return Err(SimplecovError::InvalidCoveragePath {
            path: path.to_path_buf(),
            file: RESULTSET_FILE,
        });
    }

    walk_up(start, None)
}

/// Check `start` and its ancestors for `coverage/.resultset.json`, stopping
/// after `ceiling` when one is given.
fn walk_up(start: &Path, ceiling: Option<&Path>) -> Result<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(COVERAGE_DIR);
        if candidate.join(RESULTSET_FILE).is_file() {
            tracing::debug!(dir = %candidate.display(), "found coverage directory");
            return Ok(candidate);
        }
        if Some(dir) == ceiling {
            break;
        }
    }

    Err(SimplecovError::CoverageDirNotFound {
        searched_from: start.to_path_buf(),
        pattern: format!("{COVERAGE_DIR}/{RESULTSET_FILE}"),
    })
}
