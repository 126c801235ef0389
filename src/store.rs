//! The merged coverage snapshot.
//!
//! A [`CoverageStore`] is built once from a SimpleCov coverage directory,
//! folding every suite in `.resultset.json` into one record per file, and is
//! read-only afterwards. Queries borrow it; nothing mutates it, so it can be
//! shared between threads behind an `Arc` without locking.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::Path;

use crate::discover::{LAST_RUN_FILE, RESULTSET_FILE};
use crate::error::{Result, SimplecovError};
use crate::model::*;
use crate::stats;

#[derive(Debug, Clone, Default)]
pub struct CoverageStore {
    files: BTreeMap<String, FileCoverage>,
    last_run: Option<LastRunResult>,
}

impl CoverageStore {
    /// Load `.resultset.json` (required) and `.last_run.json` (optional)
    /// from a coverage directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let resultset_path = dir.join(RESULTSET_FILE);
        let content = std::fs::read(&resultset_path).map_err(|source| SimplecovError::Io {
            path: resultset_path.clone(),
            source,
        })?;
        let report: RawSuiteReport =
            serde_json::from_slice(&content).map_err(|source| SimplecovError::Json {
                path: resultset_path.clone(),
                source,
            })?;

        let last_run = read_last_run(&dir.join(LAST_RUN_FILE));
        let store = Self::from_report(report, last_run);
        tracing::info!(
            files = store.len(),
            path = %resultset_path.display(),
            "loaded coverage data"
        );
        Ok(store)
    }

    /// Parse `.resultset.json` content already held in memory.
    pub fn from_slice(resultset: &[u8]) -> Result<Self> {
        let report: RawSuiteReport = serde_json::from_slice(resultset)?;
        Ok(Self::from_report(report, None))
    }

    /// Merge every suite of a parsed report, in document order.
    pub fn from_report(report: RawSuiteReport, last_run: Option<LastRunResult>) -> Self {
        let mut store = Self {
            files: BTreeMap::new(),
            last_run,
        };
        for (suite, report) in report {
            tracing::debug!(suite = %suite, files = report.coverage.len(), "merging suite");
            for (path, coverage) in report.coverage {
                store.record(path, coverage);
            }
        }
        store
    }

    /// Attach a last-run summary to an already built store.
    #[must_use]
    pub fn with_last_run(mut self, last_run: Option<LastRunResult>) -> Self {
        self.last_run = last_run;
        self
    }

    /// First sighting of a path inserts the record as-is; later sightings
    /// are folded into it.
    fn record(&mut self, path: String, coverage: FileCoverage) {
        match self.files.entry(path) {
            Entry::Vacant(slot) => {
                slot.insert(coverage);
            }
            Entry::Occupied(mut slot) => merge_into(slot.get_mut(), coverage),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn last_run(&self) -> Option<LastRunResult> {
        self.last_run
    }

    /// Exact lookup by store key.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileCoverage> {
        self.files.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileCoverage)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Find a file by exact key, falling back to the first key that ends
    /// with `path`.
    ///
    /// The fallback is a plain string suffix test, not a path-segment match:
    /// `"b/file.rb"` matches `"/a/b/file.rb"` but also `"/a/ab/file.rb"`.
    /// When several keys share the suffix, which one wins is unspecified.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<(&str, &FileCoverage)> {
        if let Some((key, coverage)) = self.files.get_key_value(path) {
            return Some((key.as_str(), coverage));
        }
        self.files
            .iter()
            .find(|(key, _)| key.ends_with(path))
            .map(|(key, coverage)| (key.as_str(), coverage))
    }

    /// Totals over every file, alongside the cached last-run figures.
    #[must_use]
    pub fn summary(&self) -> CoverageSummary {
        let (lines, branches) = stats::aggregate(self.files.values());
        CoverageSummary {
            last_run: self.last_run,
            total_files: self.files.len(),
            computed: ComputedCoverage {
                line_coverage: lines.percent(),
                branch_coverage: branches.percent(),
            },
        }
    }

    /// One statistics row per file, in key order.
    #[must_use]
    pub fn file_stats(&self) -> Vec<FileStats> {
        self.iter().map(|(path, cov)| cov.stats(path)).collect()
    }

    /// Resolve `path` and expand its coverage into a [`FileDetail`].
    #[must_use]
    pub fn file_detail(&self, path: &str) -> Option<FileDetail> {
        self.resolve(path)
            .map(|(key, coverage)| expand_detail(key, coverage))
    }
}

/// Fold `incoming` into the record already stored for the same file.
///
/// Lines combine pointwise (see [`merge_lines`]). Branch data is not
/// combined: the existing map is kept and `incoming`'s is dropped, unless
/// nothing was recorded yet. SimpleCov itself reports cross-suite branches
/// this way.
pub fn merge_into(existing: &mut FileCoverage, incoming: FileCoverage) {
    existing.lines = merge_lines(&existing.lines, &incoming.lines);
    if existing.branches.is_none() {
        existing.branches = incoming.branches;
    }
}

/// Pointwise combination of two suites' line arrays.
///
/// Arrays from the same source file have equal length in practice; if they
/// don't, the result keeps the length of `a`, the array recorded first.
/// Positions missing from `b` count as not relevant and extra positions in
/// `b` are dropped.
#[must_use]
pub fn merge_lines(a: &[LineHits], b: &[LineHits]) -> Vec<LineHits> {
    a.iter()
        .enumerate()
        .map(|(i, &left)| {
            let right = b.get(i).copied().unwrap_or(LineHits::NotRelevant);
            left.combine(right)
        })
        .collect()
}

fn expand_detail(path: &str, coverage: &FileCoverage) -> FileDetail {
    let lines: Vec<LineDetail> = coverage
        .lines
        .iter()
        .enumerate()
        .map(|(i, &hits)| LineDetail {
            line_number: i + 1,
            hits,
        })
        .collect();

    let uncovered_line_numbers = lines
        .iter()
        .filter(|l| l.hits == LineHits::Relevant(0))
        .map(|l| l.line_number)
        .collect();

    let branches = coverage
        .branches
        .iter()
        .flat_map(|b| b.iter())
        .map(|(condition, outcomes)| BranchCondition {
            condition: condition.to_string(),
            branches: outcomes
                .iter()
                .map(|(label, &hits)| BranchOutcome {
                    label: label.to_string(),
                    hits,
                })
                .collect(),
        })
        .collect();

    FileDetail {
        stats: coverage.stats(path),
        lines,
        uncovered_line_numbers,
        branches,
    }
}

/// A missing or unreadable `.last_run.json` leaves the summary without a
/// reference value.
fn read_last_run(path: &Path) -> Option<LastRunResult> {
    let content = match std::fs::read(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "no last run summary");
            return None;
        }
    };
    match serde_json::from_slice::<LastRun>(&content) {
        Ok(last) => Some(last.result),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed last run summary");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LineHits::{NotRelevant, Relevant};

    fn branch_map(condition: &str, outcomes: &[(&str, u64)]) -> Branches {
        OrderedMap(vec![(
            condition.to_string(),
            outcomes
                .iter()
                .map(|(label, hits)| (label.to_string(), *hits))
                .collect(),
        )])
    }

    fn store_of(files: &[(&str, FileCoverage)]) -> CoverageStore {
        let suite = SuiteReport {
            coverage: files
                .iter()
                .map(|(path, cov)| (path.to_string(), cov.clone()))
                .collect(),
        };
        CoverageStore::from_report(OrderedMap(vec![("RSpec".to_string(), suite)]), None)
    }

    #[test]
    fn test_merge_lines_pointwise() {
        let a = [Relevant(1), NotRelevant, Relevant(0), NotRelevant];
        let b = [Relevant(2), Relevant(3), NotRelevant, NotRelevant];
        assert_eq!(
            merge_lines(&a, &b),
            vec![Relevant(3), Relevant(3), Relevant(0), NotRelevant]
        );
    }

    #[test]
    fn test_merge_lines_commutes() {
        let a = [Relevant(1), NotRelevant, Relevant(4)];
        let b = [NotRelevant, Relevant(0), Relevant(5)];
        assert_eq!(merge_lines(&a, &b), merge_lines(&b, &a));
    }

    #[test]
    fn test_merge_lines_unequal_length_keeps_first_length() {
        let short = [Relevant(1)];
        let long = [Relevant(1), Relevant(0)];
        assert_eq!(merge_lines(&short, &long), vec![Relevant(2)]);
        assert_eq!(merge_lines(&long, &short), vec![Relevant(2), Relevant(0)]);
    }

    #[test]
    fn test_merge_keeps_first_branches() {
        let mut first = FileCoverage::new(vec![Relevant(1)])
            .with_branches(branch_map("[:if, 0]", &[("[:then, 1]", 1), ("[:else, 2]", 0)]));
        let second = FileCoverage::new(vec![Relevant(1)])
            .with_branches(branch_map("[:if, 0]", &[("[:then, 1]", 0), ("[:else, 2]", 5)]));

        merge_into(&mut first, second);

        let expected = branch_map("[:if, 0]", &[("[:then, 1]", 1), ("[:else, 2]", 0)]);
        assert_eq!(first.branches, Some(expected));
        assert_eq!(first.lines, vec![Relevant(2)]);
    }

    #[test]
    fn test_merge_adopts_branches_when_first_has_none() {
        let mut first = FileCoverage::new(vec![Relevant(1)]);
        let second = FileCoverage::new(vec![Relevant(1)])
            .with_branches(branch_map("[:if, 0]", &[("[:then, 1]", 2)]));

        merge_into(&mut first, second);

        assert!(first.branches.is_some());
    }

    #[test]
    fn test_resolve_exact_then_suffix() {
        let store = store_of(&[
            ("/app/models/user.rb", FileCoverage::new(vec![Relevant(1)])),
            ("user.rb", FileCoverage::new(vec![Relevant(0)])),
        ]);

        let (key, _) = store.resolve("user.rb").unwrap();
        assert_eq!(key, "user.rb");

        let (key, _) = store.resolve("models/user.rb").unwrap();
        assert_eq!(key, "/app/models/user.rb");

        assert!(store.resolve("post.rb").is_none());
    }

    #[test]
    fn test_resolve_suffix_is_not_segment_aware() {
        let store = store_of(&[("/app/lib/ab/file.rb", FileCoverage::new(vec![]))]);
        let (key, _) = store.resolve("b/file.rb").unwrap();
        assert_eq!(key, "/app/lib/ab/file.rb");
    }

    #[test]
    fn test_file_detail_expansion() {
        let cov = FileCoverage::new(vec![Relevant(1), Relevant(0), Relevant(0), NotRelevant])
            .with_branches(branch_map("[:if, 0]", &[("[:then, 1]", 1), ("[:else, 2]", 0)]));
        let store = store_of(&[("/app/a.rb", cov)]);

        let detail = store.file_detail("a.rb").unwrap();
        assert_eq!(detail.stats.file_path, "/app/a.rb");
        assert_eq!(detail.lines.len(), 4);
        assert_eq!(detail.lines[0].line_number, 1);
        assert_eq!(detail.lines[3].hits, NotRelevant);
        assert_eq!(detail.uncovered_line_numbers, vec![2, 3]);
        assert_eq!(detail.branches.len(), 1);
        assert_eq!(detail.branches[0].branches[1].label, "[:else, 2]");
        assert_eq!(detail.stats.branch_coverage, Some(50.0));
    }

    #[test]
    fn test_summary_empty_store() {
        let store = CoverageStore::default();
        let summary = store.summary();
        assert_eq!(summary.total_files, 0);
        assert_eq!(summary.computed.line_coverage, 100.0);
        assert_eq!(summary.computed.branch_coverage, None);
        assert_eq!(summary.last_run, None);
    }

    #[test]
    fn test_from_slice_rejects_malformed() {
        assert!(CoverageStore::from_slice(b"{\"RSpec\": ").is_err());
        assert!(CoverageStore::from_slice(b"[1, 2]").is_err());
    }
}
