//! The four read-only queries served over a [`CoverageStore`].

use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::{Result, SimplecovError};
use crate::model::{CoverageSummary, FileDetail, FileStats, UncoveredLines};
use crate::store::CoverageStore;

/// Column used to order `list_files` results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    #[value(name = "path")]
    Path,
    #[value(name = "line_coverage")]
    LineCoverage,
    #[value(name = "branch_coverage")]
    BranchCoverage,
    #[value(name = "missed_lines")]
    MissedLines,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Filters and ordering for `list_files`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, JsonSchema)]
pub struct ListOptions {
    /// Sort key (default: path)
    #[serde(default)]
    pub sort_by: SortKey,
    /// Sort order (default: asc)
    #[serde(default)]
    pub order: SortOrder,
    /// Keep files whose line coverage is at least this percentage (0-100)
    #[serde(default)]
    pub min_coverage: Option<f64>,
    /// Keep files whose line coverage is at most this percentage (0-100)
    #[serde(default)]
    pub max_coverage: Option<f64>,
    /// Keep files whose path contains this substring
    #[serde(default)]
    pub path_pattern: Option<String>,
}

impl ListOptions {
    pub fn validate(&self) -> Result<()> {
        for (name, bound) in [
            ("min_coverage", self.min_coverage),
            ("max_coverage", self.max_coverage),
        ] {
            if let Some(v) = bound {
                if !(0.0..=100.0).contains(&v) {
                    return Err(SimplecovError::Other(format!(
                        "{name} must be between 0 and 100, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn keeps(&self, file: &FileStats) -> bool {
        if let Some(pattern) = self.path_pattern.as_deref() {
            if !pattern.is_empty() && !file.file_path.contains(pattern) {
                return false;
            }
        }
        if let Some(min) = self.min_coverage {
            if file.line_coverage < min {
                return false;
            }
        }
        if let Some(max) = self.max_coverage {
            if file.line_coverage > max {
                return false;
            }
        }
        true
    }
}

/// Aggregate percentages, file count and the cached last-run figures.
#[must_use]
pub fn get_summary(store: &CoverageStore) -> CoverageSummary {
    store.summary()
}

/// Per-file statistics, filtered then sorted.
///
/// Coverage bounds apply to line coverage only. Files without branch data
/// sort as 0% under `branch_coverage`. The sort is stable, so ties keep
/// path order.
pub fn list_files(store: &CoverageStore, opts: &ListOptions) -> Result<Vec<FileStats>> {
    opts.validate()?;

    let mut files: Vec<FileStats> = store
        .file_stats()
        .into_iter()
        .filter(|f| opts.keeps(f))
        .collect();

    files.sort_by(|a, b| {
        let cmp = match opts.sort_by {
            SortKey::Path => a.file_path.cmp(&b.file_path),
            SortKey::LineCoverage => a.line_coverage.total_cmp(&b.line_coverage),
            SortKey::BranchCoverage => a
                .branch_coverage
                .unwrap_or(0.0)
                .total_cmp(&b.branch_coverage.unwrap_or(0.0)),
            SortKey::MissedLines => a.missed_lines.cmp(&b.missed_lines),
        };
        match opts.order {
            SortOrder::Asc => cmp,
            SortOrder::Desc => cmp.reverse(),
        }
    });

    Ok(files)
}

/// Full detail for the file matching `file_path` exactly or by suffix.
pub fn get_file_coverage(store: &CoverageStore, file_path: &str) -> Result<FileDetail> {
    store
        .file_detail(file_path)
        .ok_or_else(|| SimplecovError::FileNotFound(file_path.to_string()))
}

/// Uncovered line numbers and never-taken branch outcomes for one file.
pub fn get_uncovered_lines(store: &CoverageStore, file_path: &str) -> Result<UncoveredLines> {
    let detail = get_file_coverage(store, file_path)?;
    let uncovered_branches = detail.uncovered_branches();
    Ok(UncoveredLines {
        file_path: detail.stats.file_path,
        line_coverage: detail.stats.line_coverage,
        uncovered_line_numbers: detail.uncovered_line_numbers,
        uncovered_branches,
    })
}
