//! Named query actions and their text renderings.
//!
//! Each action takes typed parameters and produces a [`ToolOutput`]: the
//! text handed back to the caller plus a flag marking failures. A file that
//! cannot be resolved is an error-flagged output, never a process failure.

use std::fmt::Write;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SimplecovError;
use crate::model::{FileDetail, FileStats, LineDetail};
use crate::query::{self, ListOptions};
use crate::store::CoverageStore;

pub const GET_SUMMARY: &str = "get_summary";
pub const LIST_FILES: &str = "list_files";
pub const GET_FILE_COVERAGE: &str = "get_file_coverage";
pub const GET_UNCOVERED_LINES: &str = "get_uncovered_lines";

pub const TOOL_NAMES: [&str; 4] = [
    GET_SUMMARY,
    LIST_FILES,
    GET_FILE_COVERAGE,
    GET_UNCOVERED_LINES,
];

/// Parameters for the per-file tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FileParams {
    /// File path, matched exactly or as a trailing substring of a stored path
    pub file_path: String,
}

/// Response text of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(text: String) -> Self {
        Self {
            text,
            is_error: false,
        }
    }

    pub fn error(text: String) -> Self {
        Self {
            text,
            is_error: true,
        }
    }

    fn from_err(err: &SimplecovError) -> Self {
        if !err.is_not_found() {
            tracing::warn!(error = %err, "tool call failed");
        }
        Self::error(err.to_string())
    }
}

/// Dispatch a tool by name with JSON arguments.
pub fn call(store: &CoverageStore, name: &str, args: Value) -> ToolOutput {
    tracing::debug!(tool = name, "tool call");
    // Tools without parameters may be called with no arguments at all.
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    match name {
        GET_SUMMARY => summary(store),
        LIST_FILES => match serde_json::from_value::<ListOptions>(args) {
            Ok(opts) => list_files(store, &opts),
            Err(e) => invalid_arguments(name, &e),
        },
        GET_FILE_COVERAGE => match serde_json::from_value::<FileParams>(args) {
            Ok(params) => file_coverage(store, &params.file_path),
            Err(e) => invalid_arguments(name, &e),
        },
        GET_UNCOVERED_LINES => match serde_json::from_value::<FileParams>(args) {
            Ok(params) => uncovered_lines(store, &params.file_path),
            Err(e) => invalid_arguments(name, &e),
        },
        _ => ToolOutput::error(format!(
            "Unknown tool: '{}'. Available: {}",
            name,
            TOOL_NAMES.join(", ")
        )),
    }
}

fn invalid_arguments(tool: &str, err: &serde_json::Error) -> ToolOutput {
    ToolOutput::error(format!("Invalid arguments for {tool}: {err}"))
}

pub fn summary(store: &CoverageStore) -> ToolOutput {
    render_json(&query::get_summary(store))
}

pub fn list_files(store: &CoverageStore, opts: &ListOptions) -> ToolOutput {
    let files = match query::list_files(store, opts) {
        Ok(files) => files,
        Err(e) => return ToolOutput::from_err(&e),
    };

    let rows: Vec<FileRow> = files.iter().map(FileRow::from).collect();
    match serde_json::to_string_pretty(&rows) {
        Ok(json) => {
            let mut out = String::new();
            writeln!(out, "{} files", files.len()).unwrap();
            out.push_str(&json);
            ToolOutput::success(out)
        }
        Err(e) => ToolOutput::from_err(&e.into()),
    }
}

pub fn file_coverage(store: &CoverageStore, file_path: &str) -> ToolOutput {
    match query::get_file_coverage(store, file_path) {
        Ok(detail) => render_json(&FileCoverageView::from(&detail)),
        Err(e) => ToolOutput::from_err(&e),
    }
}

pub fn uncovered_lines(store: &CoverageStore, file_path: &str) -> ToolOutput {
    match query::get_uncovered_lines(store, file_path) {
        Ok(result) => render_json(&UncoveredView {
            file_path: &result.file_path,
            line_coverage: format!("{}%", format_percent(result.line_coverage)),
            uncovered_line_numbers: &result.uncovered_line_numbers,
            uncovered_branches: &result.uncovered_branches,
        }),
        Err(e) => ToolOutput::from_err(&e),
    }
}

fn render_json<T: Serialize>(value: &T) -> ToolOutput {
    match serde_json::to_string_pretty(value) {
        Ok(json) => ToolOutput::success(json),
        Err(e) => ToolOutput::from_err(&e.into()),
    }
}

/// Shortest decimal form of an already rounded percentage: `66.67`, `50.5`, `100`.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{value}")
}

/// `"66.67% (2/3)"`
#[must_use]
pub fn format_ratio(percent: f64, covered: u64, total: u64) -> String {
    format!("{}% ({covered}/{total})", format_percent(percent))
}

fn line_ratio(stats: &FileStats) -> String {
    format_ratio(stats.line_coverage, stats.covered_lines, stats.total_lines)
}

fn branch_ratio(stats: &FileStats) -> Option<String> {
    stats
        .branch_coverage
        .map(|pct| format_ratio(pct, stats.covered_branches, stats.total_branches))
}

/// One row of the `list_files` listing.
#[derive(Serialize)]
struct FileRow<'a> {
    file: &'a str,
    line: String,
    branch: Option<String>,
    missed: u64,
}

impl<'a> From<&'a FileStats> for FileRow<'a> {
    fn from(stats: &'a FileStats) -> Self {
        Self {
            file: &stats.file_path,
            line: line_ratio(stats),
            branch: branch_ratio(stats),
            missed: stats.missed_lines,
        }
    }
}

/// `get_file_coverage` output. Only relevant lines are listed; the rest
/// carry no information and can run to thousands of entries.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileCoverageView<'a> {
    file_path: &'a str,
    line_coverage: String,
    branch_coverage: Option<String>,
    uncovered_line_numbers: &'a [usize],
    lines: Vec<&'a LineDetail>,
    branches: &'a [crate::model::BranchCondition],
}

impl<'a> From<&'a FileDetail> for FileCoverageView<'a> {
    fn from(detail: &'a FileDetail) -> Self {
        Self {
            file_path: &detail.stats.file_path,
            line_coverage: line_ratio(&detail.stats),
            branch_coverage: branch_ratio(&detail.stats),
            uncovered_line_numbers: &detail.uncovered_line_numbers,
            lines: detail
                .lines
                .iter()
                .filter(|l| l.hits.is_relevant())
                .collect(),
            branches: &detail.branches,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UncoveredView<'a> {
    file_path: &'a str,
    line_coverage: String,
    uncovered_line_numbers: &'a [usize],
    uncovered_branches: &'a [crate::model::UncoveredBranch],
}
