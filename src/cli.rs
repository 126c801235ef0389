//! Command handler functions for the one-shot CLI commands.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout. The text is the same the MCP tools
//! return; an error-flagged tool result becomes an `Err`.

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::query::ListOptions;
use crate::store::CoverageStore;
use crate::tools::{self, ToolOutput};

fn into_result(output: ToolOutput) -> Result<String> {
    if output.is_error {
        bail!(output.text);
    }
    let mut text = output.text;
    text.push('\n');
    Ok(text)
}

pub fn cmd_summary(store: &CoverageStore) -> Result<String> {
    into_result(tools::summary(store))
}

pub fn cmd_files(store: &CoverageStore, opts: &ListOptions) -> Result<String> {
    into_result(tools::list_files(store, opts))
}

pub fn cmd_file(store: &CoverageStore, file_path: &str) -> Result<String> {
    into_result(tools::file_coverage(store, file_path))
}

pub fn cmd_uncovered(store: &CoverageStore, file_path: &str) -> Result<String> {
    into_result(tools::uncovered_lines(store, file_path))
}

/// Run a tool by name with raw JSON arguments, exactly as an MCP client
/// would send them.
pub fn cmd_call(store: &CoverageStore, tool: &str, args: Option<&str>) -> Result<String> {
    let args = match args {
        Some(raw) => serde_json::from_str(raw)
            .with_context(|| format!("Invalid JSON arguments for {tool}"))?,
        None => Value::Null,
    };
    into_result(tools::call(store, tool, args))
}
