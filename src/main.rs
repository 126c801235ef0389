use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use simplecovrs::cli::{cmd_call, cmd_file, cmd_files, cmd_summary, cmd_uncovered};
use simplecovrs::discover;
use simplecovrs::query::{ListOptions, SortKey, SortOrder};
use simplecovrs::store::CoverageStore;

/// simplecovrs — Query merged SimpleCov coverage, from the shell or as an MCP server.
#[derive(Parser)]
#[command(name = "simplecovrs", version, about)]
struct Cli {
    /// Coverage directory containing .resultset.json (default: search upward
    /// from the current directory for coverage/.resultset.json)
    #[arg(long, global = true, env = "SIMPLECOV_COVERAGE_PATH")]
    coverage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the coverage tools over MCP on stdio (default).
    Serve,

    /// Show overall line and branch coverage.
    Summary,

    /// List per-file coverage.
    Files {
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Path)]
        sort_by: SortKey,

        /// Sort order.
        #[arg(long, value_enum, default_value_t = SortOrder::Asc)]
        order: SortOrder,

        /// Only files with at least this line coverage (0-100).
        #[arg(long)]
        min_coverage: Option<f64>,

        /// Only files with at most this line coverage (0-100).
        #[arg(long)]
        max_coverage: Option<f64>,

        /// Only files whose path contains this substring.
        #[arg(long)]
        path_pattern: Option<String>,
    },

    /// Show line and branch detail for a source file.
    File {
        /// The source file path, exact or a trailing part of it.
        file_path: String,
    },

    /// Show uncovered lines and branches for a source file.
    Uncovered {
        /// The source file path, exact or a trailing part of it.
        file_path: String,
    },

    /// Run an MCP tool by name with JSON arguments.
    Call {
        /// Tool name, e.g. list_files.
        tool: String,

        /// Tool arguments as a JSON object, e.g. '{"sort_by": "missed_lines"}'.
        args: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SIMPLECOVRS_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let coverage_dir = discover::discover_coverage_dir(cli.coverage_dir.as_deref())
        .context("Failed to locate coverage directory")?;
    tracing::info!(dir = %coverage_dir.display(), "coverage directory found");

    let store = CoverageStore::load(&coverage_dir).context("Failed to load coverage data")?;

    let output = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tokio::runtime::Runtime::new()?.block_on(simplecovrs::mcp::serve(store))?;
            return Ok(());
        }
        Commands::Summary => cmd_summary(&store)?,
        Commands::Files {
            sort_by,
            order,
            min_coverage,
            max_coverage,
            path_pattern,
        } => cmd_files(
            &store,
            &ListOptions {
                sort_by,
                order,
                min_coverage,
                max_coverage,
                path_pattern,
            },
        )?,
        Commands::File { file_path } => cmd_file(&store, &file_path)?,
        Commands::Uncovered { file_path } => cmd_uncovered(&store, &file_path)?,
        Commands::Call { tool, args } => cmd_call(&store, &tool, args.as_deref())?,
    };

    print!("{output}");
    Ok(())
}
