//! MCP server exposing the coverage queries as tools over stdio.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt};

use crate::query::ListOptions;
use crate::store::CoverageStore;
use crate::tools::{self, FileParams, ToolOutput};

/// MCP server over a loaded coverage snapshot.
#[derive(Clone)]
pub struct CoverageServer {
    store: Arc<CoverageStore>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CoverageServer {
    pub fn new(store: Arc<CoverageStore>) -> Self {
        Self {
            store,
            tool_router: Self::tool_router(),
        }
    }

    /// Overall line/branch coverage and file count
    #[tool(
        description = "Get the SimpleCov coverage summary: overall line/branch coverage and the number of files"
    )]
    async fn get_summary(&self) -> Result<CallToolResult, McpError> {
        Ok(to_result(tools::summary(&self.store)))
    }

    /// Per-file coverage, filterable and sortable
    #[tool(
        description = "List covered files with their coverage rates. Supports sorting and filtering."
    )]
    async fn list_files(
        &self,
        Parameters(params): Parameters<ListOptions>,
    ) -> Result<CallToolResult, McpError> {
        Ok(to_result(tools::list_files(&self.store, &params)))
    }

    /// Per-line hits, uncovered lines and branch coverage for one file
    #[tool(
        description = "Get detailed coverage for one file: hits per line, uncovered lines and branch coverage"
    )]
    async fn get_file_coverage(
        &self,
        Parameters(params): Parameters<FileParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(to_result(tools::file_coverage(&self.store, &params.file_path)))
    }

    /// Uncovered line numbers and branches for one file
    #[tool(
        description = "List uncovered line numbers and untested branches of one file, as a guide for adding tests"
    )]
    async fn get_uncovered_lines(
        &self,
        Parameters(params): Parameters<FileParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(to_result(tools::uncovered_lines(&self.store, &params.file_path)))
    }
}

#[tool_handler]
impl ServerHandler for CoverageServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "SimpleCov coverage server: query merged line and branch coverage of a Ruby project"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn to_result(output: ToolOutput) -> CallToolResult {
    let content = vec![Content::text(output.text)];
    if output.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

/// Serve the store on stdio until the client disconnects.
pub async fn serve(store: CoverageStore) -> anyhow::Result<()> {
    let server = CoverageServer::new(Arc::new(store));
    tracing::info!("serving coverage tools on stdio");
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}
