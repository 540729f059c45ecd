//! MCP (Model Context Protocol) server implementation.
//!
//! This module provides an MCP server that exposes the loaded QIF data as tools and CSV resources
//! for AI agent integration. The server communicates via JSON-RPC over stdio.

mod mcp_utils;
mod resources;
mod tools;

use crate::args::ExportArgs;
use crate::{commands, Config};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{
    Implementation, ListResourcesResult, PaginatedRequestParam, ProtocolVersion,
    ReadResourceRequestParam, ReadResourceResult, ResourceContents, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::transport::stdio;
use rmcp::ErrorData as McpError;
use rmcp::{tool_handler, RoleServer, ServerHandler, ServiceExt};
use std::sync::Arc;
use tracing::{info, warn};

/// The qif-mcp MCP server.
///
/// Every tool works on the same `Config`, and so the same single-connection database.
#[derive(Debug, Clone)]
pub struct QifServer {
    config: Arc<Config>,
    tool_router: ToolRouter<QifServer>,
}

impl QifServer {
    /// Creates a new QifServer with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_handler]
impl ServerHandler for QifServer {
    /// Returns server information sent to the MCP client during initialization. The
    /// `instructions` describe the tables, views and tools to the agent.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "qif-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(include_str!("docs/INTRO.md").into()),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(resources::list()))
    }

    /// Renders the export behind `request.uri` from the current database contents.
    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        info!("MCP: read_resource {}", request.uri);
        let Some(export) = resources::find(&request.uri) else {
            return Err(McpError::resource_not_found(
                format!("Unknown resource: {}", request.uri),
                None,
            ));
        };
        let config = (*self.config).clone();
        match commands::export(config, ExportArgs::new(export)).await {
            Ok(out) => {
                let csv = out.structure().cloned().unwrap_or_default();
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(csv, request.uri)],
                })
            }
            Err(e) => {
                warn!("Resource read failed: {e:#}");
                Err(McpError::internal_error(format!("{e:#}"), None))
            }
        }
    }
}

/// Transport type for the MCP server.
#[derive(Debug, Default)]
pub(crate) enum Io {
    #[default]
    Stdio,
    /// Mock transport for testing - holds one end of a duplex channel.
    #[cfg(test)]
    Mock(tokio::io::DuplexStream),
}

/// Runs the MCP server with stdio transport or mock transport. This function starts the MCP server
/// and blocks until the client disconnects or an error occurs.
///
/// # Arguments
/// - `config`: The `Config` object, with the QIF file already loaded
/// - `io`: Whether we are using stdio as the transport or using mock io for testing
///
pub(crate) async fn run_server(config: Config, io: Io) -> crate::Result<()> {
    use crate::error::{ErrorType, IntoResult};
    let server = QifServer::new(config);
    info!("Starting MCP server...");

    let service = match io {
        Io::Stdio => server
            .serve(stdio())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))
            .pub_result(ErrorType::Service)?,
        #[cfg(test)]
        Io::Mock(stream) => server
            .serve(stream)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))
            .pub_result(ErrorType::Service)?,
    };

    info!("MCP server running, waiting for requests...");

    // Wait for the server to complete (client disconnects or error)
    service
        .waiting()
        .await
        .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))
        .pub_result(ErrorType::Service)?;

    info!("MCP server shut down");
    Ok(())
}
