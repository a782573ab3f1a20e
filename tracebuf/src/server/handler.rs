//! MCP tool handler over [`ExecutionService`]
//!
//! Tool failures that are part of a tool's contract (probe listing errors,
//! rejected starts, unknown execution ids) come back as normal results.
//! Unknown tools and undecodable arguments are protocol errors and are
//! answered by the router.

use std::future::Future;
use anyhow::{Context, Result};
use log::{debug, info};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::handler::server::wrapper::Json;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{serve_server, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use tokio::io::{AsyncRead, AsyncWrite};
use tracebuf_common::{
    ExecProgramRequest, ExecProgramResponse, GetResultRequest, ListHelpersResponse,
    ListProbesRequest, ListProbesResponse,
};

use crate::service::ExecutionService;

pub const SERVER_NAME: &str = "tracebuf";

const INSTRUCTIONS: &str = "Linux kernel tracing with bpftrace. exec_program starts a program \
    in the background and returns an execution id; poll get_result with that id, advancing \
    offset by lines_returned, until status is no longer \"running\".";

#[derive(Clone)]
pub struct TracebufServer {
    service: ExecutionService,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl TracebufServer {
    #[must_use]
    pub fn new(service: ExecutionService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List available bpftrace probes with optional filtering")]
    pub async fn list_probes(
        &self,
        Parameters(request): Parameters<ListProbesRequest>,
    ) -> Json<ListProbesResponse> {
        debug!("list_probes filter={:?}", request.filter);
        Json(self.service.list_probes(request).await)
    }

    #[tool(description = "List available bpftrace helper functions")]
    pub fn list_helpers(&self) -> Json<ListHelpersResponse> {
        Json(self.service.list_helpers())
    }

    #[tool(description = "Execute a bpftrace program with buffered output")]
    pub async fn exec_program(
        &self,
        Parameters(request): Parameters<ExecProgramRequest>,
    ) -> Json<ExecProgramResponse> {
        Json(self.service.exec_program(request).await)
    }

    /// The not-found shape is not an object schema, so this one answers with
    /// plain JSON content instead of a structured result
    #[tool(description = "Get buffered output from a bpftrace execution")]
    pub async fn get_result(
        &self,
        Parameters(request): Parameters<GetResultRequest>,
    ) -> Result<CallToolResult, McpError> {
        let response = self.service.get_result(&request);
        Ok(CallToolResult::success(vec![Content::json(&response)?]))
    }
}

#[tool_handler]
impl ServerHandler for TracebufServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Run the MCP session on `reader`/`writer` until the client hangs up
///
/// # Errors
/// The client never completed the initialize handshake, or the session task
/// panicked.
pub async fn serve<R, W>(server: TracebufServer, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let running = serve_server(server, (reader, writer))
        .await
        .context("tool protocol handshake failed")?;
    info!("client initialized");

    let reason = running.waiting().await.context("tool server task failed")?;
    debug!("session ended: {reason:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::Value;

    fn server() -> TracebufServer {
        let config = Config {
            binary: "/nonexistent/bpftrace".into(),
            elevation: Vec::new(),
            ..Config::default()
        };
        TracebufServer::new(ExecutionService::from_config(&config))
    }

    fn tools() -> Value {
        serde_json::to_value(TracebufServer::tool_router().list_all()).unwrap()
    }

    fn tool<'a>(tools: &'a Value, name: &str) -> &'a Value {
        tools
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == name)
            .unwrap_or_else(|| panic!("no tool {name}"))
    }

    #[test]
    fn test_four_tools_are_routed() {
        let tools = tools();
        let mut names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec!["exec_program", "get_result", "list_helpers", "list_probes"]
        );
    }

    #[test]
    fn test_input_schemas_describe_arguments() {
        let tools = tools();

        let exec = &tool(&tools, "exec_program")["inputSchema"];
        assert_eq!(exec["required"], serde_json::json!(["program"]));
        assert_eq!(exec["properties"]["timeout"]["type"], "integer");

        let get = &tool(&tools, "get_result")["inputSchema"];
        assert_eq!(get["required"], serde_json::json!(["execution_id"]));
        assert_eq!(
            get["properties"]["limit"]["description"],
            "Maximum lines to return (default: 1000)"
        );

        let probes = &tool(&tools, "list_probes")["inputSchema"];
        assert!(probes["properties"]["filter"].is_object());
    }

    #[test]
    fn test_server_info_announces_tools() {
        let info = server().get_info();
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("get_result"));
    }

    #[test]
    fn test_list_helpers_tool() {
        let Json(response) = server().list_helpers();
        assert_eq!(response.count, 42);
    }

    #[tokio::test]
    async fn test_get_result_unknown_id() {
        let request = GetResultRequest {
            execution_id: "exec_00000000".to_string(),
            offset: 0,
            limit: 10,
        };
        let result = server().get_result(Parameters(request)).await.unwrap();
        let result = serde_json::to_value(result).unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["error"], "Execution ID not found");
        assert_eq!(body["execution_id"], "exec_00000000");
    }

    #[tokio::test]
    async fn test_exec_with_missing_binary_is_rejected() {
        let request = ExecProgramRequest {
            program: "BEGIN { exit(); }".to_string(),
            timeout: 5,
        };
        let Json(response) = server().exec_program(Parameters(request)).await;
        assert_eq!(response.status, tracebuf_common::StartStatus::Error);
        assert!(response.execution_id.is_none());
    }
}
