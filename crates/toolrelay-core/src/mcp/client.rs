//! MCP Client using the official rmcp SDK
//!
//! Connects to tool provider servers over streamable HTTP, a child process
//! (stdio) or a Unix socket.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
        Tool,
    },
    service::{RunningService, ServiceError},
    RoleClient, ServiceExt,
};
use serde_json::Value;
use thiserror::Error;

#[cfg(unix)]
use tokio::net::UnixStream;

use crate::logging::{truncate_for_log, Logger};

/// MCP client errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl McpError {
    /// Whether the session behind this error is gone
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, McpError::ConnectionLost(_))
    }

    fn from_service(error: ServiceError, wrap: fn(String) -> McpError) -> McpError {
        match error {
            ServiceError::TransportClosed => McpError::ConnectionLost("transport closed".into()),
            ServiceError::TransportSend(e) => McpError::ConnectionLost(e.to_string()),
            other => wrap(other.to_string()),
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolrelay".to_string(),
            title: Some("toolrelay".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

/// One live MCP session
pub struct McpClient {
    /// The underlying rmcp running service
    client: RunningService<RoleClient, ClientInfo>,
    /// Endpoint description used in log lines
    endpoint: String,
    logger: Arc<dyn Logger>,
}

impl McpClient {
    /// Connect over streamable HTTP, optionally with a bearer token
    pub async fn connect_http(
        url: &str,
        bearer_token: Option<&str>,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
        use rmcp::transport::StreamableHttpClientTransport;

        logger.info(&format!("[McpClient] Connecting to HTTP: {}", url));

        let mut config = StreamableHttpClientTransportConfig::with_uri(url.to_string());
        if let Some(token) = bearer_token.filter(|t| !t.is_empty()) {
            config = config.auth_header(token.to_string());
        }
        let transport = StreamableHttpClientTransport::with_client(reqwest::Client::new(), config);

        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        logger.info("[McpClient] Connected and initialized successfully");

        Ok(Self {
            client,
            endpoint: url.to_string(),
            logger,
        })
    }

    /// Launch `command` and speak MCP over its stdin/stdout
    pub async fn connect_stdio(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        use rmcp::transport::TokioChildProcess;

        logger.info(&format!(
            "[McpClient] Spawning stdio server: {} {}",
            command,
            args.join(" ")
        ));

        let mut cmd = tokio::process::Command::new(command);
        cmd.args(args).envs(env);
        let transport =
            TokioChildProcess::new(cmd).map_err(|e| McpError::ConnectionFailed(e.to_string()))?;

        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        logger.info("[McpClient] Connected and initialized successfully");

        Ok(Self {
            client,
            endpoint: format!("stdio:{}", command),
            logger,
        })
    }

    /// Connect to an MCP server over a Unix socket
    #[cfg(unix)]
    pub async fn connect_unix<P: AsRef<Path>>(
        socket_path: P,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        let path = socket_path.as_ref();
        logger.info(&format!("[McpClient] Connecting to Unix socket: {:?}", path));

        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| McpError::ConnectionFailed(e.to_string()))?;

        let client = client_info()
            .serve(stream)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        logger.info("[McpClient] Connected and initialized successfully");

        Ok(Self {
            client,
            endpoint: format!("unix:{}", path.display()),
            logger,
        })
    }

    #[cfg(not(unix))]
    pub async fn connect_unix<P: AsRef<Path>>(
        socket_path: P,
        _logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        Err(McpError::ConnectionFailed(format!(
            "Unix sockets are not supported on this platform: {:?}",
            socket_path.as_ref()
        )))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// List all available tools
    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let result = self
            .client
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::from_service(e, McpError::Protocol))?;

        self.logger.debug(&format!(
            "[McpClient] {} listed {} tools",
            self.endpoint,
            result.tools.len()
        ));

        Ok(result.tools)
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<CallToolResult> {
        self.logger.info(&format!(
            "[McpClient] Calling tool: {} args={}",
            name,
            truncate_for_log(&arguments.to_string())
        ));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        self.client
            .call_tool(params)
            .await
            .map_err(|e| McpError::from_service(e, McpError::ToolCallFailed))
    }

    /// Close the connection
    pub async fn close(self) -> McpResult<()> {
        self.logger
            .info(&format!("[McpClient] Closing connection to {}", self.endpoint));
        self.client
            .cancel()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;
        Ok(())
    }
}

/// Extract the payload of a tool result.
///
/// Structured content wins; otherwise the text parts are joined with
/// newlines. An `is_error` result yields `Err` with that text.
pub fn tool_output(result: &CallToolResult) -> Result<Value, String> {
    let text = result
        .content
        .iter()
        .filter_map(|content| content.as_text().map(|t| t.text.clone()))
        .collect::<Vec<_>>()
        .join("\n");

    if result.is_error.unwrap_or(false) {
        return Err(if text.is_empty() {
            "tool reported an error".to_string()
        } else {
            text
        });
    }

    if let Some(structured) = &result.structured_content {
        return Ok(structured.clone());
    }

    Ok(Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::Content;
    use serde_json::json;

    #[test]
    fn test_tool_output_joins_text() {
        let result = CallToolResult::success(vec![Content::text("line 1"), Content::text("line 2")]);
        assert_eq!(tool_output(&result), Ok(json!("line 1\nline 2")));
    }

    #[test]
    fn test_tool_output_prefers_structured() {
        let mut result = CallToolResult::success(vec![Content::text("ignored")]);
        result.structured_content = Some(json!({"deals": 3}));
        assert_eq!(tool_output(&result), Ok(json!({"deals": 3})));
    }

    #[test]
    fn test_tool_output_error() {
        let result = CallToolResult::error(vec![Content::text("channel not found")]);
        assert_eq!(tool_output(&result), Err("channel not found".to_string()));
    }

    #[test]
    fn test_connection_lost_classification() {
        let lost = McpError::from_service(ServiceError::TransportClosed, McpError::ToolCallFailed);
        assert!(lost.is_connection_lost());
        assert!(!McpError::ToolCallFailed("nope".into()).is_connection_lost());
    }

    #[tokio::test]
    async fn test_connect_unix_missing_socket() {
        let logger: Arc<dyn Logger> = Arc::new(crate::logging::NoOpLogger::new());
        let result = McpClient::connect_unix("/nonexistent/toolrelay-test.sock", logger).await;
        assert!(matches!(result, Err(McpError::ConnectionFailed(_))));
    }
}
