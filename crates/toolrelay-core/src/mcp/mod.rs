//! MCP (Model Context Protocol) client module
//!
//! Uses the official rmcp SDK to talk to tool provider servers.
//! Supports streamable HTTP, child-process stdio and Unix socket transports.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolrelay_core::mcp::{McpClient, tool_output};
//!
//! let client = McpClient::connect_http("https://tools.example.com/mcp", None, logger).await?;
//! let tools = client.list_tools().await?;
//! let result = client.call_tool("search", json!({"q": "renewals"})).await?;
//! let payload = tool_output(&result)?;
//! ```

mod client;

pub use client::{tool_output, McpClient, McpError, McpResult};

// Re-export rmcp types that consumers might need
pub use rmcp::model::{CallToolResult as McpToolResult, Tool as McpTool};
