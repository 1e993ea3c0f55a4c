//! Tool provider capability trait

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::error::{ConnectionError, ToolInvocationError};
use crate::types::{RequestContext, ToolDescriptor};

/// Connection state of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Failed,
}

/// A remote source of tools
///
/// Implementations:
/// - `McpConnection`: an MCP server over HTTP, stdio or a Unix socket
/// - `MockToolProvider`: scripted provider for tests
/// - `Sanitized` / `UserScoped`: decorators around any provider
///
/// Every call takes the request's [`RequestContext`]; providers that derive
/// a per-user endpoint read the identity from it at call time.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Stable provider name
    fn identity(&self) -> &str;

    /// Current connection state
    fn state(&self) -> ConnectionState;

    /// Whether listed tools may be served from a cache
    fn cache_tools_list(&self) -> bool {
        false
    }

    /// Budget for one connect attempt
    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    /// Establish (or reuse) a session for this request.
    ///
    /// Safe to call repeatedly; a live session for the same endpoint is reused.
    async fn connect(&self, ctx: &RequestContext) -> Result<(), ConnectionError>;

    /// List the tools visible to this request.
    ///
    /// Never fails: internal errors are logged and yield an empty list.
    async fn list_tools(&self, ctx: &RequestContext) -> Vec<ToolDescriptor>;

    /// Invoke a tool and return its payload
    async fn invoke_tool(
        &self,
        ctx: &RequestContext,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvocationError>;

    /// Forget any cached tool list
    fn invalidate_cache(&self) {}

    /// Close all sessions
    async fn disconnect(&self);

    /// Drop session state after the transport was found closed
    fn mark_disconnected(&self);
}
