//! Tool provider backed by an MCP server

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::error::{ConnectionError, ToolInvocationError};
use super::target::{ConnectionTarget, Endpoint};
use super::traits::{ConnectionState, ToolProvider};
use crate::logging::{truncate_for_log, Logger};
use crate::mcp::{tool_output, McpClient, McpError};
use crate::types::{RequestContext, ToolDescriptor};

/// One configured MCP server.
///
/// Sessions are keyed by resolved endpoint: two requests whose users map to
/// different URLs get different sessions and never overwrite each other.
/// The reported state is derived from those sessions: connected while any
/// endpoint has one, failed when none does and some endpoint's last attempt
/// failed.
pub struct McpConnection {
    name: String,
    target: ConnectionTarget,
    cache_tools_list: bool,
    timeout: Duration,
    sessions: Mutex<HashMap<String, Arc<McpClient>>>,
    /// Endpoint keys (or `user:<id>` when none resolves) whose last attempt failed
    failures: Mutex<HashSet<String>>,
    tool_cache: Mutex<HashMap<String, Vec<ToolDescriptor>>>,
    logger: Arc<dyn Logger>,
}

impl McpConnection {
    pub fn new(name: impl Into<String>, target: ConnectionTarget, logger: Arc<dyn Logger>) -> Self {
        Self {
            name: name.into(),
            target,
            cache_tools_list: false,
            timeout: Duration::from_secs(60),
            sessions: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashSet::new()),
            tool_cache: Mutex::new(HashMap::new()),
            logger,
        }
    }

    pub fn with_cache_tools_list(mut self, enabled: bool) -> Self {
        self.cache_tools_list = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, ctx: &RequestContext) -> Result<Endpoint, ConnectionError> {
        self.target.resolve(&self.name, ctx).inspect_err(|_| {
            self.failures.lock().insert(format!("user:{}", ctx.user_str()));
        })
    }

    async fn open(&self, endpoint: &Endpoint) -> Result<McpClient, McpError> {
        let logger = self.logger.clone();
        match endpoint {
            Endpoint::Http { url, bearer_token } => {
                McpClient::connect_http(url, bearer_token.as_deref(), logger).await
            }
            Endpoint::Stdio { command, args, env } => {
                McpClient::connect_stdio(command, args, env, logger).await
            }
            Endpoint::Unix { path } => McpClient::connect_unix(path, logger).await,
        }
    }

    /// Live session for this request, connecting if needed
    async fn session(&self, ctx: &RequestContext) -> Result<(String, Arc<McpClient>), ConnectionError> {
        let endpoint = self.endpoint(ctx)?;
        let key = endpoint.key();

        if let Some(client) = self.sessions.lock().get(&key).cloned() {
            return Ok((key, client));
        }

        let client = match self.open(&endpoint).await {
            Ok(client) => Arc::new(client),
            Err(e) => {
                self.failures.lock().insert(key);
                return Err(ConnectionError::transport(&self.name, e));
            }
        };

        // A concurrent request may have connected the same endpoint meanwhile
        let client = self
            .sessions
            .lock()
            .entry(key.clone())
            .or_insert(client)
            .clone();
        self.failures.lock().remove(&key);
        Ok((key, client))
    }

    /// Forget `client` if it is still the session stored under `key`
    fn drop_session(&self, key: &str, client: &Arc<McpClient>) {
        let mut sessions = self.sessions.lock();
        if sessions.get(key).is_some_and(|current| Arc::ptr_eq(current, client)) {
            sessions.remove(key);
            self.tool_cache.lock().remove(key);
        }
    }

    fn forget_all(&self) -> Vec<Arc<McpClient>> {
        self.tool_cache.lock().clear();
        self.failures.lock().clear();
        self.sessions.lock().drain().map(|(_, c)| c).collect()
    }
}

#[async_trait]
impl ToolProvider for McpConnection {
    fn identity(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ConnectionState {
        if !self.sessions.lock().is_empty() {
            ConnectionState::Connected
        } else if !self.failures.lock().is_empty() {
            ConnectionState::Failed
        } else {
            ConnectionState::Disconnected
        }
    }

    fn cache_tools_list(&self) -> bool {
        self.cache_tools_list
    }

    fn connect_timeout(&self) -> Duration {
        self.timeout
    }

    async fn connect(&self, ctx: &RequestContext) -> Result<(), ConnectionError> {
        self.session(ctx).await.map(|_| ())
    }

    async fn list_tools(&self, ctx: &RequestContext) -> Vec<ToolDescriptor> {
        // A cached session may have died since it was opened: reconnect once
        let mut reconnected = false;
        loop {
            let (key, client) = match self.session(ctx).await {
                Ok(session) => session,
                Err(e) => {
                    self.logger
                        .warn(&format!("[McpConnection] {}: cannot list tools: {}", self.name, e));
                    return Vec::new();
                }
            };

            if self.cache_tools_list {
                if let Some(tools) = self.tool_cache.lock().get(&key) {
                    return tools.clone();
                }
            }

            match client.list_tools().await {
                Ok(tools) => {
                    let tools: Vec<ToolDescriptor> = tools.iter().map(ToolDescriptor::from).collect();
                    if self.cache_tools_list {
                        self.tool_cache.lock().insert(key, tools.clone());
                    }
                    return tools;
                }
                Err(e) if e.is_connection_lost() && !reconnected => {
                    self.logger.info(&format!(
                        "[McpConnection] {}: session lost ({}), reconnecting",
                        self.name, e
                    ));
                    self.drop_session(&key, &client);
                    reconnected = true;
                }
                Err(e) => {
                    self.logger
                        .warn(&format!("[McpConnection] {}: list_tools failed: {}", self.name, e));
                    if e.is_connection_lost() {
                        self.drop_session(&key, &client);
                        self.failures.lock().insert(key);
                    }
                    return Vec::new();
                }
            }
        }
    }

    async fn invoke_tool(
        &self,
        ctx: &RequestContext,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvocationError> {
        let (key, client) =
            self.session(ctx)
                .await
                .map_err(|e| ToolInvocationError::ConnectionLost {
                    provider: self.name.clone(),
                    message: e.to_string(),
                })?;

        match client.call_tool(name, arguments).await {
            Ok(result) => {
                let output = tool_output(&result).map_err(|message| ToolInvocationError::Failed {
                    tool: name.to_string(),
                    message,
                });
                if let Ok(value) = &output {
                    self.logger.debug(&format!(
                        "[McpConnection] {} -> {}",
                        name,
                        truncate_for_log(&value.to_string())
                    ));
                }
                output
            }
            Err(e) if e.is_connection_lost() => {
                self.drop_session(&key, &client);
                Err(ToolInvocationError::ConnectionLost {
                    provider: self.name.clone(),
                    message: e.to_string(),
                })
            }
            Err(e) => Err(ToolInvocationError::Failed {
                tool: name.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn invalidate_cache(&self) {
        self.tool_cache.lock().clear();
    }

    async fn disconnect(&self) {
        for client in self.forget_all() {
            // Sessions still borrowed by an in-flight call close when that call drops them
            if let Ok(client) = Arc::try_unwrap(client) {
                if let Err(e) = client.close().await {
                    self.logger
                        .warn(&format!("[McpConnection] {}: close failed: {}", self.name, e));
                }
            }
        }
    }

    fn mark_disconnected(&self) {
        self.forget_all();
        self.logger
            .info(&format!("[McpConnection] {}: connection state reset", self.name));
    }
}
