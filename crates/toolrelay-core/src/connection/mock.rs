//! Scripted tool provider for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::error::{ConnectionError, ToolInvocationError};
use super::traits::{ConnectionState, ToolProvider};
use crate::types::{RequestContext, ToolDescriptor};

/// Scripted outcome of invoking a tool
#[derive(Debug, Clone)]
pub enum MockToolOutcome {
    Ok(Value),
    Fail(String),
    ConnectionLost,
}

/// A recorded call to `invoke_tool`
#[derive(Debug, Clone, PartialEq)]
pub struct MockInvocation {
    pub tool: String,
    pub arguments: Value,
    pub user: Option<String>,
}

/// Deterministic tool provider
///
/// ```rust,ignore
/// let provider = MockToolProvider::new("crm")
///     .with_tools(vec![ToolDescriptor::new("search", "Search deals")])
///     .with_result("search", Ok(json!(["deal-1"])))
///     .failing_connects(1);
/// ```
pub struct MockToolProvider {
    name: String,
    tools: Vec<ToolDescriptor>,
    outcomes: HashMap<String, MockToolOutcome>,
    cache_tools_list: bool,
    timeout: Duration,
    connect_delay: Option<Duration>,
    failing_connects: AtomicUsize,
    state: RwLock<ConnectionState>,
    connect_calls: AtomicUsize,
    list_calls: AtomicUsize,
    invalidations: AtomicUsize,
    connected_users: Mutex<Vec<Option<String>>>,
    invocations: Mutex<Vec<MockInvocation>>,
}

impl MockToolProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: Vec::new(),
            outcomes: HashMap::new(),
            cache_tools_list: false,
            timeout: Duration::from_secs(60),
            connect_delay: None,
            failing_connects: AtomicUsize::new(0),
            state: RwLock::new(ConnectionState::Disconnected),
            connect_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            invalidations: AtomicUsize::new(0),
            connected_users: Mutex::new(Vec::new()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = tools;
        self
    }

    /// Script the result of a tool; `Err` becomes a provider-reported failure
    pub fn with_result(mut self, tool: impl Into<String>, result: Result<Value, String>) -> Self {
        let outcome = match result {
            Ok(value) => MockToolOutcome::Ok(value),
            Err(message) => MockToolOutcome::Fail(message),
        };
        self.outcomes.insert(tool.into(), outcome);
        self
    }

    /// Invoking `tool` reports a lost connection
    pub fn losing_connection_on(mut self, tool: impl Into<String>) -> Self {
        self.outcomes.insert(tool.into(), MockToolOutcome::ConnectionLost);
        self
    }

    /// The next `count` connect attempts fail
    pub fn failing_connects(self, count: usize) -> Self {
        self.failing_connects.store(count, Ordering::SeqCst);
        self
    }

    /// Every connect attempt sleeps this long first
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_tools_list(mut self, enabled: bool) -> Self {
        self.cache_tools_list = enabled;
        self
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    /// Identity seen by each connect call, in order
    pub fn connected_users(&self) -> Vec<Option<String>> {
        self.connected_users.lock().clone()
    }

    pub fn invocations(&self) -> Vec<MockInvocation> {
        self.invocations.lock().clone()
    }
}

#[async_trait]
impl ToolProvider for MockToolProvider {
    fn identity(&self) -> &str {
        &self.name
    }

    fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn cache_tools_list(&self) -> bool {
        self.cache_tools_list
    }

    fn connect_timeout(&self) -> Duration {
        self.timeout
    }

    async fn connect(&self, ctx: &RequestContext) -> Result<(), ConnectionError> {
        // Read the identity before suspending
        let user = ctx.user.as_ref().map(|u| u.to_string());
        self.connect_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        self.connected_users.lock().push(user);

        let should_fail = self
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            *self.state.write() = ConnectionState::Failed;
            return Err(ConnectionError::transport(&self.name, "scripted connect failure"));
        }

        *self.state.write() = ConnectionState::Connected;
        Ok(())
    }

    async fn list_tools(&self, _ctx: &RequestContext) -> Vec<ToolDescriptor> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.state() != ConnectionState::Connected {
            return Vec::new();
        }
        self.tools.clone()
    }

    async fn invoke_tool(
        &self,
        ctx: &RequestContext,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvocationError> {
        self.invocations.lock().push(MockInvocation {
            tool: name.to_string(),
            arguments: arguments.clone(),
            user: ctx.user.as_ref().map(|u| u.to_string()),
        });

        match self.outcomes.get(name) {
            Some(MockToolOutcome::Ok(value)) => Ok(value.clone()),
            Some(MockToolOutcome::Fail(message)) => Err(ToolInvocationError::Failed {
                tool: name.to_string(),
                message: message.clone(),
            }),
            Some(MockToolOutcome::ConnectionLost) => {
                *self.state.write() = ConnectionState::Disconnected;
                Err(ToolInvocationError::ConnectionLost {
                    provider: self.name.clone(),
                    message: "transport closed".to_string(),
                })
            }
            None => Ok(Value::String(format!("{} ok", name))),
        }
    }

    fn invalidate_cache(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }

    async fn disconnect(&self) {
        *self.state.write() = ConnectionState::Disconnected;
    }

    fn mark_disconnected(&self) {
        *self.state.write() = ConnectionState::Disconnected;
    }
}
