//! Tool registry
//!
//! The ToolRegistry owns the process-wide set of tool providers and:
//! - Connects each provider for a request and merges their tools into a [`Catalog`]
//! - Routes tool calls to the provider that offered the tool
//! - Tracks per-provider health for the status endpoint

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::catalog::Catalog;
use super::filter::UserScopedFilter;
use crate::config::ServerConfig;
use crate::connection::{
    ConnectionError, ConnectionState, ConnectionTarget, McpConnection, Sanitized, ToolInvocationError,
    ToolProvider, UserScoped,
};
use crate::logging::Logger;
use crate::secrets::SecretStore;
use crate::types::{RequestContext, ToolDescriptor};

/// Health of one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub state: ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Registry of configured tool providers
pub struct ToolRegistry {
    providers: Vec<Arc<dyn ToolProvider>>,
    last_errors: RwLock<HashMap<String, String>>,
    logger: Arc<dyn Logger>,
}

impl ToolRegistry {
    /// Create a registry over providers, in the order their tools are offered
    pub fn new(providers: Vec<Arc<dyn ToolProvider>>, logger: Arc<dyn Logger>) -> Self {
        Self {
            providers,
            last_errors: RwLock::new(HashMap::new()),
            logger,
        }
    }

    /// Build `UserScoped(Sanitized(McpConnection))` for every configured server
    pub fn from_config(
        servers: &[ServerConfig],
        secrets: Arc<dyn SecretStore>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let providers = servers
            .iter()
            .map(|server| {
                let target =
                    ConnectionTarget::from_config(&server.name, &server.transport, &secrets, &logger);
                let connection = McpConnection::new(&server.name, target, logger.clone())
                    .with_cache_tools_list(server.cache_tools_list)
                    .with_timeout(server.timeout());
                let provider: Arc<dyn ToolProvider> = Arc::new(UserScoped::new(
                    Sanitized::new(connection, logger.clone()),
                    UserScopedFilter::from(&server.visibility),
                ));
                logger.info(&format!(
                    "[ToolRegistry] Configured provider {} ({})",
                    server.name,
                    server.transport.kind()
                ));
                provider
            })
            .collect();

        Self::new(providers, logger)
    }

    pub fn providers(&self) -> &[Arc<dyn ToolProvider>] {
        &self.providers
    }

    fn provider(&self, name: &str) -> Option<&Arc<dyn ToolProvider>> {
        self.providers.iter().find(|p| p.identity() == name)
    }

    /// Merge the tools every provider offers to this request.
    ///
    /// Providers are contacted concurrently but contribute in configured
    /// order. A provider that cannot be connected after one retry
    /// contributes nothing; its error is recorded, not returned.
    pub async fn resolve(&self, ctx: &RequestContext) -> Catalog {
        let contributions = join_all(
            self.providers
                .iter()
                .map(|provider| self.contribution(provider.as_ref(), ctx)),
        )
        .await;

        let mut catalog = Catalog::new();
        for (provider, tools) in self.providers.iter().zip(contributions) {
            catalog.extend(provider.identity(), tools);
        }

        self.logger.info(&format!(
            "[ToolRegistry] [{}] user={} resolved {} tools from {} providers",
            ctx.short_id(),
            ctx.user_str(),
            catalog.len(),
            self.providers.len()
        ));
        catalog
    }

    async fn contribution(&self, provider: &dyn ToolProvider, ctx: &RequestContext) -> Vec<ToolDescriptor> {
        let name = provider.identity();

        if let Err(e) = self.ensure_connected(provider, ctx).await {
            self.logger.warn(&format!(
                "[ToolRegistry] [{}] {} contributes no tools: {}",
                ctx.short_id(),
                name,
                e
            ));
            self.last_errors.write().insert(name.to_string(), e.to_string());
            return Vec::new();
        }
        self.last_errors.write().remove(name);

        if provider.cache_tools_list() {
            provider.invalidate_cache();
        }

        let tools = provider.list_tools(ctx).await;
        self.logger.debug(&format!(
            "[ToolRegistry] [{}] {}: {} tools",
            ctx.short_id(),
            name,
            tools.len()
        ));
        tools
    }

    /// Connect with the provider's timeout, retrying once
    async fn ensure_connected(
        &self,
        provider: &dyn ToolProvider,
        ctx: &RequestContext,
    ) -> Result<(), ConnectionError> {
        match self.connect_once(provider, ctx).await {
            Ok(()) => Ok(()),
            Err(first) => {
                self.logger.warn(&format!(
                    "[ToolRegistry] [{}] connect to {} failed, retrying: {}",
                    ctx.short_id(),
                    provider.identity(),
                    first
                ));
                self.connect_once(provider, ctx).await
            }
        }
    }

    async fn connect_once(
        &self,
        provider: &dyn ToolProvider,
        ctx: &RequestContext,
    ) -> Result<(), ConnectionError> {
        let timeout = provider.connect_timeout();
        match tokio::time::timeout(timeout, provider.connect(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout {
                provider: provider.identity().to_string(),
                seconds: timeout.as_secs(),
            }),
        }
    }

    /// Invoke `name` on the provider called `provider`
    pub async fn invoke(
        &self,
        ctx: &RequestContext,
        provider: &str,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvocationError> {
        let target = self
            .provider(provider)
            .ok_or_else(|| ToolInvocationError::UnknownProvider(provider.to_string()))?;
        target.invoke_tool(ctx, name, arguments).await
    }

    /// Best-effort reset of one provider's connection state, or all of them
    pub fn reset_connection(&self, provider: Option<&str>) {
        for p in &self.providers {
            if provider.map_or(true, |name| p.identity() == name) {
                p.mark_disconnected();
            }
        }
    }

    /// Connect every provider once at startup and log what it offers
    pub async fn warm_up(&self) {
        let ctx = RequestContext::anonymous();
        for provider in &self.providers {
            let name = provider.identity();
            match self.ensure_connected(provider.as_ref(), &ctx).await {
                Ok(()) => {
                    let tools = provider.list_tools(&ctx).await;
                    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
                    self.logger.info(&format!(
                        "[ToolRegistry] {}: {} tools: {}",
                        name,
                        tools.len(),
                        names.join(", ")
                    ));
                }
                Err(e) => {
                    self.logger
                        .warn(&format!("[ToolRegistry] {}: warm-up failed: {}", name, e));
                    self.last_errors.write().insert(name.to_string(), e.to_string());
                }
            }
        }
    }

    /// Per-provider state and most recent connect error
    pub fn statuses(&self) -> Vec<ProviderStatus> {
        let errors = self.last_errors.read();
        self.providers
            .iter()
            .map(|p| ProviderStatus {
                name: p.identity().to_string(),
                state: p.state(),
                last_error: errors.get(p.identity()).cloned(),
            })
            .collect()
    }

    /// Close every provider's sessions
    pub async fn shutdown(&self) {
        join_all(self.providers.iter().map(|p| p.disconnect())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MockToolProvider;
    use crate::logging::{MemoryLogger, NoOpLogger};
    use crate::types::UserIdentity;
    use serde_json::json;
    use std::time::Duration;

    fn tools(names: &[&str]) -> Vec<ToolDescriptor> {
        names.iter().map(|n| ToolDescriptor::new(*n, "")).collect()
    }

    fn logger() -> Arc<dyn Logger> {
        Arc::new(NoOpLogger::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_provider_contributes_nothing() {
        let slow = Arc::new(
            MockToolProvider::new("slow")
                .with_tools(tools(&["never"]))
                .with_connect_delay(Duration::from_secs(600))
                .with_timeout(Duration::from_secs(60)),
        );
        let fast = Arc::new(MockToolProvider::new("fast").with_tools(tools(&["c", "a", "b"])));
        let registry = ToolRegistry::new(vec![slow.clone(), fast.clone()], logger());

        let catalog = registry.resolve(&RequestContext::anonymous()).await;

        assert_eq!(catalog.names(), vec!["c", "a", "b"]);
        assert!(catalog.entries().iter().all(|e| e.provider == "fast"));
        assert_eq!(slow.connect_calls(), 2);

        let statuses = registry.statuses();
        assert!(statuses[0].last_error.as_deref().unwrap().contains("timed out"));
        assert_eq!(statuses[1].last_error, None);
        assert_eq!(statuses[1].state, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_connect_retried_once() {
        let flaky = Arc::new(MockToolProvider::new("flaky").with_tools(tools(&["x"])).failing_connects(1));
        let dead = Arc::new(MockToolProvider::new("dead").with_tools(tools(&["y"])).failing_connects(5));
        let registry = ToolRegistry::new(vec![flaky.clone(), dead.clone()], logger());

        let catalog = registry.resolve(&RequestContext::anonymous()).await;

        assert_eq!(catalog.names(), vec!["x"]);
        assert_eq!(flaky.connect_calls(), 2);
        assert_eq!(dead.connect_calls(), 2);
        assert_eq!(registry.statuses()[1].state, ConnectionState::Failed);
    }

    #[tokio::test]
    async fn test_collisions_and_order_preserved() {
        let a = Arc::new(MockToolProvider::new("a").with_tools(tools(&["search", "one"])));
        let b = Arc::new(MockToolProvider::new("b").with_tools(tools(&["search", "two"])));
        let registry = ToolRegistry::new(vec![a, b], logger());

        let catalog = registry.resolve(&RequestContext::anonymous()).await;
        assert_eq!(catalog.names(), vec!["search", "one", "search", "two"]);
    }

    #[tokio::test]
    async fn test_cache_invalidated_per_request() {
        let cached = Arc::new(
            MockToolProvider::new("cached")
                .with_tools(tools(&["t"]))
                .with_cache_tools_list(true),
        );
        let plain = Arc::new(MockToolProvider::new("plain").with_tools(tools(&["u"])));
        let registry = ToolRegistry::new(vec![cached.clone(), plain.clone()], logger());

        registry.resolve(&RequestContext::anonymous()).await;
        registry.resolve(&RequestContext::anonymous()).await;

        assert_eq!(cached.invalidations(), 2);
        assert_eq!(plain.invalidations(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_keep_their_identity() {
        let provider = Arc::new(
            MockToolProvider::new("personal")
                .with_tools(tools(&["t"]))
                .with_connect_delay(Duration::from_millis(20)),
        );
        let registry = Arc::new(ToolRegistry::new(vec![provider.clone()], logger()));

        let alice = RequestContext::new(UserIdentity::new("alice"));
        let bob = RequestContext::new(UserIdentity::new("bob"));
        let (r1, r2) = tokio::join!(registry.resolve(&alice), registry.resolve(&bob));
        assert_eq!(r1.len(), 1);
        assert_eq!(r2.len(), 1);

        let mut seen = provider.connected_users();
        seen.sort();
        assert_eq!(
            seen,
            vec![Some("alice".to_string()), Some("bob".to_string())]
        );
    }

    #[tokio::test]
    async fn test_invoke_routes_and_reset() {
        let crm = Arc::new(MockToolProvider::new("crm").with_result("get_deal", Ok(json!({"id": 7}))));
        let registry = ToolRegistry::new(vec![crm.clone()], logger());
        let ctx = RequestContext::new(UserIdentity::new("U1"));

        let out = registry.invoke(&ctx, "crm", "get_deal", json!({"id": 7})).await.unwrap();
        assert_eq!(out, json!({"id": 7}));
        assert_eq!(crm.invocations()[0].user.as_deref(), Some("U1"));

        assert!(matches!(
            registry.invoke(&ctx, "nope", "x", json!({})).await,
            Err(ToolInvocationError::UnknownProvider(_))
        ));

        crm.connect(&ctx).await.unwrap();
        registry.reset_connection(Some("crm"));
        assert_eq!(crm.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_warm_up_logs_tools() {
        let memory = Arc::new(MemoryLogger::new());
        let good = Arc::new(MockToolProvider::new("slack").with_tools(tools(&["post_message", "list_channels"])));
        let bad = Arc::new(MockToolProvider::new("hubspot").failing_connects(2));
        let registry = ToolRegistry::new(vec![good, bad], memory.clone());

        registry.warm_up().await;

        assert!(memory.contains("info", "slack: 2 tools: post_message, list_channels"));
        assert!(memory.contains("warn", "hubspot: warm-up failed"));
        assert!(registry.statuses()[1].last_error.is_some());
    }
}
