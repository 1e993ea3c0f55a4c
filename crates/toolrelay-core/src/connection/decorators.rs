//! Provider decorators
//!
//! Schema repair and per-user filtering are layered onto any
//! [`ToolProvider`] by wrapping it. Both forward every other capability
//! unchanged, so they compose in either order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::error::{ConnectionError, ToolInvocationError};
use super::traits::{ConnectionState, ToolProvider};
use crate::logging::Logger;
use crate::schema;
use crate::tools::UserScopedFilter;
use crate::types::{RequestContext, ToolDescriptor};

/// Repairs the parameter schema of every listed tool
pub struct Sanitized<P> {
    inner: P,
    logger: Arc<dyn Logger>,
}

impl<P: ToolProvider> Sanitized<P> {
    pub fn new(inner: P, logger: Arc<dyn Logger>) -> Self {
        Self { inner, logger }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

/// Narrows listed tools to what the request's user may see
pub struct UserScoped<P> {
    inner: P,
    filter: UserScopedFilter,
}

impl<P: ToolProvider> UserScoped<P> {
    pub fn new(inner: P, filter: UserScopedFilter) -> Self {
        Self { inner, filter }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: ToolProvider> ToolProvider for Sanitized<P> {
    fn identity(&self) -> &str {
        self.inner.identity()
    }

    fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    fn cache_tools_list(&self) -> bool {
        self.inner.cache_tools_list()
    }

    fn connect_timeout(&self) -> Duration {
        self.inner.connect_timeout()
    }

    async fn connect(&self, ctx: &RequestContext) -> Result<(), ConnectionError> {
        self.inner.connect(ctx).await
    }

    async fn list_tools(&self, ctx: &RequestContext) -> Vec<ToolDescriptor> {
        let mut tools = self.inner.list_tools(ctx).await;
        let limited = schema::repair_all(&mut tools);
        if !limited.is_empty() {
            self.logger.debug(&format!(
                "[Sanitizer] {}: schema depth limit reached for {}",
                self.inner.identity(),
                limited.join(", ")
            ));
        }
        tools
    }

    async fn invoke_tool(
        &self,
        ctx: &RequestContext,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvocationError> {
        self.inner.invoke_tool(ctx, name, arguments).await
    }

    fn invalidate_cache(&self) {
        self.inner.invalidate_cache()
    }

    async fn disconnect(&self) {
        self.inner.disconnect().await
    }

    fn mark_disconnected(&self) {
        self.inner.mark_disconnected()
    }
}

#[async_trait]
impl<P: ToolProvider> ToolProvider for UserScoped<P> {
    fn identity(&self) -> &str {
        self.inner.identity()
    }

    fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    fn cache_tools_list(&self) -> bool {
        self.inner.cache_tools_list()
    }

    fn connect_timeout(&self) -> Duration {
        self.inner.connect_timeout()
    }

    async fn connect(&self, ctx: &RequestContext) -> Result<(), ConnectionError> {
        self.inner.connect(ctx).await
    }

    async fn list_tools(&self, ctx: &RequestContext) -> Vec<ToolDescriptor> {
        let tools = self.inner.list_tools(ctx).await;
        self.filter.apply(tools, ctx.user.as_ref())
    }

    async fn invoke_tool(
        &self,
        ctx: &RequestContext,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvocationError> {
        self.inner.invoke_tool(ctx, name, arguments).await
    }

    fn invalidate_cache(&self) {
        self.inner.invalidate_cache()
    }

    async fn disconnect(&self) {
        self.inner.disconnect().await
    }

    fn mark_disconnected(&self) {
        self.inner.mark_disconnected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MockToolProvider;
    use crate::logging::NoOpLogger;
    use crate::types::UserIdentity;
    use serde_json::json;

    fn provider() -> MockToolProvider {
        MockToolProvider::new("crm").with_tools(vec![
            ToolDescriptor::new("wouter_deals", "Deals").with_schema(json!({
                "type": "object",
                "properties": {"ids": {"type": "array"}}
            })),
            ToolDescriptor::new("shared_search", "Search | wouter").with_schema(json!({})),
            ToolDescriptor::new("admin_export", "Export"),
        ])
    }

    fn filter() -> UserScopedFilter {
        UserScopedFilter::new().with_scope("U1", "wouter")
    }

    #[tokio::test]
    async fn test_compose_in_either_order() {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
        let ctx = RequestContext::new(UserIdentity::new("U1"));

        let a = UserScoped::new(Sanitized::new(provider(), logger.clone()), filter());
        let b = Sanitized::new(UserScoped::new(provider(), filter()), logger);
        a.connect(&ctx).await.unwrap();
        b.connect(&ctx).await.unwrap();

        let from_a = a.list_tools(&ctx).await;
        let from_b = b.list_tools(&ctx).await;
        assert_eq!(from_a, from_b);
        assert_eq!(from_a.len(), 2);
        assert_eq!(
            from_a[0].parameter_schema["properties"]["ids"]["items"],
            json!({"type": "string"})
        );
        assert_eq!(
            from_a[1].parameter_schema,
            json!({"type": "object", "properties": {}})
        );
    }

    #[tokio::test]
    async fn test_forwards_capabilities() {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
        let mock = provider()
            .with_result("admin_export", Ok(json!("done")))
            .with_cache_tools_list(true);
        let stack = UserScoped::new(Sanitized::new(mock, logger), filter());

        assert_eq!(stack.identity(), "crm");
        assert!(stack.cache_tools_list());

        let ctx = RequestContext::anonymous();
        stack.connect(&ctx).await.unwrap();
        assert_eq!(stack.state(), ConnectionState::Connected);

        let out = stack.invoke_tool(&ctx, "admin_export", json!({})).await.unwrap();
        assert_eq!(out, json!("done"));

        stack.invalidate_cache();
        assert_eq!(stack.inner().inner().invalidations(), 1);

        stack.mark_disconnected();
        assert_eq!(stack.state(), ConnectionState::Disconnected);
    }
}
