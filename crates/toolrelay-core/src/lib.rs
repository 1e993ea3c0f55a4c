//! toolrelay core
//!
//! Runtime-agnostic tool-provider aggregation and streaming-event
//! normalization for a tool-using chat agent. The host (see the
//! `toolrelay-server` crate) only has to turn requests into
//! [`GenerateRequest`]s and write the resulting [`StreamEvent`]s out.
//!
//! ## Tool aggregation
//!
//! Every configured MCP server becomes a [`ToolProvider`]: a
//! [`McpConnection`] wrapped in schema repair ([`Sanitized`]) and per-user
//! visibility ([`UserScoped`]). The [`ToolRegistry`] merges what each
//! provider offers the calling user into a [`tools::Catalog`].
//!
//! ```rust,ignore
//! use toolrelay_core::{AgentService, GenerateRequest, RequestContext};
//!
//! let request = GenerateRequest::new("what's on my calendar?").with_user("U07G1UMQ64C");
//! let ctx = RequestContext::new(request.user());
//! let mut events = service.handle(&request, ctx)?;
//! while let Some(event) = events.next().await {
//!     out.write_all(event.to_line().as_bytes()).await?;
//! }
//! ```

pub mod agent;
pub mod config;
pub mod connection;
pub mod logging;
pub mod mcp;
pub mod providers;
pub mod schema;
pub mod secrets;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use types::{
    CancellationToken, ChatMessage, ContentPart, MessageContent, MessageRole, RequestContext,
    StreamEvent, ToolCall, ToolDescriptor, UserIdentity,
};

pub use agent::{
    AgentRunner, AgentService, EventNormalizer, GenerateRequest, RequestError, RetryOrchestrator,
    RetryPolicy, RunError, RunEvent, ToolLoopRunner, TurnFailure,
};

pub use config::{
    AgentSettings, ConfigError, ConfigFile, ConfigProvider, ConfigResult, FileConfigProvider,
    MemoryConfigProvider, RetryStaging, ServerConfig, TransportConfig,
};

pub use connection::{
    ConnectionError, ConnectionState, McpConnection, Sanitized, ToolInvocationError, ToolProvider,
    UserScoped,
};

pub use logging::{Logger, LoggerExt, NoOpLogger, TracingLogger};

pub use providers::{create_provider, GenaiProvider, MockProvider, Provider, ProviderError};

pub use secrets::{EnvSecretStore, MemorySecretStore, SecretStore, SecretStoreError};

pub use tools::{ProviderStatus, ToolRegistry, UserScopedFilter};

// MCP client using the official rmcp SDK
pub use mcp::{McpClient, McpError, McpResult};
