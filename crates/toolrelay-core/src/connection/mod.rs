//! Tool provider connections
//!
//! A [`ToolProvider`] is one remote source of tools. `McpConnection` speaks
//! MCP; `Sanitized` and `UserScoped` layer schema repair and per-user
//! visibility on top of any provider:
//!
//! ```rust,ignore
//! let provider = UserScoped::new(
//!     Sanitized::new(McpConnection::new("crm", target, logger.clone()), logger),
//!     UserScopedFilter::from(&server.visibility),
//! );
//! ```

mod decorators;
mod error;
mod mcp_connection;
mod mock;
mod target;
mod traits;

pub use decorators::{Sanitized, UserScoped};
pub use error::{ConnectionError, ToolInvocationError};
pub use mcp_connection::McpConnection;
pub use mock::{MockInvocation, MockToolOutcome, MockToolProvider};
pub use target::{ConnectionTarget, Endpoint, USER_PLACEHOLDER};
pub use traits::{ConnectionState, ToolProvider};
