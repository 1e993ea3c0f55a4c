//! Tool aggregation
//!
//! ```text
//! request ──► ToolRegistry::resolve(ctx)
//!               │  per provider, in configured order:
//!               │    connect (timeout, one retry) ─► invalidate cache ─► list_tools
//!               │      └─ UserScoped(Sanitized(McpConnection))
//!               ▼
//!             Catalog (ordered, cross-provider collisions kept)
//! ```

mod catalog;
mod filter;
mod registry;

pub use catalog::{Catalog, CatalogEntry};
pub use filter::UserScopedFilter;
pub use registry::{ProviderStatus, ToolRegistry};
