//! Core types shared across the crate
//!
//! Messages, tool descriptors, wire events and the request context.

mod cancellation;
mod context;
mod message;
mod stream;
mod tool;

pub use cancellation::{CancelOnDrop, CancellationToken};
pub use context::{RequestContext, UserIdentity};
pub use message::{ChatMessage, ContentPart, MessageContent, MessageRole};
pub use stream::StreamEvent;
pub use tool::{ToolCall, ToolDescriptor};
