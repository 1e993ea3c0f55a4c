//! Agent turn pipeline
//!
//! ```text
//! GenerateRequest ─► AgentService::handle
//!                      ├─ assemble_messages (system instruction first)
//!                      ├─ ToolRegistry::resolve(ctx) ─► Catalog
//!                      └─ RetryOrchestrator::run
//!                           └─ AgentRunner::run_streamed ─► RunEvent*
//!                                └─ EventNormalizer ─► StreamEvent*
//! ```

mod error;
mod events;
mod normalizer;
mod request;
mod retry;
mod runner;
mod service;

pub use error::{extract_tool_name, RunError, RunResult, TurnFailure};
pub use events::{RawResponse, RunEvent, RunItem};
pub use normalizer::EventNormalizer;
pub use request::{assemble_messages, GenerateRequest, RequestError};
pub use retry::{EventStream, RetryOrchestrator, RetryPolicy};
pub use runner::{AgentRunner, RunStream, ToolLoopRunner, TurnInput};
pub use service::AgentService;
