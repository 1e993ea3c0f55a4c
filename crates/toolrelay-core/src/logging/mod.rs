//! Logging abstractions for runtime-agnostic logging

mod noop;
mod tracing_logger;
mod traits;

pub use noop::{MemoryLogger, NoOpLogger};
pub use tracing_logger::TracingLogger;
pub use traits::{truncate_for_log, Logger, LoggerExt, SharedLogger, MAX_LOGGED_PAYLOAD};
