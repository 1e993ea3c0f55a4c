//! Logger that forwards to the `tracing` ecosystem

use super::traits::Logger;

/// Forwards every line to `tracing` so the host's subscriber decides
/// formatting and filtering. All events use the `toolrelay` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "toolrelay", "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "toolrelay", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "toolrelay", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "toolrelay", "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_logger_without_subscriber() {
        let logger = TracingLogger::new();
        logger.info("no subscriber installed");
        logger.warn("still fine");
    }
}
