//! Loggers for tests: silent and recording

use parking_lot::Mutex;

use super::traits::Logger;

/// A logger that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl NoOpLogger {
    /// Create a new no-op logger
    pub fn new() -> Self {
        Self
    }
}

impl Logger for NoOpLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// A logger that keeps every line in memory as `LEVEL message`
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded lines
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Whether any line at `level` contains `needle`
    pub fn contains(&self, level: &str, needle: &str) -> bool {
        let prefix = format!("{} ", level.to_uppercase());
        self.lines
            .lock()
            .iter()
            .any(|line| line.starts_with(&prefix) && line.contains(needle))
    }

    fn push(&self, level: &str, message: &str) {
        self.lines.lock().push(format!("{} {}", level, message));
    }
}

impl Logger for MemoryLogger {
    fn debug(&self, message: &str) {
        self.push("DEBUG", message);
    }

    fn info(&self, message: &str) {
        self.push("INFO", message);
    }

    fn warn(&self, message: &str) {
        self.push("WARN", message);
    }

    fn error(&self, message: &str) {
        self.push("ERROR", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_logger() {
        let logger = NoOpLogger::new();
        logger.debug("debug message");
        logger.error("error message");
    }

    #[test]
    fn test_memory_logger_records_levels() {
        let logger = MemoryLogger::new();
        logger.info("[Registry] connected");
        logger.warn("[Secrets] SLACK_BOT_TOKEN missing");

        assert_eq!(logger.lines().len(), 2);
        assert!(logger.contains("warn", "SLACK_BOT_TOKEN"));
        assert!(!logger.contains("error", "SLACK_BOT_TOKEN"));
    }
}
