//! Logger trait definition

use std::sync::Arc;

/// Logger abstraction threaded through every component
///
/// Implementations:
/// - `NoOpLogger`: Silent logger for testing
/// - `MemoryLogger`: Records lines so tests can assert on them
/// - `TracingLogger`: Forwards to the `tracing` subscriber of the host process
pub trait Logger: Send + Sync {
    /// Log a debug message
    fn debug(&self, message: &str);

    /// Log an info message
    fn info(&self, message: &str);

    /// Log a warning message
    fn warn(&self, message: &str);

    /// Log an error message
    fn error(&self, message: &str);
}

/// Type alias for an Arc-wrapped logger
pub type SharedLogger = Arc<dyn Logger>;

/// Format-argument helpers available on every logger
pub trait LoggerExt: Logger {
    fn debug_fmt(&self, args: std::fmt::Arguments<'_>) {
        self.debug(&args.to_string());
    }

    fn info_fmt(&self, args: std::fmt::Arguments<'_>) {
        self.info(&args.to_string());
    }

    fn warn_fmt(&self, args: std::fmt::Arguments<'_>) {
        self.warn(&args.to_string());
    }

    fn error_fmt(&self, args: std::fmt::Arguments<'_>) {
        self.error(&args.to_string());
    }
}

impl<T: Logger + ?Sized> LoggerExt for T {}

/// Longest payload excerpt written to a log line
pub const MAX_LOGGED_PAYLOAD: usize = 300;

/// Shorten tool arguments and results before they are logged
pub fn truncate_for_log(text: &str) -> String {
    match text.char_indices().nth(MAX_LOGGED_PAYLOAD) {
        Some((cut, _)) => format!("{}...[truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

/// Convenience macros for logging
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $logger.error(&format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_for_log("abc"), "abc");
        let exact = "x".repeat(MAX_LOGGED_PAYLOAD);
        assert_eq!(truncate_for_log(&exact), exact);
    }

    #[test]
    fn test_truncate_long_text() {
        let long = "é".repeat(MAX_LOGGED_PAYLOAD + 5);
        let out = truncate_for_log(&long);
        assert!(out.ends_with("...[truncated]"));
        assert_eq!(
            out.trim_end_matches("...[truncated]").chars().count(),
            MAX_LOGGED_PAYLOAD
        );
    }
}
