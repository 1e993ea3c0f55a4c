//! Core traits and types for secret lookup

use std::sync::Arc;

use thiserror::Error;

use crate::logging::Logger;

/// Errors that can occur during secret lookups
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Other(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Source of credentials for the model backend and tool providers
///
/// Implementations:
/// - Environment variables (`EnvSecretStore`)
/// - In-memory for testing (`MemorySecretStore`)
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Retrieve a secret by key
    ///
    /// The key can be a backend id (e.g. "openai"), which implementations
    /// may map to a conventional variable, or a direct key such as
    /// "SLACK_BOT_TOKEN".
    fn get(&self, key: &str) -> Option<String>;

    /// Check if a secret exists
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Retrieve a secret or fail with `NotFound`
    fn require(&self, key: &str) -> SecretStoreResult<String> {
        self.get(key)
            .ok_or_else(|| SecretStoreError::NotFound(key.to_string()))
    }
}

/// Look up `key`, logging a warning and yielding an empty string when it is
/// missing. A missing credential never aborts startup; the affected provider
/// fails later at connect time instead.
pub fn secret_or_empty(
    store: &Arc<dyn SecretStore>,
    key: &str,
    purpose: &str,
    logger: &Arc<dyn Logger>,
) -> String {
    match store.require(key) {
        Ok(value) => value,
        Err(e) => {
            logger.warn(&format!(
                "[Secrets] {} for {} (store: {}), using empty value",
                e,
                purpose,
                store.name()
            ));
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLogger;
    use crate::secrets::MemorySecretStore;

    #[test]
    fn test_secret_or_empty_warns_on_missing() {
        let memory = Arc::new(MemoryLogger::new());
        let logger: Arc<dyn Logger> = memory.clone();
        let store: Arc<dyn SecretStore> = Arc::new(
            MemorySecretStore::new().with("SLACK_BOT_TOKEN", "xoxb-1"),
        );

        assert_eq!(secret_or_empty(&store, "SLACK_BOT_TOKEN", "slack", &logger), "xoxb-1");
        assert!(memory.lines().is_empty());

        assert_eq!(secret_or_empty(&store, "SLACK_TEAM_ID", "slack", &logger), "");
        assert!(memory.contains("warn", "SLACK_TEAM_ID"));
    }

    #[test]
    fn test_require() {
        let store = MemorySecretStore::new().with("a", "1");
        assert_eq!(store.require("a").unwrap(), "1");
        assert!(matches!(store.require("b"), Err(SecretStoreError::NotFound(k)) if k == "b"));
    }
}
