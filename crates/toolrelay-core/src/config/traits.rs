//! Configuration provider trait

use async_trait::async_trait;

use super::settings::{AgentSettings, ServerConfig};

/// Configuration provider abstraction
///
/// Implementations:
/// - `MemoryConfigProvider`: In-memory for testing
/// - `FileConfigProvider`: YAML file (`~/.config/toolrelay/config.yaml` by default)
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Agent and model settings, with environment overrides applied
    async fn agent_settings(&self) -> ConfigResult<AgentSettings>;

    /// Configured tool provider servers, in declaration order
    async fn servers(&self) -> ConfigResult<Vec<ServerConfig>>;

    /// Append a server; names must be unique (case-insensitive)
    async fn add_server(&self, server: ServerConfig) -> ConfigResult<()>;

    /// Remove a server by name
    async fn remove_server(&self, name: &str) -> ConfigResult<()>;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("Server already exists: {0}")]
    ServerExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Reject a server list containing the same name twice
pub(crate) fn ensure_unique_names(servers: &[ServerConfig]) -> ConfigResult<()> {
    let mut seen = std::collections::HashSet::new();
    for server in servers {
        if !seen.insert(server.name.to_lowercase()) {
            return Err(ConfigError::ServerExists(server.name.clone()));
        }
    }
    Ok(())
}
