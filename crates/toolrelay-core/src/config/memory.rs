//! In-memory configuration provider

use async_trait::async_trait;
use parking_lot::RwLock;

use super::settings::{AgentSettings, ConfigFile, ServerConfig};
use super::traits::{ensure_unique_names, ConfigError, ConfigProvider, ConfigResult};

/// In-memory configuration provider for testing
#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    config: RwLock<ConfigFile>,
}

impl MemoryConfigProvider {
    /// Create a new provider with default agent settings and no servers
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider from a complete config
    pub fn with_config(config: ConfigFile) -> ConfigResult<Self> {
        ensure_unique_names(&config.servers)?;
        Ok(Self {
            config: RwLock::new(config),
        })
    }

    /// Replace the agent settings
    pub fn set_agent(&self, agent: AgentSettings) {
        self.config.write().agent = agent;
    }
}

#[async_trait]
impl ConfigProvider for MemoryConfigProvider {
    async fn agent_settings(&self) -> ConfigResult<AgentSettings> {
        Ok(self.config.read().agent.clone())
    }

    async fn servers(&self) -> ConfigResult<Vec<ServerConfig>> {
        Ok(self.config.read().servers.clone())
    }

    async fn add_server(&self, server: ServerConfig) -> ConfigResult<()> {
        let mut config = self.config.write();
        let name_lower = server.name.to_lowercase();

        if config.servers.iter().any(|s| s.name.to_lowercase() == name_lower) {
            return Err(ConfigError::ServerExists(server.name));
        }

        config.servers.push(server);
        Ok(())
    }

    async fn remove_server(&self, name: &str) -> ConfigResult<()> {
        let mut config = self.config.write();
        let name_lower = name.to_lowercase();

        let original_len = config.servers.len();
        config.servers.retain(|s| s.name.to_lowercase() != name_lower);

        if config.servers.len() == original_len {
            Err(ConfigError::ServerNotFound(name.to_string()))
        } else {
            Ok(())
        }
    }
}
