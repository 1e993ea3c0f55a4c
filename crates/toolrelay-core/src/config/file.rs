//! File-based configuration provider (YAML)
//!
//! Default location is `<config_dir>/toolrelay/config.yaml`
//! (`~/.config/toolrelay/config.yaml` on Linux).

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::settings::{AgentSettings, ConfigFile, ServerConfig};
use super::traits::{ensure_unique_names, ConfigError, ConfigProvider, ConfigResult};

/// File-based configuration provider
///
/// The file is read lazily and cached; writes go straight back to disk.
/// `AGENT_MODEL` and `AGENT_MAX_TURNS` are applied on read and never
/// persisted.
///
/// # Example
///
/// ```no_run
/// use toolrelay_core::config::FileConfigProvider;
///
/// let config = FileConfigProvider::user();
/// let explicit = FileConfigProvider::new("/etc/toolrelay/config.yaml");
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    /// Create a new file config provider for a specific path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// Create a user-level config provider
    pub fn user() -> Self {
        Self::new(Self::default_path())
    }

    /// `<config_dir>/toolrelay/config.yaml`
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
        config_dir.join("toolrelay").join("config.yaml")
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the config file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load config from file; a missing file yields the defaults
    fn load(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }

        let config: ConfigFile = serde_yaml::from_str(&content)?;
        ensure_unique_names(&config.servers)?;
        Ok(config)
    }

    /// Save config to file
    fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(config)?;
        fs::write(&self.path, content)?;

        *self.cache.write() = Some(config.clone());
        Ok(())
    }

    /// Get cached or load config (without environment overrides)
    pub fn get_config(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }

        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn agent_settings(&self) -> ConfigResult<AgentSettings> {
        let mut config = self.get_config()?;
        config.apply_env_overrides();
        Ok(config.agent)
    }

    async fn servers(&self) -> ConfigResult<Vec<ServerConfig>> {
        Ok(self.get_config()?.servers)
    }

    async fn add_server(&self, server: ServerConfig) -> ConfigResult<()> {
        let mut config = self.get_config()?;
        let name_lower = server.name.to_lowercase();

        if config.servers.iter().any(|s| s.name.to_lowercase() == name_lower) {
            return Err(ConfigError::ServerExists(server.name));
        }

        config.servers.push(server);
        self.save(&config)
    }

    async fn remove_server(&self, name: &str) -> ConfigResult<()> {
        let mut config = self.get_config()?;
        let name_lower = name.to_lowercase();

        let original_len = config.servers.len();
        config.servers.retain(|s| s.name.to_lowercase() != name_lower);

        if config.servers.len() == original_len {
            Err(ConfigError::ServerNotFound(name.to_string()))
        } else {
            self.save(&config)
        }
    }
}
