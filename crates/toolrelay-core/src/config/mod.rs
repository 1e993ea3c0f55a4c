//! Configuration
//!
//! - `MemoryConfigProvider`: In-memory for testing
//! - `FileConfigProvider`: YAML file

mod file;
mod memory;
mod settings;
mod traits;

pub use file::FileConfigProvider;
pub use memory::MemoryConfigProvider;
pub use settings::{
    AgentSettings, ConfigFile, RetryStaging, ServerConfig, TransportConfig, VisibilityConfig,
    DEFAULT_INSTRUCTIONS,
};
pub use traits::{ConfigError, ConfigProvider, ConfigResult};
