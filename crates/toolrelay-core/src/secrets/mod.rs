//! Secret lookup for model credentials and tool provider tokens

mod env_store;
mod memory_store;
mod traits;

pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use traits::{secret_or_empty, SecretStore, SecretStoreError, SecretStoreResult};
