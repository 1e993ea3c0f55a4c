//! LLM Provider implementations
//!
//! All real backends go through the `genai` crate, which handles streaming,
//! provider-specific protocols and tool calling. Backends not native to genai
//! (Azure, OpenRouter, Mistral, or any `api_base` override) are reached via
//! genai's `ServiceTargetResolver` using the OpenAI-compatible protocol.
//!
//! The `MockProvider` is kept for testing purposes.

mod error;
mod genai_adapter;
mod genai_provider;
mod mock;
mod traits;

pub use error::{ProviderError, ProviderResult};
pub use traits::{ModelChunk, Provider, ProviderModelConfig, StreamChatOptions, StreamResponse};

pub use genai_adapter::{is_genai_native, is_genai_supported, ProviderConfig};
pub use genai_provider::GenaiProvider;

pub use mock::{MockConfig, MockMode, MockProvider, MockTurn};

use crate::logging::Logger;
use crate::secrets::SecretStore;
use std::sync::Arc;

/// Create a provider for the given provider ID
///
/// `mock` yields an echoing [`MockProvider`]; every other id is handed to
/// [`GenaiProvider`], which treats unknown ids as OpenAI-compatible.
pub fn create_provider(
    provider_id: &str,
    secrets: Arc<dyn SecretStore>,
    logger: Arc<dyn Logger>,
) -> Arc<dyn Provider> {
    match provider_id.to_lowercase().as_str() {
        "mock" => Arc::new(MockProvider::echo(logger)),
        _ => {
            if !GenaiProvider::supports(provider_id) {
                logger.warn(&format!(
                    "[Providers] Unknown provider {}, assuming an OpenAI-compatible endpoint",
                    provider_id
                ));
            }
            Arc::new(GenaiProvider::new(provider_id, secrets, logger))
        }
    }
}

/// List all supported provider IDs
pub fn supported_providers() -> Vec<&'static str> {
    vec![
        "openai",
        "anthropic",
        "gemini",
        "ollama",
        "groq",
        "xai",
        "deepseek",
        "cohere",
        "fireworks",
        "together",
        "azure",
        "openrouter",
        "mistral",
        "mock",
    ]
}
