//! Model backend over the `genai` crate
//!
//! Native genai adapters cover OpenAI, Anthropic, Gemini, Ollama and friends;
//! Azure, OpenRouter and Mistral are reached through the OpenAI adapter with
//! a rewritten endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use once_cell::sync::Lazy;

use genai::chat::{ChatRequest, ChatStreamEvent};

use crate::logging::Logger;
use crate::secrets::SecretStore;
use crate::types::{CancellationToken, ChatMessage};

use super::error::{ProviderError, ProviderResult};
use super::genai_adapter::{
    create_client, from_genai_event, is_genai_supported, to_genai_messages, to_genai_options,
    to_genai_tools, ProviderConfig,
};
use super::traits::{Provider, ProviderModelConfig, StreamChatOptions, StreamResponse};

const FALLBACK_API_BASE: &str = "https://api.openai.com/v1/";

static API_BASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("openai", FALLBACK_API_BASE),
        ("anthropic", "https://api.anthropic.com/"),
        ("gemini", "https://generativelanguage.googleapis.com/"),
        ("ollama", "http://localhost:11434/"),
        ("groq", "https://api.groq.com/openai/v1/"),
        ("xai", "https://api.x.ai/v1/"),
        ("deepseek", "https://api.deepseek.com/"),
        ("openrouter", "https://openrouter.ai/api/v1/"),
        ("mistral", "https://api.mistral.ai/v1/"),
    ])
});

/// Streams chat turns from any backend genai can reach
pub struct GenaiProvider {
    provider_id: String,
    secrets: Arc<dyn SecretStore>,
    logger: Arc<dyn Logger>,
}

impl GenaiProvider {
    pub fn new(
        provider_id: impl Into<String>,
        secrets: Arc<dyn SecretStore>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            secrets,
            logger,
        }
    }

    /// Whether `provider_id` has a native or OpenAI-compatible route
    pub fn supports(provider_id: &str) -> bool {
        is_genai_supported(provider_id)
    }

    /// Drop a `backend/` prefix: `openai/gpt-4o` is sent as `gpt-4o`
    pub fn extract_model_name(model: &str) -> &str {
        model.split_once('/').map_or(model, |(_, name)| name)
    }
}

#[async_trait]
impl Provider for GenaiProvider {
    fn name(&self) -> &str {
        &self.provider_id
    }

    fn default_api_base(&self) -> &str {
        API_BASES
            .get(self.provider_id.as_str())
            .copied()
            .unwrap_or(FALLBACK_API_BASE)
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        model_config: ProviderModelConfig,
        options: StreamChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse> {
        let model_name = Self::extract_model_name(&model_config.model).to_string();
        self.logger.debug(&format!(
            "[GenaiProvider] stream_chat: provider={}, model={}, messages={}, tools={}",
            self.provider_id,
            model_name,
            messages.len(),
            options.tools.as_ref().map_or(0, Vec::len)
        ));

        let config = ProviderConfig::new(&self.provider_id, &model_config);
        let client = create_client(&config, Arc::clone(&self.secrets));

        let mut chat_req = ChatRequest::new(to_genai_messages(messages));
        if let Some(tools) = &options.tools {
            chat_req = chat_req.with_tools(to_genai_tools(tools));
        }
        let genai_options = to_genai_options(&options);

        let chat_stream = client
            .exec_chat_stream(&model_name, chat_req, Some(&genai_options))
            .await
            .map_err(|e| ProviderError::from_backend(&self.provider_id, e.to_string()))?;

        let (logger, provider_id) = (Arc::clone(&self.logger), self.provider_id.clone());

        let stream = chat_stream.stream.flat_map(move |result| {
            if cancel_token.is_cancelled() {
                logger.info("[GenaiProvider] Turn cancelled mid-stream");
                return stream::iter(vec![Err(ProviderError::Cancelled)]);
            }

            let chunks = match result {
                Ok(event) => {
                    if let ChatStreamEvent::End(_) = &event {
                        logger.debug("[GenaiProvider] Stream event: End");
                    }
                    from_genai_event(event)
                }
                Err(e) => {
                    logger.error(&format!("[GenaiProvider] {} stream failed: {}", provider_id, e));
                    vec![Err(ProviderError::from_backend(&provider_id, e.to_string()))]
                }
            };
            stream::iter(chunks)
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::secrets::MemorySecretStore;

    #[test]
    fn test_extract_model_name() {
        assert_eq!(GenaiProvider::extract_model_name("openai/gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(
            GenaiProvider::extract_model_name("openrouter/meta-llama/llama-3-70b"),
            "meta-llama/llama-3-70b"
        );
        assert_eq!(GenaiProvider::extract_model_name("gpt-4o"), "gpt-4o");
    }

    #[test]
    fn test_api_base() {
        let provider = GenaiProvider::new(
            "ollama",
            Arc::new(MemorySecretStore::new()),
            Arc::new(NoOpLogger::new()),
        );
        assert_eq!(provider.name(), "ollama");
        assert_eq!(
            provider.get_api_base(&ProviderModelConfig::new("llama3")),
            "http://localhost:11434/"
        );
        assert_eq!(
            provider.get_api_base(&ProviderModelConfig::new("llama3").with_api_base("http://gpu:11434/")),
            "http://gpu:11434/"
        );
    }
}
