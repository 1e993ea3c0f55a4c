//! Provider trait definition

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::error::ProviderResult;
use crate::types::{CancellationToken, ChatMessage, ToolCall, ToolDescriptor};

/// Which model to call, and with what credentials
#[derive(Debug, Clone)]
pub struct ProviderModelConfig {
    /// Model id, optionally prefixed with `backend/`
    pub model: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

impl ProviderModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            api_base: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }
}

/// Sampling options and the tools offered for one model turn
#[derive(Debug, Clone, Default)]
pub struct StreamChatOptions {
    /// Sampling temperature, `None` for the backend default
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Tools the model may call
    pub tools: Option<Vec<ToolDescriptor>>,
}

impl StreamChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Offer tools to the model; an empty list offers none
    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }
}

/// One item of a model's streamed reply
#[derive(Debug, Clone, PartialEq)]
pub enum ModelChunk {
    /// Text delta
    Text(String),
    /// A complete tool call requested by the model
    ToolCall(ToolCall),
}

impl ModelChunk {
    pub fn text(text: impl Into<String>) -> Self {
        ModelChunk::Text(text.into())
    }
}

/// Chunks of one model turn, in arrival order
pub type StreamResponse = Pin<Box<dyn Stream<Item = ProviderResult<ModelChunk>> + Send>>;

/// LLM backend that streams chat completions
#[async_trait]
pub trait Provider: Send + Sync {
    /// Backend id as configured (`openai`, `ollama`, `mock`, ...)
    fn name(&self) -> &str;

    /// Endpoint used when the model config carries no override
    fn default_api_base(&self) -> &str;

    /// Stream a chat completion
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        model: ProviderModelConfig,
        options: StreamChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse>;

    /// Override from the model config, else [`Provider::default_api_base`]
    fn get_api_base(&self, model: &ProviderModelConfig) -> String {
        model
            .api_base
            .clone()
            .unwrap_or_else(|| self.default_api_base().to_string())
    }
}
