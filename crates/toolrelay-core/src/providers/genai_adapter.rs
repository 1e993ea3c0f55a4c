//! Adapter between toolrelay types and genai types
//!
//! Auth flows through the configured [`SecretStore`], not genai's default
//! env var lookup, so the model key is resolved the same way as every other
//! secret.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use genai::chat::{
    Binary, ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatRole as GenaiRole,
    ChatStreamEvent, ContentPart as GenaiPart, MessageContent as GenaiContent, Tool as GenaiTool,
    ToolCall as GenaiToolCall, ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};
use serde_json::{json, Value};

use crate::secrets::SecretStore;
use crate::types::{ChatMessage, ContentPart, MessageContent, MessageRole, ToolCall, ToolDescriptor};

use super::error::ProviderResult;
use super::traits::{ModelChunk, ProviderModelConfig, StreamChatOptions};

// ============================================================================
// Message Conversion: toolrelay -> genai
// ============================================================================

pub fn to_genai_role(role: MessageRole) -> GenaiRole {
    match role {
        MessageRole::System => GenaiRole::System,
        MessageRole::User => GenaiRole::User,
        MessageRole::Assistant => GenaiRole::Assistant,
        MessageRole::Tool => GenaiRole::Tool,
    }
}

/// Convert a conversation to genai messages.
///
/// An assistant turn with tool calls becomes a text message (when it has
/// text) followed by a tool-call message; a tool turn becomes a tool
/// response bound to its call id. Images in user turns are sent as binary
/// parts; other roles carry text only.
pub fn to_genai_messages(messages: Vec<ChatMessage>) -> Vec<GenaiMessage> {
    let mut out = Vec::with_capacity(messages.len());

    for msg in messages {
        let text = msg.content.to_plain_text();
        match msg.role {
            MessageRole::System => out.push(GenaiMessage::system(text)),
            MessageRole::User => out.push(GenaiMessage::user(to_genai_content(&msg.content))),
            MessageRole::Assistant => {
                if !text.is_empty() || msg.tool_calls.is_empty() {
                    out.push(GenaiMessage::assistant(text));
                }
                let calls: Vec<GenaiToolCall> =
                    msg.tool_calls.iter().filter_map(to_genai_tool_call).collect();
                if !calls.is_empty() {
                    out.push(GenaiMessage::from(calls));
                }
            }
            MessageRole::Tool => {
                let call_id = msg.tool_call_id.unwrap_or_default();
                out.push(GenaiMessage::from(GenaiToolResponse::new(call_id, text)));
            }
        }
    }

    out
}

/// Text stays text; each image becomes its own binary part
pub fn to_genai_content(content: &MessageContent) -> GenaiContent {
    match content {
        MessageContent::Text(text) => GenaiContent::from(text.as_str()),
        MessageContent::Parts(parts) => GenaiContent::from_parts(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => GenaiPart::Text(text.clone()),
                    ContentPart::Image { url } => GenaiPart::Binary(image_binary(url)),
                })
                .collect::<Vec<_>>(),
        ),
    }
}

/// `data:` URLs are sent inline as base64; anything else by reference
fn image_binary(url: &str) -> Binary {
    if let Some((header, payload)) = url.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        if let Some(content_type) = header.strip_suffix(";base64") {
            return Binary::from_base64(content_type, payload, None);
        }
    }
    Binary::from_url(image_content_type(url), url, None)
}

fn image_content_type(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Rebuild a genai tool call from one the model made earlier
pub fn to_genai_tool_call(call: &ToolCall) -> Option<GenaiToolCall> {
    serde_json::from_value(json!({
        "call_id": call.id,
        "fn_name": call.name,
        "fn_arguments": call.input,
    }))
    .ok()
}

// ============================================================================
// Tool Conversion: toolrelay -> genai
// ============================================================================

pub fn to_genai_tool(tool: &ToolDescriptor) -> GenaiTool {
    GenaiTool::new(&tool.name)
        .with_description(&tool.description)
        .with_schema(tool.parameter_schema.clone())
}

pub fn to_genai_tools(tools: &[ToolDescriptor]) -> Vec<GenaiTool> {
    tools.iter().map(to_genai_tool).collect()
}

// ============================================================================
// Options Conversion: toolrelay -> genai
// ============================================================================

pub fn to_genai_options(options: &StreamChatOptions) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();

    if let Some(temp) = options.temperature {
        genai_opts = genai_opts.with_temperature(temp as f64);
    }

    if let Some(max_tokens) = options.max_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }

    // Tool calls are only reported once the stream ends
    genai_opts.with_capture_tool_calls(true)
}

// ============================================================================
// Response Conversion: genai -> toolrelay
// ============================================================================

pub fn from_genai_tool_call(tc: &GenaiToolCall) -> ToolCall {
    // Some adapters hand back the arguments as an encoded string
    let input = match &tc.fn_arguments {
        Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| tc.fn_arguments.clone()),
        other => other.clone(),
    };

    ToolCall::new(tc.call_id.clone(), tc.fn_name.clone(), input)
}

/// Convert one genai stream event into zero or more model chunks
pub fn from_genai_event(event: ChatStreamEvent) -> Vec<ProviderResult<ModelChunk>> {
    match event {
        ChatStreamEvent::Chunk(chunk) if !chunk.content.is_empty() => {
            vec![Ok(ModelChunk::Text(chunk.content))]
        }
        ChatStreamEvent::End(end) => match end.captured_tool_calls() {
            Some(tool_calls) => tool_calls
                .iter()
                .map(|tc| Ok(ModelChunk::ToolCall(from_genai_tool_call(tc))))
                .collect(),
            None => Vec::new(),
        },
        // Partial tool calls arrive again, complete, with `End`
        _ => Vec::new(),
    }
}

// ============================================================================
// Provider Resolution
// ============================================================================

/// Provider configuration for routing
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier (e.g., "openai", "azure", "openrouter")
    pub provider: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: impl Into<String>, model: &ProviderModelConfig) -> Self {
        Self {
            provider: provider.into(),
            api_key: model.api_key.clone(),
            api_base: model.api_base.clone(),
        }
    }
}

/// Secret name holding the key for a provider id or adapter kind
pub fn secret_key_for(provider: &str, adapter: AdapterKind) -> String {
    if provider.is_empty() {
        format!("{:?}", adapter).to_lowercase()
    } else {
        provider.to_lowercase()
    }
}

// ============================================================================
// Client Creation with Custom Auth
// ============================================================================

/// Create a genai Client with custom auth and endpoint resolution
pub fn create_client(config: &ProviderConfig, secrets: Arc<dyn SecretStore>) -> Client {
    let auth_provider = config.provider.clone();
    let auth_explicit_key = config.api_key.clone();

    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |model_iden: ModelIden| -> Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>> {
            let provider = auth_provider.clone();
            let explicit_key = auth_explicit_key.clone();
            let secrets = Arc::clone(&secrets);
            let adapter_kind = model_iden.adapter_kind;

            Box::pin(async move {
                if let Some(key) = explicit_key {
                    return Ok(Some(AuthData::from_single(key)));
                }

                // Backends such as ollama run without a key
                let secret_key = secret_key_for(&provider, adapter_kind);
                Ok(secrets.get(&secret_key).map(AuthData::from_single))
            })
        },
    );

    let target_provider = config.provider.clone();
    let target_api_base = config.api_base.clone();

    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let ServiceTarget { ref model, .. } = target;

            let endpoint = match (target_provider.as_str(), &target_api_base) {
                (_, Some(base)) => Endpoint::from_owned(base.clone()),
                ("openrouter", None) => Endpoint::from_static("https://openrouter.ai/api/v1/"),
                ("mistral", None) => Endpoint::from_static("https://api.mistral.ai/v1/"),
                // Native genai providers resolve normally
                _ => return Ok(target),
            };

            let adapter_kind = if is_genai_native(&target_provider) {
                model.adapter_kind
            } else {
                AdapterKind::OpenAI
            };
            let resolved_model = ModelIden::new(adapter_kind, model.model_name.clone());

            Ok(ServiceTarget {
                endpoint,
                auth: target.auth,
                model: resolved_model,
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}

/// Check if a provider is natively supported by genai
pub fn is_genai_native(provider: &str) -> bool {
    matches!(
        provider.to_lowercase().as_str(),
        "openai"
            | "anthropic"
            | "gemini"
            | "ollama"
            | "groq"
            | "xai"
            | "deepseek"
            | "cohere"
            | "fireworks"
            | "together"
    )
}

/// Check if a provider can be handled by genai (native or via OpenAI-compat)
pub fn is_genai_supported(provider: &str) -> bool {
    is_genai_native(provider)
        || matches!(
            provider.to_lowercase().as_str(),
            "azure" | "openrouter" | "mistral"
        )
}
