//! Wire events streamed back to the caller
//!
//! Each event is serialized as one JSON object per line
//! (`application/x-json-stream`).

use serde_json::{json, Map, Value};

/// A normalized event on the outbound stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Text fragment produced by the model, in token order
    LlmChunk(String),
    /// The model requested a tool invocation
    ToolCall {
        name: String,
        arguments: Value,
    },
    /// A tool invocation completed
    ToolResult {
        name: Option<String>,
        result: Value,
    },
    /// Terminal message carrying a user-facing explanation
    FinalMessage {
        content: String,
        metadata: Value,
    },
    /// Terminal failure
    Error(String),
    /// An upstream event kind with no dedicated mapping
    Passthrough {
        kind: String,
        data: Value,
    },
}

impl StreamEvent {
    /// Create a text chunk
    pub fn chunk(text: impl Into<String>) -> Self {
        StreamEvent::LlmChunk(text.into())
    }

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error(message.into())
    }

    /// Wire `type` tag of this event
    pub fn kind(&self) -> &str {
        match self {
            StreamEvent::LlmChunk(_) => "llm_chunk",
            StreamEvent::ToolCall { .. } => "tool_calls",
            StreamEvent::ToolResult { .. } => "tool_result",
            StreamEvent::FinalMessage { .. } => "final_message",
            StreamEvent::Error(_) => "error",
            StreamEvent::Passthrough { kind, .. } => kind,
        }
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::FinalMessage { .. } | StreamEvent::Error(_))
    }

    /// Get the text if this is a chunk
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StreamEvent::LlmChunk(text) => Some(text),
            _ => None,
        }
    }

    /// Serialize to the wire object `{"type": ..., "data": ...}`
    pub fn to_json(&self) -> Value {
        let data = match self {
            StreamEvent::LlmChunk(text) => Value::String(text.clone()),
            StreamEvent::ToolCall { name, arguments } => json!([{
                "function": {"name": name, "arguments": arguments},
                "name": name,
            }]),
            StreamEvent::ToolResult { name, result } => {
                let mut data = Map::new();
                data.insert("result".to_string(), result.clone());
                if let Some(name) = name {
                    data.insert("tool_name".to_string(), Value::String(name.clone()));
                }
                Value::Object(data)
            }
            StreamEvent::FinalMessage { content, metadata } => json!({
                "content": content,
                "metadata": metadata,
            }),
            StreamEvent::Error(message) => Value::String(message.clone()),
            StreamEvent::Passthrough { data, .. } => data.clone(),
        };

        json!({"type": self.kind(), "data": data})
    }

    /// Serialize to a single newline-terminated wire line
    pub fn to_line(&self) -> String {
        let mut line = self.to_json().to_string();
        line.push('\n');
        line
    }
}
