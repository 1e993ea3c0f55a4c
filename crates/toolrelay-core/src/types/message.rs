//! Chat message types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tool::ToolCall;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    /// Parse a role name as sent by chat clients
    pub fn parse(role: &str) -> Option<Self> {
        match role.trim().to_lowercase().as_str() {
            "system" | "developer" => Some(MessageRole::System),
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            "tool" | "function" => Some(MessageRole::Tool),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// A chat message for LLM requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender
    pub role: MessageRole,
    /// The content of the message (string or structured parts)
    pub content: MessageContent,
    /// For `tool` messages: the call this message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For `tool` messages: the tool that produced the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// For `assistant` messages: tool calls requested by the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: MessageContent) -> Self {
        Self {
            role,
            content,
            tool_call_id: None,
            name: None,
            tool_calls: Vec::new(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, MessageContent::Text(content.into()))
    }

    /// Create a user message
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(MessageRole::User, content.into())
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, MessageContent::Text(content.into()))
    }

    /// Assistant turn that requested tool calls (text may be empty)
    pub fn assistant_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::assistant(text);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Tool output answering `call_id`
    pub fn tool_result(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut msg = Self::new(MessageRole::Tool, MessageContent::Text(content.into()));
        msg.tool_call_id = Some(call_id.into());
        msg.name = Some(name.into());
        msg
    }

    /// Get the text content if this is a simple text message
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(s) => Some(s),
            MessageContent::Parts(_) => None,
        }
    }
}

/// Message content - either simple text or structured parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content
    Text(String),
    /// Structured content with multiple parts
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Flatten to plain text; images are rendered as a reference line
    pub fn to_plain_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => text.clone(),
                    ContentPart::Image { url } => format!("[image: {}]", url),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Build content from a loosely shaped JSON value (string or part list).
    ///
    /// Returns `None` if the value is neither, or if any list entry is not a
    /// recognizable content part.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(MessageContent::Text(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(ContentPart::from_value)
                .collect::<Option<Vec<_>>>()
                .map(MessageContent::Parts),
            Value::Null => Some(MessageContent::Text(String::new())),
            _ => None,
        }
    }

    /// Like [`MessageContent::from_value`], but unrecognized list entries are
    /// dropped instead of failing the whole list. Returns the content and the
    /// number of entries dropped.
    pub fn from_value_lossy(value: &Value) -> Option<(Self, usize)> {
        match value {
            Value::Array(items) => {
                let parts: Vec<ContentPart> = items.iter().filter_map(ContentPart::from_value).collect();
                let dropped = items.len() - parts.len();
                Some((MessageContent::Parts(parts), dropped))
            }
            other => Self::from_value(other).map(|content| (content, 0)),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

impl From<Vec<ContentPart>> for MessageContent {
    fn from(parts: Vec<ContentPart>) -> Self {
        MessageContent::Parts(parts)
    }
}

/// Canonical content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content
    Text { text: String },
    /// Image content (URL or data URL)
    Image { url: String },
}

impl ContentPart {
    /// Create a text content part
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Create an image content part
    pub fn image(url: impl Into<String>) -> Self {
        ContentPart::Image { url: url.into() }
    }

    /// Normalize one of the accepted client spellings:
    ///
    /// - `{"type": "text" | "input_text" | "output_text", "text": "..."}`
    /// - `{"type": "refusal", "refusal": "..."}`
    /// - `{"type": "image", "url": "..."}` or `{"type": "image", "image_url": "..."}`
    /// - `{"type": "input_image" | "image_url", "image_url": "..." | {"url": "..."}}`
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let kind = obj.get("type").and_then(Value::as_str)?;

        match kind {
            "text" | "input_text" | "output_text" => obj
                .get("text")
                .and_then(Value::as_str)
                .map(ContentPart::text),
            "refusal" => obj
                .get("refusal")
                .and_then(Value::as_str)
                .map(ContentPart::text),
            "image" | "input_image" | "image_url" => {
                let url = obj
                    .get("url")
                    .and_then(Value::as_str)
                    .or_else(|| match obj.get("image_url") {
                        Some(Value::String(s)) => Some(s.as_str()),
                        Some(Value::Object(inner)) => inner.get("url").and_then(Value::as_str),
                        _ => None,
                    })?;
                Some(ContentPart::image(url))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_message_creation() {
        let sys = ChatMessage::system("You are helpful");
        assert_eq!(sys.role, MessageRole::System);
        assert_eq!(sys.text(), Some("You are helpful"));

        let tool = ChatMessage::tool_result("call_1", "search", "42 results");
        assert_eq!(tool.role, MessageRole::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool.name.as_deref(), Some("search"));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(MessageRole::parse("System"), Some(MessageRole::System));
        assert_eq!(MessageRole::parse("tool"), Some(MessageRole::Tool));
        assert_eq!(MessageRole::parse("narrator"), None);
    }

    #[test]
    fn test_content_part_spellings() {
        let cases = [
            json!({"type": "text", "text": "hi"}),
            json!({"type": "input_text", "text": "hi"}),
            json!({"type": "output_text", "text": "hi", "annotations": []}),
            json!({"type": "refusal", "refusal": "hi"}),
        ];
        for case in cases {
            assert_eq!(ContentPart::from_value(&case), Some(ContentPart::text("hi")));
        }

        let images = [
            json!({"type": "image", "url": "https://x/y.png"}),
            json!({"type": "image", "image_url": "https://x/y.png"}),
            json!({"type": "input_image", "image_url": "https://x/y.png"}),
            json!({"type": "image_url", "image_url": {"url": "https://x/y.png"}}),
        ];
        for case in images {
            assert_eq!(
                ContentPart::from_value(&case),
                Some(ContentPart::image("https://x/y.png"))
            );
        }

        assert_eq!(ContentPart::from_value(&json!({"type": "audio"})), None);
        assert_eq!(ContentPart::from_value(&json!("plain")), None);
    }

    #[test]
    fn test_content_from_value() {
        assert_eq!(
            MessageContent::from_value(&json!("hello")),
            Some(MessageContent::Text("hello".into()))
        );
        let parts = MessageContent::from_value(&json!([
            {"type": "text", "text": "look"},
            {"type": "input_image", "image_url": "data:image/png;base64,AAA"}
        ]))
        .unwrap();
        assert_eq!(
            parts.to_plain_text(),
            "look\n[image: data:image/png;base64,AAA]"
        );
        assert!(MessageContent::from_value(&json!([{"type": "bogus"}])).is_none());
        assert!(MessageContent::from_value(&json!(42)).is_none());
    }

    #[test]
    fn test_content_from_value_lossy_keeps_known_parts() {
        let (content, dropped) = MessageContent::from_value_lossy(&json!([
            {"type": "output_text", "text": "Earlier answer"},
            {"type": "audio", "data": "..."}
        ]))
        .unwrap();
        assert_eq!(content, MessageContent::Parts(vec![ContentPart::text("Earlier answer")]));
        assert_eq!(dropped, 1);

        assert_eq!(
            MessageContent::from_value_lossy(&json!("plain")),
            Some((MessageContent::Text("plain".into()), 0))
        );
        assert!(MessageContent::from_value_lossy(&json!(42)).is_none());
    }

    #[test]
    fn test_message_serialization() {
        let msg = ChatMessage::user("Hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"content\":\"Hello\""));
        assert!(!json.contains("tool_calls"));
    }
}
