//! Run events produced by the model-execution collaborator
//!
//! These are the shapes the normalizer consumes. Runners built on this crate
//! emit them directly; [`RunEvent::from_value`] adapts loosely shaped JSON
//! events from other agent frameworks.

use serde_json::Value;

/// Low-level response stream event
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// Token delta of the assistant's text output
    TextDelta(String),
    /// Any other raw event (reasoning, usage, ...)
    Other { kind: String },
}

/// Completed unit of work wrapped in an item event
#[derive(Debug, Clone, PartialEq)]
pub enum RunItem {
    ToolCall { name: String, arguments: Value },
    ToolOutput { name: Option<String>, output: Value },
    MessageOutput(String),
    Other { kind: String },
}

/// One event of an agent run
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    RawResponse(RawResponse),
    /// Flat tool call event
    ToolCalled { name: String, arguments: Value },
    /// Flat tool completion event
    ToolCompleted { name: Option<String>, result: Value },
    ToolFailed { name: Option<String>, error: String },
    /// Nested item event
    RunItem(RunItem),
    AgentUpdated { agent: String },
    /// Event kind with no dedicated shape
    Other { kind: String, data: Value },
}

impl RunEvent {
    pub fn text(delta: impl Into<String>) -> Self {
        RunEvent::RawResponse(RawResponse::TextDelta(delta.into()))
    }

    /// Event kind as reported upstream, for logging
    pub fn kind(&self) -> &str {
        match self {
            RunEvent::RawResponse(_) => "raw_response_event",
            RunEvent::ToolCalled { .. } => "tool_call",
            RunEvent::ToolCompleted { .. } => "tool_result",
            RunEvent::ToolFailed { .. } => "tool_error",
            RunEvent::RunItem(_) => "run_item_stream_event",
            RunEvent::AgentUpdated { .. } => "agent_updated_stream_event",
            RunEvent::Other { kind, .. } => kind,
        }
    }

    /// Adapt a loosely shaped JSON event.
    ///
    /// The kind is read from `type` or `event`; tool names from `name` or
    /// `tool_name`; arguments from `arguments` or `args`; results from
    /// `result`, `output` or `data`.
    pub fn from_value(value: &Value) -> Self {
        let kind = field(value, &["type", "event"])
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let name = || {
            field(value, &["name", "tool_name"])
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        match kind.as_str() {
            "raw_response_event" | "response.output_text.delta" => {
                let data = value.get("data").unwrap_or(value);
                let delta = field(data, &["delta"]).and_then(Value::as_str);
                let data_kind = field(data, &["type"]).and_then(Value::as_str);
                match (delta, data_kind) {
                    (Some(delta), None | Some("response.output_text.delta")) => {
                        RunEvent::text(delta)
                    }
                    (_, other) => RunEvent::RawResponse(RawResponse::Other {
                        kind: other.unwrap_or("unknown").to_string(),
                    }),
                }
            }
            "tool_call" | "function_call" => RunEvent::ToolCalled {
                name: name().unwrap_or_default(),
                arguments: field(value, &["arguments", "args"]).cloned().unwrap_or(Value::Null),
            },
            "tool_result" | "function_result" => RunEvent::ToolCompleted {
                name: name(),
                result: field(value, &["result", "output", "data"]).cloned().unwrap_or(Value::Null),
            },
            "tool_error" | "function_error" => RunEvent::ToolFailed {
                name: name(),
                error: field(value, &["error", "data"])
                    .map(render)
                    .unwrap_or_default(),
            },
            "agent_updated_stream_event" => RunEvent::AgentUpdated {
                agent: field(value, &["agent", "new_agent"])
                    .map(render)
                    .unwrap_or_default(),
            },
            "run_item_stream_event" => RunEvent::RunItem(RunItem::Other {
                kind: field(value, &["name"])
                    .and_then(Value::as_str)
                    .unwrap_or("item")
                    .to_string(),
            }),
            _ => RunEvent::Other {
                data: value.get("data").cloned().unwrap_or(Value::Null),
                kind,
            },
        }
    }
}

fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find(|v| !v.is_null())
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
