//! Run event normalization
//!
//! Maps every [`RunEvent`] to at most one [`StreamEvent`], in arrival order:
//!
//! | run event                                   | wire event              |
//! |---------------------------------------------|-------------------------|
//! | text delta                                  | `llm_chunk`             |
//! | flat or item tool call                      | `tool_calls`            |
//! | flat or item tool output                    | `tool_result`           |
//! | tool failure                                | logged only             |
//! | other raw events, items, agent updates      | dropped                 |
//! | anything else                               | `{type, data}` as is    |

use std::sync::Arc;

use serde_json::Value;

use super::events::{RawResponse, RunEvent, RunItem};
use crate::logging::{truncate_for_log, Logger};
use crate::types::StreamEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Streaming,
    Done,
}

/// Stateful mapper for one run's events
pub struct EventNormalizer {
    state: State,
    logger: Arc<dyn Logger>,
}

impl EventNormalizer {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            state: State::Streaming,
            logger,
        }
    }

    /// Normalize one event; `None` when the event is not forwarded
    pub fn normalize(&mut self, event: RunEvent) -> Option<StreamEvent> {
        if self.state == State::Done {
            return None;
        }

        match event {
            RunEvent::RawResponse(RawResponse::TextDelta(text)) => Some(StreamEvent::LlmChunk(text)),

            RunEvent::ToolCalled { name, arguments }
            | RunEvent::RunItem(RunItem::ToolCall { name, arguments }) => {
                let arguments = parse_embedded_json(arguments);
                self.logger.info(&format!(
                    "[Normalizer] Tool call {} args={}",
                    name,
                    truncate_for_log(&arguments.to_string())
                ));
                Some(StreamEvent::ToolCall { name, arguments })
            }

            RunEvent::ToolCompleted { name, result }
            | RunEvent::RunItem(RunItem::ToolOutput { name, output: result }) => {
                let result = parse_embedded_json(result);
                self.logger.info(&format!(
                    "[Normalizer] Tool result {} {}",
                    name.as_deref().unwrap_or("-"),
                    truncate_for_log(&result.to_string())
                ));
                Some(StreamEvent::ToolResult { name, result })
            }

            RunEvent::ToolFailed { name, error } => {
                self.logger.warn(&format!(
                    "[Normalizer] Tool error {}: {}",
                    name.as_deref().unwrap_or("-"),
                    truncate_for_log(&error)
                ));
                None
            }

            RunEvent::RawResponse(RawResponse::Other { .. })
            | RunEvent::RunItem(RunItem::MessageOutput(_))
            | RunEvent::RunItem(RunItem::Other { .. })
            | RunEvent::AgentUpdated { .. } => None,

            RunEvent::Other { kind, data } => {
                self.logger
                    .debug(&format!("[Normalizer] Passing through event {}", kind));
                Some(StreamEvent::Passthrough { kind, data })
            }
        }
    }

    /// Stop forwarding; later events are ignored
    pub fn finish(&mut self) {
        self.state = State::Done;
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }
}

/// A JSON string holding an object or array becomes that value
fn parse_embedded_json(value: Value) -> Value {
    if let Value::String(raw) = &value {
        let trimmed = raw.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
                return parsed;
            }
        }
    }
    value
}
