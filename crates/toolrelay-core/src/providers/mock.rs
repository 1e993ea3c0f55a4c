//! Mock provider for testing
//!
//! Deterministic model turns: echo, fixed text, scripted tool calls and
//! scripted failures. Replies can be scripted turn by turn so the agent loop
//! can be driven end to end without a network.

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use super::error::{ProviderError, ProviderResult};
use super::traits::{ModelChunk, Provider, ProviderModelConfig, StreamChatOptions, StreamResponse};
use crate::logging::Logger;
use crate::types::{CancellationToken, ChatMessage, MessageRole, ToolCall, ToolDescriptor};

/// Behaviour once the script is exhausted
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Repeat the most recent user message
    #[default]
    Echo,
    /// Return a fixed response
    Fixed(String),
    /// Return response as specific chunks
    Chunks(Vec<String>),
    /// Simulate an error after `delay_chunks` text chunks
    Error { message: String, delay_chunks: usize },
    /// A turn with no chunks at all
    Empty,
}

/// One scripted model reply
#[derive(Debug, Clone)]
pub enum MockTurn {
    /// Text chunks, in order
    Reply(Vec<String>),
    /// Optional text chunks followed by tool calls
    ToolCalls { text: Vec<String>, calls: Vec<ToolCall> },
    /// Text chunks followed by a backend error with this status
    Fail {
        status: u16,
        message: String,
        after: Vec<String>,
    },
}

impl MockTurn {
    pub fn reply(text: impl Into<String>) -> Self {
        MockTurn::Reply(vec![text.into()])
    }

    /// A turn calling a single tool
    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        let name = name.into();
        MockTurn::ToolCalls {
            text: Vec::new(),
            calls: vec![ToolCall::new(format!("call_{}", name), name, arguments)],
        }
    }

    pub fn fail(status: u16, message: impl Into<String>) -> Self {
        MockTurn::Fail {
            status,
            message: message.into(),
            after: Vec::new(),
        }
    }
}

/// Knobs for [`MockProvider`]
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub mode: MockMode,
    /// Pause between chunks, in milliseconds
    pub chunk_delay_ms: u64,
    /// Characters per chunk for echo and fixed replies (0 keeps the reply whole)
    pub chunk_size: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            mode: MockMode::Echo,
            chunk_delay_ms: 0,
            chunk_size: 10,
        }
    }
}

enum Step {
    Chunk(ModelChunk),
    Fail(ProviderError),
}

/// Scriptable model backend
pub struct MockProvider {
    config: MockConfig,
    script: Mutex<VecDeque<MockTurn>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    offered_tools: Mutex<Vec<Vec<String>>>,
    logger: Arc<dyn Logger>,
}

impl MockProvider {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self::with_config(MockConfig::default(), logger)
    }

    pub fn with_config(config: MockConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            config,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            offered_tools: Mutex::new(Vec::new()),
            logger,
        }
    }

    /// Replies with the last user message
    pub fn echo(logger: Arc<dyn Logger>) -> Self {
        Self::new(logger)
    }

    pub fn fixed(response: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::with_config(
            MockConfig {
                mode: MockMode::Fixed(response.into()),
                ..Default::default()
            },
            logger,
        )
    }

    pub fn chunked(chunks: Vec<String>, delay_ms: u64, logger: Arc<dyn Logger>) -> Self {
        Self::with_config(
            MockConfig {
                mode: MockMode::Chunks(chunks),
                chunk_delay_ms: delay_ms,
                ..Default::default()
            },
            logger,
        )
    }

    pub fn error(message: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self::with_config(
            MockConfig {
                mode: MockMode::Error {
                    message: message.into(),
                    delay_chunks: 0,
                },
                ..Default::default()
            },
            logger,
        )
    }

    /// Replies to the next calls, in order; afterwards the mode applies
    pub fn scripted(turns: Vec<MockTurn>, logger: Arc<dyn Logger>) -> Self {
        let provider = Self::with_config(
            MockConfig {
                mode: MockMode::Empty,
                ..Default::default()
            },
            logger,
        );
        provider.script.lock().extend(turns);
        provider
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.config.chunk_delay_ms = delay_ms;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Append a scripted reply
    pub fn push_turn(&self, turn: MockTurn) {
        self.script.lock().push_back(turn);
    }

    /// Conversations received, one per `stream_chat` call
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().clone()
    }

    /// Tool names offered on each call
    pub fn offered_tools(&self) -> Vec<Vec<String>> {
        self.offered_tools.lock().clone()
    }

    fn last_user_message(&self, messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .rev()
            .filter(|msg| msg.role == MessageRole::User)
            .map(|msg| msg.content.to_plain_text())
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| "Hello from MockProvider!".to_string())
    }

    fn split_into_chunks(&self, text: &str) -> Vec<String> {
        if self.config.chunk_size == 0 || text.is_empty() {
            return vec![text.to_string()];
        }

        text.chars()
            .collect::<Vec<_>>()
            .chunks(self.config.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }

    fn text_steps(chunks: Vec<String>) -> Vec<Step> {
        chunks
            .into_iter()
            .map(|text| Step::Chunk(ModelChunk::Text(text)))
            .collect()
    }

    fn steps_for_turn(&self, turn: MockTurn) -> Vec<Step> {
        match turn {
            MockTurn::Reply(chunks) => Self::text_steps(chunks),
            MockTurn::ToolCalls { text, calls } => {
                let mut steps = Self::text_steps(text);
                steps.extend(calls.into_iter().map(|c| Step::Chunk(ModelChunk::ToolCall(c))));
                steps
            }
            MockTurn::Fail {
                status,
                message,
                after,
            } => {
                let mut steps = Self::text_steps(after);
                steps.push(Step::Fail(ProviderError::api_error("mock", status, message)));
                steps
            }
        }
    }

    fn steps_for_mode(&self, messages: &[ChatMessage]) -> Vec<Step> {
        match &self.config.mode {
            MockMode::Echo => {
                let user_msg = self.last_user_message(messages);
                Self::text_steps(self.split_into_chunks(&format!("Echo: {}", user_msg)))
            }
            MockMode::Fixed(response) => Self::text_steps(self.split_into_chunks(response)),
            MockMode::Chunks(chunks) => Self::text_steps(chunks.clone()),
            MockMode::Empty => Vec::new(),
            MockMode::Error {
                message,
                delay_chunks,
            } => {
                let mut steps =
                    Self::text_steps((0..*delay_chunks).map(|i| format!("Chunk {} before error. ", i)).collect());
                steps.push(Step::Fail(ProviderError::Other(format!("Mock error: {}", message))));
                steps
            }
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_api_base(&self) -> &str {
        "http://localhost:0/mock"
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        _model: ProviderModelConfig,
        options: StreamChatOptions,
        cancel_token: CancellationToken,
    ) -> ProviderResult<StreamResponse> {
        let tool_names = options
            .tools
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|t: &ToolDescriptor| t.name.clone())
            .collect();
        self.offered_tools.lock().push(tool_names);
        self.requests.lock().push(messages.clone());

        let scripted = self.script.lock().pop_front();
        let steps = match scripted {
            Some(turn) => {
                self.logger.debug(&format!("[MockProvider] Scripted turn: {:?}", turn));
                self.steps_for_turn(turn)
            }
            None => self.steps_for_mode(&messages),
        };

        let delay_ms = self.config.chunk_delay_ms;
        let stream = stream::iter(steps.into_iter().enumerate()).then(move |(i, step)| {
            let cancel = cancel_token.clone();
            async move {
                if cancel.is_cancelled() {
                    return Err(ProviderError::Cancelled);
                }
                if i > 0 && delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                match step {
                    Step::Chunk(chunk) => Ok(chunk),
                    Step::Fail(e) => Err(e),
                }
            }
        });

        Ok(Box::pin(stream))
    }
}
