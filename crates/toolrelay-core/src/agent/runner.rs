//! Model-execution collaborator
//!
//! [`AgentRunner`] is the seam the orchestrator drives. [`ToolLoopRunner`]
//! implements it over an LLM [`Provider`]: stream a reply, run the tools it
//! asks for through the [`ToolRegistry`], feed the results back, and repeat
//! until the model answers without tool calls or `max_turns` is reached.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use super::error::{RunError, RunResult};
use super::events::{RunEvent, RunItem};
use crate::config::AgentSettings;
use crate::logging::Logger;
use crate::providers::{ModelChunk, Provider, ProviderModelConfig, StreamChatOptions};
use crate::tools::{Catalog, ToolRegistry};
use crate::types::{ChatMessage, RequestContext, ToolCall};

/// Events of one run; an `Err` item ends the run
pub type RunStream = Pin<Box<dyn Stream<Item = RunResult<RunEvent>> + Send>>;

/// Everything one run needs
#[derive(Clone)]
pub struct TurnInput {
    pub messages: Vec<ChatMessage>,
    pub catalog: Arc<Catalog>,
    pub ctx: RequestContext,
}

/// Runs the model over a conversation and streams what happens
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run_streamed(&self, input: TurnInput) -> RunResult<RunStream>;
}

const CHANNEL_CAPACITY: usize = 64;

/// Tool-calling loop over an LLM provider
pub struct ToolLoopRunner {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    agent_name: String,
    model: ProviderModelConfig,
    max_turns: u32,
    logger: Arc<dyn Logger>,
}

impl ToolLoopRunner {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        settings: &AgentSettings,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let mut model = ProviderModelConfig::new(&settings.model);
        if let Some(base) = &settings.api_base {
            model = model.with_api_base(base);
        }

        Self {
            provider,
            registry,
            agent_name: settings.name.clone(),
            model,
            max_turns: settings.max_turns.max(1),
            logger,
        }
    }
}

#[async_trait]
impl AgentRunner for ToolLoopRunner {
    async fn run_streamed(&self, input: TurnInput) -> RunResult<RunStream> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let run = ToolLoop {
            provider: Arc::clone(&self.provider),
            registry: Arc::clone(&self.registry),
            agent_name: self.agent_name.clone(),
            model: self.model.clone(),
            max_turns: self.max_turns,
            logger: Arc::clone(&self.logger),
            tx,
        };
        tokio::spawn(run.drive(input));

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(Box::pin(stream))
    }
}

struct ToolLoop {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    agent_name: String,
    model: ProviderModelConfig,
    max_turns: u32,
    logger: Arc<dyn Logger>,
    tx: mpsc::Sender<RunResult<RunEvent>>,
}

/// The receiver went away; stop quietly
struct Detached;

impl ToolLoop {
    async fn drive(self, input: TurnInput) {
        let TurnInput {
            mut messages,
            catalog,
            ctx,
        } = input;

        let outcome = self.turns(&mut messages, &catalog, &ctx).await;
        if let Ok(Err(e)) = outcome {
            self.logger.debug(&format!(
                "[ToolLoopRunner] [{}] run failed: {}",
                ctx.short_id(),
                e
            ));
            let _ = self.tx.send(Err(e)).await;
        }
    }

    async fn emit(&self, event: RunEvent) -> Result<(), Detached> {
        self.tx.send(Ok(event)).await.map_err(|_| Detached)
    }

    async fn turns(
        &self,
        messages: &mut Vec<ChatMessage>,
        catalog: &Catalog,
        ctx: &RequestContext,
    ) -> Result<RunResult<()>, Detached> {
        let tools = catalog.tools();

        for turn in 1..=self.max_turns {
            if ctx.cancel.is_cancelled() {
                return Ok(Err(RunError::Cancelled));
            }
            self.logger.debug(&format!(
                "[ToolLoopRunner] [{}] turn {}/{} with {} messages",
                ctx.short_id(),
                turn,
                self.max_turns,
                messages.len()
            ));

            let options = StreamChatOptions::new().with_tools(tools.clone());
            let mut stream = match self
                .provider
                .stream_chat(messages.clone(), self.model.clone(), options, ctx.cancel.child_token())
                .await
            {
                Ok(stream) => stream,
                Err(e) => return Ok(Err(e.into())),
            };

            let mut text = String::new();
            let mut calls: Vec<ToolCall> = Vec::new();
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(ModelChunk::Text(delta)) => {
                        text.push_str(&delta);
                        self.emit(RunEvent::text(delta)).await?;
                    }
                    Ok(ModelChunk::ToolCall(call)) => calls.push(call),
                    Err(e) => return Ok(Err(e.into())),
                }
            }

            if calls.is_empty() {
                self.emit(RunEvent::RunItem(RunItem::MessageOutput(text))).await?;
                return Ok(Ok(()));
            }

            if let Some(missing) = calls.iter().find(|c| catalog.find(&c.name).is_none()) {
                return Ok(Err(RunError::tool_not_found(&missing.name, &self.agent_name)));
            }

            messages.push(ChatMessage::assistant_tool_calls(text, calls.clone()));
            for call in calls {
                if let Err(e) = self.run_tool(messages, catalog, ctx, call).await? {
                    return Ok(Err(e));
                }
            }
        }

        Ok(Err(RunError::MaxTurnsExceeded(self.max_turns)))
    }

    async fn run_tool(
        &self,
        messages: &mut Vec<ChatMessage>,
        catalog: &Catalog,
        ctx: &RequestContext,
        call: ToolCall,
    ) -> Result<RunResult<()>, Detached> {
        let provider = match catalog.find(&call.name) {
            Some(entry) => entry.provider.clone(),
            None => return Ok(Err(RunError::tool_not_found(&call.name, &self.agent_name))),
        };

        self.emit(RunEvent::ToolCalled {
            name: call.name.clone(),
            arguments: call.input.clone(),
        })
        .await?;

        match self
            .registry
            .invoke(ctx, &provider, &call.name, call.input.clone())
            .await
        {
            Ok(result) => {
                messages.push(ChatMessage::tool_result(&call.id, &call.name, render(&result)));
                self.emit(RunEvent::ToolCompleted {
                    name: Some(call.name),
                    result,
                })
                .await?;
            }
            Err(e) if e.is_connection_lost() => {
                self.registry.reset_connection(Some(provider.as_str()));
                return Ok(Err(RunError::ConnectionLost {
                    provider,
                    message: e.to_string(),
                }));
            }
            Err(e) => {
                // The model sees the failure and may recover
                messages.push(ChatMessage::tool_result(&call.id, &call.name, format!("Error: {}", e)));
                self.emit(RunEvent::ToolFailed {
                    name: Some(call.name),
                    error: e.to_string(),
                })
                .await?;
            }
        }

        Ok(Ok(()))
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
