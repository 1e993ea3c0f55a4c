//! Per-request agent pipeline
//!
//! assemble messages ─► resolve the caller's tool catalog ─► orchestrate the turn

use std::sync::Arc;

use futures::StreamExt;

use super::request::{assemble_messages, GenerateRequest, RequestError};
use super::retry::{EventStream, RetryOrchestrator, RetryPolicy};
use super::runner::{AgentRunner, ToolLoopRunner, TurnInput};
use crate::config::{AgentSettings, ConfigResult};
use crate::logging::Logger;
use crate::providers::Provider;
use crate::tools::ToolRegistry;
use crate::types::RequestContext;

/// Entry point for one generate request
pub struct AgentService {
    instructions: String,
    registry: Arc<ToolRegistry>,
    orchestrator: Arc<RetryOrchestrator>,
    logger: Arc<dyn Logger>,
}

impl AgentService {
    pub fn new(
        instructions: impl Into<String>,
        registry: Arc<ToolRegistry>,
        runner: Arc<dyn AgentRunner>,
        policy: RetryPolicy,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let orchestrator = Arc::new(RetryOrchestrator::new(
            runner,
            Arc::clone(&registry),
            policy,
            Arc::clone(&logger),
        ));
        Self {
            instructions: instructions.into(),
            registry,
            orchestrator,
            logger,
        }
    }

    /// Wire a [`ToolLoopRunner`] over `provider` as configured by `settings`
    pub fn from_settings(
        settings: &AgentSettings,
        registry: Arc<ToolRegistry>,
        provider: Arc<dyn Provider>,
        logger: Arc<dyn Logger>,
    ) -> ConfigResult<Self> {
        let instructions = settings.resolve_instructions()?;
        let runner = Arc::new(ToolLoopRunner::new(
            provider,
            Arc::clone(&registry),
            settings,
            Arc::clone(&logger),
        ));
        Ok(Self::new(
            instructions,
            registry,
            runner,
            RetryPolicy::from(settings),
            logger,
        ))
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Validate the request and stream the turn's events.
    ///
    /// Invalid requests fail here, before anything is streamed. Tool
    /// providers are contacted when the stream is first polled.
    pub fn handle(&self, request: &GenerateRequest, ctx: RequestContext) -> Result<EventStream, RequestError> {
        let messages = assemble_messages(&self.instructions, request, self.logger.as_ref())?;

        self.logger.info(&format!(
            "[AgentService] [{}] user={} messages={} (history {})",
            ctx.short_id(),
            ctx.user_str(),
            messages.len(),
            request.history.len()
        ));

        let registry = Arc::clone(&self.registry);
        let orchestrator = Arc::clone(&self.orchestrator);

        let stream = futures::stream::once(async move {
            let catalog = Arc::new(registry.resolve(&ctx).await);
            orchestrator.run(TurnInput {
                messages,
                catalog,
                ctx,
            })
        })
        .flatten();

        Ok(Box::pin(stream))
    }
}
