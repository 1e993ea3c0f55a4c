//! Bounded retry of a conversational turn
//!
//! ```text
//! Attempting(n) ──duplicate tool name, n > 0──► backoff ─► Attempting(n-1)
//!      │
//!      ├── stream exhausted ────────────────────────────► Done
//!      └── other failure, or n == 0 ────────────────────► Failed (one terminal event)
//! ```
//!
//! A discarded attempt never reaches the caller. With
//! [`RetryStaging::Live`] events stream as they arrive and only attempts
//! that emitted nothing are retried; with [`RetryStaging::Attempt`] the
//! events of a retryable attempt are held back until it ends.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;

use super::error::{RunError, TurnFailure};
use super::normalizer::EventNormalizer;
use super::runner::{AgentRunner, TurnInput};
use crate::config::{AgentSettings, RetryStaging};
use crate::logging::Logger;
use crate::tools::ToolRegistry;
use crate::types::StreamEvent;

/// Normalized events of one request
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

const CHANNEL_CAPACITY: usize = 64;

/// Retry and pacing parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts allowed for the duplicated-tool-name failure
    pub max_retries: u32,
    pub backoff: Duration,
    pub staging: RetryStaging,
    /// Delay after every emitted event
    pub pacing: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(500),
            staging: RetryStaging::Live,
            pacing: Duration::from_millis(10),
        }
    }
}

impl From<&AgentSettings> for RetryPolicy {
    fn from(settings: &AgentSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            backoff: settings.retry_backoff(),
            staging: settings.retry_staging,
            pacing: settings.pacing(),
        }
    }
}

/// Drives one turn through an [`AgentRunner`] under a [`RetryPolicy`]
pub struct RetryOrchestrator {
    runner: Arc<dyn AgentRunner>,
    registry: Arc<ToolRegistry>,
    policy: RetryPolicy,
    logger: Arc<dyn Logger>,
}

impl RetryOrchestrator {
    pub fn new(
        runner: Arc<dyn AgentRunner>,
        registry: Arc<ToolRegistry>,
        policy: RetryPolicy,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            runner,
            registry,
            policy,
            logger,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run the turn in the background and stream its normalized events.
    ///
    /// Dropping the returned stream cancels the request's token.
    pub fn run(&self, input: TurnInput) -> EventStream {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let turn = Turn {
            runner: Arc::clone(&self.runner),
            registry: Arc::clone(&self.registry),
            policy: self.policy.clone(),
            logger: Arc::clone(&self.logger),
            tx,
        };
        tokio::spawn(turn.drive(input));

        Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        }))
    }
}

struct Turn {
    runner: Arc<dyn AgentRunner>,
    registry: Arc<ToolRegistry>,
    policy: RetryPolicy,
    logger: Arc<dyn Logger>,
    tx: mpsc::Sender<StreamEvent>,
}

/// The caller went away
struct Detached;

enum Attempt {
    Completed,
    Failed(RunError),
}

/// Where an attempt's events go
struct Delivery {
    live: bool,
    staged: Vec<StreamEvent>,
    /// Something already reached the caller
    released: bool,
}

impl Turn {
    async fn drive(self, input: TurnInput) {
        let cancel = input.ctx.cancel.clone();
        let id = input.ctx.short_id().to_string();

        tokio::select! {
            _ = self.tx.closed() => {
                self.logger.info(&format!("[RetryOrchestrator] [{}] caller disconnected, cancelling", id));
                cancel.cancel();
            }
            _ = cancel.cancelled() => {
                self.logger.info(&format!("[RetryOrchestrator] [{}] request cancelled", id));
            }
            _ = self.attempts(&input) => {}
        }
    }

    async fn attempts(&self, input: &TurnInput) {
        let id = input.ctx.short_id();
        let mut attempts_left = self.policy.max_retries;

        loop {
            let mut delivery = Delivery {
                live: attempts_left == 0 || self.policy.staging == RetryStaging::Live,
                staged: Vec::new(),
                released: false,
            };

            let outcome = match self.attempt(input, &mut delivery).await {
                Ok(outcome) => outcome,
                Err(Detached) => return,
            };

            let error = match outcome {
                Attempt::Completed => {
                    let _ = self.release(delivery.staged).await;
                    self.logger
                        .debug(&format!("[RetryOrchestrator] [{}] turn completed", id));
                    return;
                }
                Attempt::Failed(error) => error,
            };

            let failure = TurnFailure::classify(&error);
            if failure.is_retryable() && attempts_left > 0 && delivery.released {
                self.logger.warn(&format!(
                    "[RetryOrchestrator] [{}] not retrying, attempt already streamed: {}",
                    id, error
                ));
            } else if failure.is_retryable() && attempts_left > 0 {
                attempts_left -= 1;
                self.logger.warn(&format!(
                    "[RetryOrchestrator] [{}] retrying turn after: {} (attempts left: {})",
                    id, error, attempts_left
                ));
                tokio::time::sleep(self.policy.backoff).await;
                continue;
            }

            if self.release(delivery.staged).await.is_err() {
                return;
            }
            self.fail(id, failure, &error).await;
            return;
        }
    }

    async fn attempt(&self, input: &TurnInput, delivery: &mut Delivery) -> Result<Attempt, Detached> {
        let mut normalizer = EventNormalizer::new(Arc::clone(&self.logger));

        let mut stream = match self.runner.run_streamed(input.clone()).await {
            Ok(stream) => stream,
            Err(e) => return Ok(Attempt::Failed(e)),
        };

        while let Some(item) = stream.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    normalizer.finish();
                    return Ok(Attempt::Failed(e));
                }
            };

            if let Some(out) = normalizer.normalize(event) {
                if delivery.live {
                    self.send(out).await?;
                    delivery.released = true;
                } else {
                    delivery.staged.push(out);
                }
            }
        }

        normalizer.finish();
        Ok(Attempt::Completed)
    }

    async fn fail(&self, id: &str, failure: TurnFailure, error: &RunError) {
        let terminal = match failure {
            TurnFailure::DuplicateToolName { tool, .. } => {
                self.logger.error(&format!(
                    "[RetryOrchestrator] [{}] giving up on duplicated tool name: {}",
                    id, error
                ));
                StreamEvent::FinalMessage {
                    content: format!(
                        "Sorry, I couldn't complete that request because the tool `{}` could not be resolved. Please try again.",
                        tool
                    ),
                    metadata: json!({"error": "tool_not_found", "tool": tool}),
                }
            }
            TurnFailure::StreamConnectionLost { provider, .. } => {
                self.logger.warn(&format!(
                    "[RetryOrchestrator] [{}] connection to {} lost, resetting its state",
                    id, provider
                ));
                self.registry.reset_connection(Some(provider.as_str()));
                StreamEvent::error(format!("Agent execution failed: {}", error))
            }
            TurnFailure::Cancelled => {
                self.logger
                    .info(&format!("[RetryOrchestrator] [{}] run cancelled", id));
                return;
            }
            TurnFailure::ModelInputFormat { .. } | TurnFailure::Unclassified { .. } => {
                self.logger
                    .error(&format!("[RetryOrchestrator] [{}] turn failed: {}", id, error));
                StreamEvent::error(format!("Agent execution failed: {}", error))
            }
        };

        let _ = self.send(terminal).await;
    }

    async fn release(&self, staged: Vec<StreamEvent>) -> Result<(), Detached> {
        for event in staged {
            self.send(event).await?;
        }
        Ok(())
    }

    async fn send(&self, event: StreamEvent) -> Result<(), Detached> {
        self.tx.send(event).await.map_err(|_| Detached)?;
        if !self.policy.pacing.is_zero() {
            tokio::time::sleep(self.policy.pacing).await;
        }
        Ok(())
    }
}
