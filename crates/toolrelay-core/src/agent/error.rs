//! Agent run errors

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::providers::ProviderError;

static TOOL_NOT_FOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Tool\s+(\S+)\s+not found in agent").expect("valid regex"));

/// Failure of one agent run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunError {
    /// The model did something the agent cannot act on
    #[error("{0}")]
    ModelBehavior(String),

    /// The assembled request was rejected before any output was produced
    #[error("model rejected the request: {0}")]
    InputFormat(String),

    /// A stream to a tool provider closed mid-turn
    #[error("connection to {provider} lost: {message}")]
    ConnectionLost { provider: String, message: String },

    #[error("max turns ({0}) exceeded")]
    MaxTurnsExceeded(u32),

    #[error("run cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl RunError {
    /// `ModelBehavior` failure for a tool the agent does not offer
    pub fn tool_not_found(tool: &str, agent: &str) -> Self {
        RunError::ModelBehavior(format!("Tool {} not found in agent {}", tool, agent))
    }
}

impl From<ProviderError> for RunError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Cancelled => RunError::Cancelled,
            e if e.is_input_format() => RunError::InputFormat(e.to_string()),
            e => RunError::Other(e.to_string()),
        }
    }
}

pub type RunResult<T> = Result<T, RunError>;

/// How a failed turn is reported and whether it may be retried
#[derive(Debug, Clone, PartialEq)]
pub enum TurnFailure {
    /// The model named a tool that does not resolve
    DuplicateToolName { tool: String, message: String },
    ModelInputFormat { message: String },
    StreamConnectionLost { provider: String, message: String },
    Cancelled,
    Unclassified { message: String },
}

impl TurnFailure {
    pub fn classify(error: &RunError) -> Self {
        match error {
            RunError::ModelBehavior(message) if message.contains("not found in agent") => {
                TurnFailure::DuplicateToolName {
                    tool: extract_tool_name(message).unwrap_or_else(|| "unknown".to_string()),
                    message: message.clone(),
                }
            }
            RunError::InputFormat(message) => TurnFailure::ModelInputFormat {
                message: message.clone(),
            },
            RunError::ConnectionLost { provider, .. } => TurnFailure::StreamConnectionLost {
                provider: provider.clone(),
                message: error.to_string(),
            },
            RunError::Cancelled => TurnFailure::Cancelled,
            other => TurnFailure::Unclassified {
                message: other.to_string(),
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, TurnFailure::DuplicateToolName { .. })
    }
}

/// Tool name from a `Tool <name> not found in agent` message
pub fn extract_tool_name(message: &str) -> Option<String> {
    TOOL_NOT_FOUND
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
