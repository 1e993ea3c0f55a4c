//! Errors raised by tool providers

use thiserror::Error;

/// Failure to establish a session with a tool provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Provider {provider}: connect timed out after {seconds}s")]
    Timeout { provider: String, seconds: u64 },

    #[error("Provider {provider}: no endpoint for user {user}")]
    NoTargetForUser { provider: String, user: String },

    #[error("Provider {provider}: {message}")]
    Transport { provider: String, message: String },
}

impl ConnectionError {
    pub fn transport(provider: impl Into<String>, message: impl ToString) -> Self {
        ConnectionError::Transport {
            provider: provider.into(),
            message: message.to_string(),
        }
    }
}

/// Failure of a single tool invocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocationError {
    /// The provider ran the tool and reported an error
    #[error("Tool {tool} failed: {message}")]
    Failed { tool: String, message: String },

    /// The session went away mid-call
    #[error("Connection to {provider} lost: {message}")]
    ConnectionLost { provider: String, message: String },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

impl ToolInvocationError {
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, ToolInvocationError::ConnectionLost { .. })
    }
}
