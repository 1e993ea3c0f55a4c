//! Configuration data model
//!
//! ```yaml
//! agent:
//!   name: SlackAssistant
//!   model: gpt-4o
//!   max_turns: 32
//! servers:
//!   - name: hubspot
//!     transport:
//!       kind: stdio
//!       command: npx
//!       args: ["-y", "@hubspot/mcp-server"]
//!       secret_env:
//!         PRIVATE_APP_ACCESS_TOKEN: HUBSPOT_PRIVATE_APP_TOKEN
//!     timeout_secs: 120
//!   - name: personal
//!     transport:
//!       kind: http
//!       url: https://tools.example.com/{user}/mcp
//!       user_segments:
//!         U07G1UMQ64C: wouter
//!     cache_tools_list: true
//!     visibility:
//!       scopes:
//!         U07G1UMQ64C: wouter
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Instructions used when none are configured
pub const DEFAULT_INSTRUCTIONS: &str = "You are an AI assistant for a Slack workspace.\n\
Be concise, use Slack-style markdown, and solve the user's request.\n";

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub agent: AgentSettings,

    /// Tool provider servers, in the order their tools are offered
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl ConfigFile {
    /// Apply `AGENT_MODEL` and `AGENT_MAX_TURNS` from the environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("AGENT_MODEL").filter(|m| !m.trim().is_empty()) {
            self.agent.model = model.trim().to_string();
        }
        if let Some(turns) = lookup("AGENT_MAX_TURNS").and_then(|t| t.trim().parse::<u32>().ok()) {
            if turns > 0 {
                self.agent.max_turns = turns;
            }
        }
    }
}

/// Agent and model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Agent name, shown in tool-not-found diagnostics
    pub name: String,
    /// Model backend id (`openai`, `anthropic`, `ollama`, `mock`, ...)
    pub provider: String,
    /// Model id passed to the backend
    pub model: String,
    /// Override the backend endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Inline system instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Path to a file holding the system instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions_file: Option<PathBuf>,
    /// Upper bound on model turns per request
    pub max_turns: u32,
    /// Retries on the duplicated-tool-name failure
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// How events of a retryable attempt reach the caller
    pub retry_staging: RetryStaging,
    /// Delay after each emitted event
    pub pacing_ms: u64,
}

/// Delivery of events from an attempt that may still be retried
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStaging {
    /// Stream events as they arrive. An attempt that has emitted anything is
    /// final: a duplicated-tool-name failure after that ends the turn
    /// instead of retrying.
    #[default]
    Live,
    /// Hold back every event of an attempt that may still be retried and
    /// release it when the attempt ends. The last permitted attempt streams
    /// live. Retries are always taken, but the caller sees nothing until
    /// the attempt finishes.
    Attempt,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: "SlackAssistant".to_string(),
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_base: None,
            instructions: None,
            instructions_file: None,
            max_turns: 32,
            max_retries: 2,
            retry_backoff_ms: 500,
            retry_staging: RetryStaging::Live,
            pacing_ms: 10,
        }
    }
}

impl AgentSettings {
    /// Resolve the system instructions: inline text, then file, then default
    pub fn resolve_instructions(&self) -> std::io::Result<String> {
        if let Some(text) = self.instructions.as_ref().filter(|t| !t.trim().is_empty()) {
            return Ok(text.clone());
        }
        if let Some(path) = &self.instructions_file {
            return std::fs::read_to_string(path);
        }
        Ok(DEFAULT_INSTRUCTIONS.to_string())
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

/// One configured tool provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Stable provider name
    pub name: String,
    pub transport: TransportConfig,
    /// Keep the listed tools between requests (invalidated at the start of each request)
    #[serde(default)]
    pub cache_tools_list: bool,
    /// Connect/session timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub visibility: VisibilityConfig,
}

fn default_timeout_secs() -> u64 {
    60
}

impl ServerConfig {
    /// Create a server config with default timeout and no visibility rule
    pub fn new(name: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            name: name.into(),
            transport,
            cache_tools_list: false,
            timeout_secs: default_timeout_secs(),
            visibility: VisibilityConfig::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// How to reach a tool provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Streamable HTTP; `url` may contain a `{user}` placeholder
    Http {
        url: String,
        /// Identity → path segment substituted for `{user}`
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        user_segments: HashMap<String, String>,
        /// Segment used when the identity has no mapping
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_segment: Option<String>,
        /// Secret holding a bearer token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_token_secret: Option<String>,
    },
    /// Child process speaking MCP over stdin/stdout
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        /// Literal environment for the child
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        env: HashMap<String, String>,
        /// Child variable → secret name
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        secret_env: HashMap<String, String>,
    },
    /// Unix domain socket
    Unix { path: PathBuf },
}

impl TransportConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::Http { .. } => "http",
            TransportConfig::Stdio { .. } => "stdio",
            TransportConfig::Unix { .. } => "unix",
        }
    }
}

/// Which of a provider's tools each identity may see
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibilityConfig {
    /// Identity → scope token
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub scopes: HashMap<String, String>,
    /// Tool names visible to identities without a scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_list: Option<Vec<String>>,
}

impl VisibilityConfig {
    pub fn is_unrestricted(&self) -> bool {
        self.scopes.is_empty() && self.allow_list.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
agent:
  model: gpt-4o-mini
servers:
  - name: hubspot
    transport:
      kind: stdio
      command: npx
      args: ["-y", "@hubspot/mcp-server"]
      secret_env:
        PRIVATE_APP_ACCESS_TOKEN: HUBSPOT_PRIVATE_APP_TOKEN
    timeout_secs: 120
  - name: personal
    transport:
      kind: http
      url: https://tools.example.com/{user}/mcp
      user_segments:
        U07G1UMQ64C: wouter
    cache_tools_list: true
    visibility:
      scopes:
        U07G1UMQ64C: wouter
      allow_list: [search]
"#;

    #[test]
    fn test_parse_sample() {
        let config: ConfigFile = serde_yaml::from_str(SAMPLE).unwrap();

        assert_eq!(config.agent.model, "gpt-4o-mini");
        assert_eq!(config.agent.name, "SlackAssistant");
        assert_eq!(config.agent.max_turns, 32);
        assert_eq!(config.servers.len(), 2);

        let hubspot = &config.servers[0];
        assert_eq!(hubspot.transport.kind(), "stdio");
        assert_eq!(hubspot.timeout(), Duration::from_secs(120));
        assert!(!hubspot.cache_tools_list);
        assert!(hubspot.visibility.is_unrestricted());

        let personal = &config.servers[1];
        assert_eq!(personal.timeout_secs, 60);
        assert!(personal.cache_tools_list);
        assert_eq!(
            personal.visibility.scopes.get("U07G1UMQ64C").map(String::as_str),
            Some("wouter")
        );
        assert_eq!(personal.visibility.allow_list, Some(vec!["search".to_string()]));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config: ConfigFile = serde_yaml::from_str(SAMPLE).unwrap();
        let text = serde_yaml::to_string(&config).unwrap();
        let again: ConfigFile = serde_yaml::from_str(&text).unwrap();
        assert_eq!(config, again);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ConfigFile::default();
        config.apply_overrides(|key| match key {
            "AGENT_MODEL" => Some("gpt-4.1".to_string()),
            "AGENT_MAX_TURNS" => Some("12".to_string()),
            _ => None,
        });
        assert_eq!(config.agent.model, "gpt-4.1");
        assert_eq!(config.agent.max_turns, 12);

        config.apply_overrides(|key| match key {
            "AGENT_MAX_TURNS" => Some("many".to_string()),
            _ => None,
        });
        assert_eq!(config.agent.max_turns, 12);
    }

    #[test]
    fn test_instructions_resolution() {
        let mut agent = AgentSettings::default();
        assert_eq!(agent.resolve_instructions().unwrap(), DEFAULT_INSTRUCTIONS);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        std::fs::write(&path, "Answer in Dutch.").unwrap();
        agent.instructions_file = Some(path);
        assert_eq!(agent.resolve_instructions().unwrap(), "Answer in Dutch.");

        agent.instructions = Some("Inline wins.".to_string());
        assert_eq!(agent.resolve_instructions().unwrap(), "Inline wins.");
    }
}
