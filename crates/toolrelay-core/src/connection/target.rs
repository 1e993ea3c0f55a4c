//! Per-request endpoint resolution

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::ConnectionError;
use crate::config::TransportConfig;
use crate::logging::Logger;
use crate::secrets::{secret_or_empty, SecretStore};
use crate::types::RequestContext;

/// Placeholder in HTTP URLs replaced with the user's segment
pub const USER_PLACEHOLDER: &str = "{user}";

/// Where a provider lives, with secrets already looked up
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionTarget {
    Http {
        url: String,
        user_segments: HashMap<String, String>,
        default_segment: Option<String>,
        bearer_token: Option<String>,
    },
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
    Unix {
        path: PathBuf,
    },
}

/// A concrete endpoint for one request
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Http {
        url: String,
        bearer_token: Option<String>,
    },
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
    Unix {
        path: PathBuf,
    },
}

impl Endpoint {
    /// Sessions are shared between requests that resolve to the same key
    pub fn key(&self) -> String {
        match self {
            Endpoint::Http { url, .. } => url.clone(),
            Endpoint::Stdio { command, args, .. } => format!("stdio:{} {}", command, args.join(" ")),
            Endpoint::Unix { path } => format!("unix:{}", path.display()),
        }
    }
}

impl ConnectionTarget {
    /// Build a target from configuration, looking up every referenced secret.
    /// Missing secrets are logged and replaced with empty strings.
    pub fn from_config(
        provider: &str,
        transport: &TransportConfig,
        secrets: &Arc<dyn SecretStore>,
        logger: &Arc<dyn Logger>,
    ) -> Self {
        match transport {
            TransportConfig::Http {
                url,
                user_segments,
                default_segment,
                auth_token_secret,
            } => ConnectionTarget::Http {
                url: url.clone(),
                user_segments: user_segments.clone(),
                default_segment: default_segment.clone(),
                bearer_token: auth_token_secret
                    .as_deref()
                    .map(|key| secret_or_empty(secrets, key, provider, logger))
                    .filter(|token| !token.is_empty()),
            },
            TransportConfig::Stdio {
                command,
                args,
                env,
                secret_env,
            } => {
                let mut resolved = env.clone();
                for (var, key) in secret_env {
                    resolved.insert(var.clone(), secret_or_empty(secrets, key, provider, logger));
                }
                ConnectionTarget::Stdio {
                    command: command.clone(),
                    args: args.clone(),
                    env: resolved,
                }
            }
            TransportConfig::Unix { path } => ConnectionTarget::Unix { path: path.clone() },
        }
    }

    /// Derive the endpoint for this request's user
    pub fn resolve(&self, provider: &str, ctx: &RequestContext) -> Result<Endpoint, ConnectionError> {
        match self {
            ConnectionTarget::Http {
                url,
                user_segments,
                default_segment,
                bearer_token,
            } => {
                let url = if url.contains(USER_PLACEHOLDER) {
                    let segment = ctx
                        .user
                        .as_ref()
                        .and_then(|user| user_segments.get(user.as_str()))
                        .or(default_segment.as_ref())
                        .ok_or_else(|| ConnectionError::NoTargetForUser {
                            provider: provider.to_string(),
                            user: ctx.user_str().to_string(),
                        })?;
                    url.replace(USER_PLACEHOLDER, segment)
                } else {
                    url.clone()
                };
                Ok(Endpoint::Http {
                    url,
                    bearer_token: bearer_token.clone(),
                })
            }
            ConnectionTarget::Stdio { command, args, env } => Ok(Endpoint::Stdio {
                command: command.clone(),
                args: args.clone(),
                env: env.clone(),
            }),
            ConnectionTarget::Unix { path } => Ok(Endpoint::Unix { path: path.clone() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryLogger;
    use crate::secrets::MemorySecretStore;
    use crate::types::UserIdentity;

    fn personal_target() -> ConnectionTarget {
        let mut user_segments = HashMap::new();
        user_segments.insert("U07G1UMQ64C".to_string(), "wouter".to_string());
        user_segments.insert("U08K4SFL5LP".to_string(), "leonie".to_string());
        ConnectionTarget::Http {
            url: "https://tools.example.com/{user}/mcp".to_string(),
            user_segments,
            default_segment: None,
            bearer_token: None,
        }
    }

    #[test]
    fn test_resolve_uses_request_user() {
        let target = personal_target();
        let wouter = RequestContext::new(UserIdentity::new("U07G1UMQ64C"));
        let leonie = RequestContext::new(UserIdentity::new("U08K4SFL5LP"));

        let a = target.resolve("personal", &wouter).unwrap();
        let b = target.resolve("personal", &leonie).unwrap();
        assert_eq!(a.key(), "https://tools.example.com/wouter/mcp");
        assert_eq!(b.key(), "https://tools.example.com/leonie/mcp");
    }

    #[test]
    fn test_resolve_unknown_user() {
        let target = personal_target();
        let stranger = RequestContext::new(UserIdentity::new("U000"));
        assert_eq!(
            target.resolve("personal", &stranger),
            Err(ConnectionError::NoTargetForUser {
                provider: "personal".to_string(),
                user: "U000".to_string(),
            })
        );

        let ConnectionTarget::Http { url, user_segments, bearer_token, .. } = target else {
            unreachable!()
        };
        let with_default = ConnectionTarget::Http {
            url,
            user_segments,
            default_segment: Some("shared".to_string()),
            bearer_token,
        };
        let endpoint = with_default.resolve("personal", &RequestContext::anonymous()).unwrap();
        assert_eq!(endpoint.key(), "https://tools.example.com/shared/mcp");
    }

    #[test]
    fn test_from_config_resolves_secrets() {
        let memory = Arc::new(MemoryLogger::new());
        let logger: Arc<dyn Logger> = memory.clone();
        let secrets: Arc<dyn SecretStore> =
            Arc::new(MemorySecretStore::new().with("SLACK_BOT_TOKEN", "xoxb-1"));

        let mut secret_env = HashMap::new();
        secret_env.insert("SLACK_BOT_TOKEN".to_string(), "SLACK_BOT_TOKEN".to_string());
        secret_env.insert("SLACK_TEAM_ID".to_string(), "SLACK_TEAM_ID".to_string());
        let transport = TransportConfig::Stdio {
            command: "npx".to_string(),
            args: vec!["-y".to_string()],
            env: HashMap::new(),
            secret_env,
        };

        let target = ConnectionTarget::from_config("slack", &transport, &secrets, &logger);
        let ConnectionTarget::Stdio { env, .. } = target else {
            panic!("expected stdio target");
        };
        assert_eq!(env.get("SLACK_BOT_TOKEN").map(String::as_str), Some("xoxb-1"));
        assert_eq!(env.get("SLACK_TEAM_ID").map(String::as_str), Some(""));
        assert!(memory.contains("warn", "SLACK_TEAM_ID"));
    }

    #[test]
    fn test_http_without_placeholder() {
        let target = ConnectionTarget::Http {
            url: "https://crm.example.com/mcp".to_string(),
            user_segments: HashMap::new(),
            default_segment: None,
            bearer_token: Some("t".to_string()),
        };
        let endpoint = target.resolve("crm", &RequestContext::anonymous()).unwrap();
        assert_eq!(
            endpoint,
            Endpoint::Http {
                url: "https://crm.example.com/mcp".to_string(),
                bearer_token: Some("t".to_string()),
            }
        );
    }
}
