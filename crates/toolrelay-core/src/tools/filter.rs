//! Per-user tool visibility
//!
//! Resolution order, first match wins:
//! 1. the identity has a scope token: keep tools whose name contains the
//!    token, or whose description contains `"| <token>"` (both
//!    case-insensitive). An empty result is final.
//! 2. the provider has an allow-list: keep tools named in it.
//! 3. otherwise: keep every tool.
//!
//! Every tier keeps the provider's order and drops repeated names.

use std::collections::{HashMap, HashSet};

use crate::config::VisibilityConfig;
use crate::types::{ToolDescriptor, UserIdentity};

/// Visibility rule for one provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserScopedFilter {
    scopes: HashMap<String, String>,
    allow_list: Option<Vec<String>>,
}

impl UserScopedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an identity to a scope token
    pub fn with_scope(mut self, identity: impl Into<String>, token: impl Into<String>) -> Self {
        self.scopes.insert(identity.into(), token.into());
        self
    }

    /// Restrict identities without a scope to these tool names
    pub fn with_allow_list(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allow_list = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Scope token for an identity, if any
    pub fn scope_for(&self, user: Option<&UserIdentity>) -> Option<&str> {
        user.and_then(|u| self.scopes.get(u.as_str()))
            .map(String::as_str)
    }

    /// Narrow `tools` to what `user` may see
    pub fn apply(&self, tools: Vec<ToolDescriptor>, user: Option<&UserIdentity>) -> Vec<ToolDescriptor> {
        if let Some(token) = self.scope_for(user) {
            let token = token.to_lowercase();
            let suffix = format!("| {}", token);
            return dedup_by_name(tools.into_iter().filter(|tool| {
                tool.name.to_lowercase().contains(&token)
                    || tool.description.to_lowercase().contains(&suffix)
            }));
        }

        if let Some(allowed) = &self.allow_list {
            let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
            return dedup_by_name(tools.into_iter().filter(|tool| allowed.contains(tool.name.as_str())));
        }

        dedup_by_name(tools.into_iter())
    }
}

impl From<&VisibilityConfig> for UserScopedFilter {
    fn from(config: &VisibilityConfig) -> Self {
        Self {
            scopes: config.scopes.clone(),
            allow_list: config.allow_list.clone(),
        }
    }
}

fn dedup_by_name(tools: impl Iterator<Item = ToolDescriptor>) -> Vec<ToolDescriptor> {
    let mut seen = HashSet::new();
    tools.filter(|tool| seen.insert(tool.name.clone())).collect()
}
