//! Request-scoped context
//!
//! The end-user identity travels with the call chain inside a
//! [`RequestContext`] rather than through any shared slot, so concurrent
//! requests for different users cannot observe each other's identity.

use serde::{Deserialize, Serialize};

use super::cancellation::CancellationToken;

/// Opaque end-user identity, valid for one request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(String);

impl UserIdentity {
    /// Wrap an identity string; blank identities are treated as absent
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Values bound to one inbound request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The end user the request is made on behalf of, if known
    pub user: Option<UserIdentity>,
    /// Correlation id used in log lines
    pub request_id: String,
    /// Cancelled when the caller goes away
    pub cancel: CancellationToken,
}

impl RequestContext {
    /// Create a context with a fresh request id and cancellation token
    pub fn new(user: Option<UserIdentity>) -> Self {
        Self {
            user,
            request_id: uuid::Uuid::new_v4().simple().to_string(),
            cancel: CancellationToken::new(),
        }
    }

    /// Context with no user, used for startup work such as warm-up
    pub fn anonymous() -> Self {
        Self::new(None)
    }

    /// Short form of the request id for log prefixes
    pub fn short_id(&self) -> &str {
        let end = self.request_id.len().min(8);
        &self.request_id[..end]
    }

    pub fn user_str(&self) -> &str {
        self.user.as_ref().map(UserIdentity::as_str).unwrap_or("-")
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_trims_and_rejects_blank() {
        assert_eq!(UserIdentity::new("  U123 ").unwrap().as_str(), "U123");
        assert!(UserIdentity::new("   ").is_none());
        assert!(UserIdentity::new("").is_none());
    }

    #[test]
    fn test_contexts_are_independent() {
        let a = RequestContext::new(UserIdentity::new("alice"));
        let b = RequestContext::new(UserIdentity::new("bob"));

        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.short_id().len(), 8);

        a.cancel.cancel();
        assert!(!b.cancel.is_cancelled());
        assert_eq!(a.user_str(), "alice");
        assert_eq!(RequestContext::anonymous().user_str(), "-");
    }
}
