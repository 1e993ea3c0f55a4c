//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::SecretStore;

/// Mapping from model backend ids to environment variable names
static BACKEND_KEY_VARS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("openai", vec!["OPENAI_API_KEY"]);
    m.insert("anthropic", vec!["ANTHROPIC_API_KEY"]);
    m.insert("gemini", vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("mistral", vec!["MISTRAL_API_KEY"]);
    m.insert("azure", vec!["AZURE_API_KEY", "AZURE_OPENAI_API_KEY"]);
    m.insert("openrouter", vec!["OPENROUTER_API_KEY"]);
    m
});

/// Read-only secret store backed by the process environment
///
/// Lookup order for a key:
/// 1. the key as a variable name (`SLACK_BOT_TOKEN`)
/// 2. the variables conventionally used by a model backend (`openai` → `OPENAI_API_KEY`)
/// 3. `<KEY>_API_KEY`
///
/// Empty variables count as unset.
#[derive(Debug, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    fn non_empty(var: &str) -> Option<String> {
        env::var(var).ok().filter(|value| !value.is_empty())
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = Self::non_empty(key) {
            return Some(value);
        }

        if let Some(vars) = BACKEND_KEY_VARS.get(key.to_lowercase().as_str()) {
            if let Some(value) = vars.iter().find_map(|var| Self::non_empty(var)) {
                return Some(value);
            }
        }

        Self::non_empty(&format!("{}_API_KEY", key.to_uppercase()))
    }
}
