//! Environment-based engine configuration.

use std::env;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Classification engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Source locator for the rule document: `http(s)://...`, `file://...`,
    /// or a bare filesystem path.
    pub rule_chain_uri: Option<String>,
    /// Declared rule document format: `yaml` (default) or `json`.
    pub rule_chain_format: String,
}

impl EngineConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            rule_chain_uri: env_opt("RULE_CHAIN_URI"),
            rule_chain_format: env_or("RULE_CHAIN_FORMAT", "yaml"),
        }
    }

    /// Construct a config pointing at a fixed locator, mostly for tests.
    pub fn with_uri(uri: impl Into<String>) -> Self {
        Self {
            rule_chain_uri: Some(uri.into()),
            rule_chain_format: "yaml".to_string(),
        }
    }
}
