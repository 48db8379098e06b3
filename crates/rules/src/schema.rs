//! Rule document schema types with serde deserialization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One entry of the rule document, exactly as persisted.
///
/// The document is an ordered list of these. Unknown fields are rejected so
/// that typos (`mach`, `rule_descripton`) fail loading instead of being
/// silently ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Rule kind: `note` or `match`, case-insensitive.
    #[serde(rename = "type")]
    pub kind: String,
    /// Boolean match expression source.
    #[serde(rename = "match")]
    pub match_expr: String,
    /// Value expression source; must produce a record.
    pub value: String,
    /// Human-readable description, used only for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_description: Option<String>,
}

/// Rule kind: note rules accumulate facts, match rules terminate the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    Note,
    Match,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Note => write!(f, "note"),
            RuleKind::Match => write!(f, "match"),
        }
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "note" => Ok(RuleKind::Note),
            "match" => Ok(RuleKind::Match),
            other => Err(format!("unknown rule type: '{}'", other)),
        }
    }
}

/// Declared serialization format of a rule document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleFormat {
    #[default]
    Yaml,
    Json,
}

impl fmt::Display for RuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleFormat::Yaml => write!(f, "yaml"),
            RuleFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for RuleFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(RuleFormat::Yaml),
            "json" => Ok(RuleFormat::Json),
            other => Err(format!("unknown rule format: '{}'", other)),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────
