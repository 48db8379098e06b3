//! Error taxonomy for the classification engine.
//!
//! Three distinct channels, never conflated:
//! - [`RuleSyntaxError`] — the rule document itself is bad; raised at load
//!   time, always prevents chain replacement.
//! - [`RuleLogicError`] — a loaded rule failed against one specific record;
//!   aborts that `apply` call only.
//! - No-match is *not* an error; it is the `Outcome::NoMatch` variant.

use std::path::PathBuf;

use crate::expr::{EvalFault, ParseError};
use crate::schema::RuleFormat;

/// The rule document is malformed, schema-violating, or contains an
/// unparsable expression. Loading is all-or-nothing: any of these means no
/// chain is produced.
#[derive(Debug, thiserror::Error)]
pub enum RuleSyntaxError {
    /// The bytes do not deserialize under the declared format.
    #[error("rule document is not valid {format}: {detail}")]
    Parse { format: RuleFormat, detail: String },

    /// The document deserialized but is not a list of rule entries.
    #[error("rule document must be a list of rule entries, got {0}")]
    NotAList(&'static str),

    /// One entry does not match the rule schema.
    #[error("rule entry {index} does not match the rule schema: {detail}")]
    Entry { index: usize, detail: String },

    /// One entry declares a rule type other than `note`/`match`.
    #[error("rule entry {index} has unknown rule type '{kind}'")]
    UnknownKind { index: usize, kind: String },

    /// One entry's `match` or `value` expression does not parse.
    #[error("rule entry {index}: `{field}` expression is invalid: {detail}")]
    Expression {
        index: usize,
        field: &'static str,
        #[source]
        detail: ParseError,
    },
}

/// A syntactically valid rule failed at evaluation time against a specific
/// record. Identifies the offending rule; the shared chain is unaffected.
#[derive(Debug, thiserror::Error)]
#[error("rule {rule_index} ({rule}): {fault}")]
pub struct RuleLogicError {
    /// Position of the offending rule in document order.
    pub rule_index: usize,
    /// The rule's description, or its match expression when undescribed.
    pub rule: String,
    pub fault: LogicFault,
}

/// What went wrong inside one rule application.
#[derive(Debug, thiserror::Error)]
pub enum LogicFault {
    #[error(transparent)]
    Eval(#[from] EvalFault),

    /// A rule's value expression produced a non-record where a record is
    /// required (always for notes, and at the terminal match step).
    #[error("value expression produced {got}, expected a record")]
    NotARecord { got: &'static str },
}

/// Failure fetching the rule document from its source locator.
/// Propagated unchanged; the engine neither interprets nor retries these.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read rule document from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch rule document from {uri}: {source}")]
    Http {
        uri: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Reload outcome: either the fetch failed or the document was rejected.
/// In both cases the previously active chain stays in place.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Syntax(#[from] RuleSyntaxError),
}

/// Classification failure: the implicit initial load failed, or a rule
/// misbehaved against this record.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Reload(#[from] ReloadError),

    #[error(transparent)]
    Logic(#[from] RuleLogicError),
}

/// Service construction failure from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("RULE_CHAIN_URI is not configured")]
    MissingUri,

    #[error("unknown rule chain format '{0}'")]
    UnknownFormat(String),
}
