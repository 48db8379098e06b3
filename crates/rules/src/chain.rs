//! Rule chain: ordered note/match rules and the apply algorithm.

use std::fmt;

use assay_core::{Record, Value};
use tracing::debug;

use crate::error::{LogicFault, RuleLogicError, RuleSyntaxError};
use crate::expr::{truthy, Expr, Scope};
use crate::schema::{RuleKind, RuleSpec};

/// One compiled rule: kind, both compiled expressions, and the original
/// sources kept for diagnostics.
#[derive(Debug, Clone)]
pub struct Rule {
    pub kind: RuleKind,
    matcher: Expr,
    producer: Expr,
    pub match_src: String,
    pub value_src: String,
    pub description: Option<String>,
}

impl Rule {
    /// Compile a rule spec, verifying both expressions eagerly. A rule that
    /// reaches the chain can no longer fail to parse.
    pub fn compile(index: usize, spec: &RuleSpec) -> Result<Self, RuleSyntaxError> {
        let kind: RuleKind =
            spec.kind
                .parse()
                .map_err(|_| RuleSyntaxError::UnknownKind {
                    index,
                    kind: spec.kind.clone(),
                })?;
        let matcher =
            Expr::parse(&spec.match_expr).map_err(|detail| RuleSyntaxError::Expression {
                index,
                field: "match",
                detail,
            })?;
        let producer = Expr::parse(&spec.value).map_err(|detail| RuleSyntaxError::Expression {
            index,
            field: "value",
            detail,
        })?;
        Ok(Self {
            kind,
            matcher,
            producer,
            match_src: spec.match_expr.clone(),
            value_src: spec.value.clone(),
            description: spec.rule_description.clone(),
        })
    }

    /// Diagnostic label: the description when present, else the match source.
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.match_src)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} rule: {} -> {}>", self.kind, self.match_src, self.value_src)
    }
}

/// Successful chain application outcome. No-match is a first-class result,
/// distinct from both success and the error channels.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The first true match rule fired; its sanitized record value.
    Classified(Record),
    /// The chain was exhausted without any match rule firing.
    NoMatch,
}

impl Outcome {
    pub fn classified(self) -> Option<Record> {
        match self {
            Outcome::Classified(record) => Some(record),
            Outcome::NoMatch => None,
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, Outcome::NoMatch)
    }
}

/// Ordered, immutable-after-load sequence of rules.
///
/// A reload builds a brand-new chain; chains are never mutated in place, so
/// in-flight applications always see a consistent rule set.
#[derive(Debug, Clone)]
pub struct RuleChain {
    rules: Vec<Rule>,
}

impl RuleChain {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Apply the chain to a record.
    ///
    /// Rules run in document order against the record overlaid with the
    /// working context accumulated by earlier note rules. The first true
    /// match rule terminates with its value; note rules merge their record
    /// values into the working context (last note wins per key) and
    /// evaluation continues. Any evaluator fault aborts the whole call.
    /// The input record is never mutated.
    pub fn apply(&self, record: &Record) -> Result<Outcome, RuleLogicError> {
        let mut notes = Record::new();

        for (index, rule) in self.rules.iter().enumerate() {
            let scope = Scope::new(record, &notes);

            let matched = rule
                .matcher
                .eval(&scope)
                .map_err(|fault| logic_error(index, rule, fault.into()))?;
            if !truthy(&matched) {
                continue;
            }

            let value = rule
                .producer
                .eval(&scope)
                .map_err(|fault| logic_error(index, rule, fault.into()))?;

            match rule.kind {
                RuleKind::Match => {
                    let Value::Map(result) = value else {
                        return Err(logic_error(
                            index,
                            rule,
                            LogicFault::NotARecord {
                                got: value.type_name(),
                            },
                        ));
                    };
                    debug!(rule_index = index, rule = %rule.label(), "match rule fired");
                    return Ok(Outcome::Classified(result));
                }
                RuleKind::Note => {
                    let Value::Map(facts) = value else {
                        return Err(logic_error(
                            index,
                            rule,
                            LogicFault::NotARecord {
                                got: value.type_name(),
                            },
                        ));
                    };
                    for (key, fact) in facts {
                        notes.insert(key, fact);
                    }
                }
            }
        }

        Ok(Outcome::NoMatch)
    }

    /// Multi-line dump of the chain in document order, for diagnostics.
    pub fn describe(&self) -> String {
        let mut out = format!("rule chain with {} rules\n", self.rules.len());
        for (index, rule) in self.rules.iter().enumerate() {
            out.push_str(&format!("{}: {}\n", index, rule));
        }
        out
    }
}

fn logic_error(index: usize, rule: &Rule, fault: LogicFault) -> RuleLogicError {
    RuleLogicError {
        rule_index: index,
        rule: rule.label().to_string(),
        fault,
    }
}

// ── Tests ───────────────────────────────────────────────────────────
