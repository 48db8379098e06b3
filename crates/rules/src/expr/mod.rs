//! Match-expression language: parser and pure evaluator.
//!
//! A small side-effect-free language over metadata records. Expressions are
//! parsed once at rule-load time into an immutable [`Expr`] tree; evaluation
//! is a pure tree walk over a [`Scope`] (record plus note overlay). Missing
//! identifiers resolve to null, never an error; runtime shape mismatches
//! surface as [`EvalFault`]s for the chain to wrap.
//!
//! Grammar, loosest to tightest binding:
//! `or` → `and` → `not` → comparison (`==` `!=` `<` `<=` `>` `>=` `in`
//! `not in` `=~` `=~~`) → `+` → unary `-` → postfix (`[i]`, `.accessor`)
//! → literals, identifiers, `[...]` lists, `{'k': v}` records, parens.

mod eval;
mod parser;
mod token;

use std::fmt;

use assay_core::Value;

pub use eval::{truthy, EvalFault, Scope};

/// Parse error for a rule expression, reported at load time only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (offset {offset})")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    /// `=~` — pattern must cover the whole string.
    RegexMatch,
    /// `=~~` — pattern may match anywhere.
    RegexSearch,
    Add,
}

impl BinaryOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::RegexMatch => "=~",
            BinaryOp::RegexSearch => "=~~",
            BinaryOp::Add => "+",
        }
    }
}

/// Immutable expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    List(Vec<Expr>),
    /// Record literal; keys are expressions that must evaluate to strings.
    Map(Vec<(Expr, Expr)>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// Derived accessor on a scalar, e.g. `version.to_str`.
    Accessor {
        base: Box<Expr>,
        name: String,
    },
}

impl Expr {
    /// Parse an expression source string.
    pub fn parse(src: &str) -> Result<Expr, ParseError> {
        parser::parse(src)
    }

    /// Evaluate against a scope. Pure: no mutation, no I/O.
    pub fn eval(&self, scope: &Scope<'_>) -> Result<Value, EvalFault> {
        eval::eval(self, scope)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Ident(name) => f.write_str(name),
            Expr::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Expr::Map(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => write!(f, "not {}", operand),
                UnaryOp::Neg => write!(f, "-{}", operand),
            },
            Expr::Binary { op, lhs, rhs } => {
                write!(f, "({} {} {})", lhs, op.symbol(), rhs)
            }
            Expr::Index { base, index } => write!(f, "{}[{}]", base, index),
            Expr::Accessor { base, name } => write!(f, "{}.{}", base, name),
        }
    }
}
