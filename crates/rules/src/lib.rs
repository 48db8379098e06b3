//! Assay-type classification rule engine.
//!
//! This crate provides:
//! - A small pure expression language (recursive-descent parser + tree
//!   walker) for rule match/value expressions
//! - Rule document loading with schema validation and eager expression
//!   compilation, all-or-nothing
//! - The ordered note/match rule chain and its apply algorithm
//! - A classification service holding the active chain behind an
//!   atomically swapped handle, with file/HTTP rule sources

pub mod chain;
pub mod error;
pub mod expr;
pub mod loader;
pub mod schema;
pub mod service;
pub mod source;

pub use chain::{Outcome, Rule, RuleChain};
pub use error::{
    ClassifyError, ConfigError, LogicFault, ReloadError, RuleLogicError, RuleSyntaxError,
    SourceError,
};
pub use loader::RuleLoader;
pub use schema::{RuleFormat, RuleKind, RuleSpec};
pub use service::ClassificationService;
pub use source::{source_for_locator, FileSource, HttpSource, RuleSource};
