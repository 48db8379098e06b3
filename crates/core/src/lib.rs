//! Shared types for the assay classification engine.
//!
//! This crate provides:
//! - `Value`: the closed value variant all metadata records are built from
//! - `Record` helpers, including digit-string normalization
//! - `Entity` and the metadata builder that feeds the rule chain
//! - Environment-based engine configuration

pub mod config;
pub mod entity;
pub mod value;

pub use config::EngineConfig;
pub use entity::*;
pub use value::*;
