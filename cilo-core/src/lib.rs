//! Cilo Core
//!
//! Core types and pure logic for running a single CI job locally.
//!
//! This crate contains:
//! - Domain types: pipeline, job definitions and resolved jobs
//! - Parser: YAML document to typed pipeline, validated once
//! - Resolver: walks the `extends` chain and merges inherited fields
//! - Assemblers: environment entries and the executable script body
//! - Mirror handling for image references

pub mod domain;
pub mod env;
pub mod error;
pub mod mirror;
pub mod parser;
pub mod resolver;
pub mod script;

pub use domain::job::{JobDefinition, Phase, ResolvedJob, ScriptPhase, VariableSource};
pub use domain::pipeline::{Pipeline, PipelineEntry};
pub use error::ConfigError;
pub use parser::parse_pipeline;
pub use resolver::resolve;
