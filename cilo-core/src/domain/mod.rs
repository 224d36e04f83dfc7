//! Core domain types
//!
//! A pipeline document is parsed into these structures once; everything
//! downstream (resolution, script assembly, container provisioning) works
//! on typed values instead of raw YAML.

pub mod job;
pub mod pipeline;
