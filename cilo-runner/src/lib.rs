//! Cilo Runner
//!
//! Executes a resolved job inside a container.
//!
//! Architecture:
//! - Configuration: tool settings (container binary, registry mirrors)
//! - Runtime: the container runtime capability and its CLI implementation
//! - Services: image pulling with progress rendering, the script
//!   artifact, output relaying and the job execution pipeline

pub mod config;
pub mod error;
pub mod runtime;
pub mod service;

pub use config::Config;
pub use error::{JobError, RuntimeError};
pub use runtime::{CliRuntime, ContainerRuntime};
pub use service::{JobExecutor, OutputSinks};
