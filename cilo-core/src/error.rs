//! Error types for pipeline parsing and job resolution

use thiserror::Error;

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading a pipeline or resolving a job
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid YAML
    #[error("Failed to parse pipeline document: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document's top level is not a mapping of job names
    #[error("Pipeline document must be a mapping of job names to job definitions")]
    NotAMapping,

    /// The requested job does not exist
    #[error("Reference not found: {0}")]
    JobNotFound(String),

    /// An `extends` field names a job that does not exist
    #[error("Job '{job}' extends unknown job '{parent}'")]
    UnknownParent { job: String, parent: String },

    /// The named entry exists but its body is not a mapping
    #[error("Entry '{0}' is not a job definition")]
    NotAJob(String),

    /// The `extends` chain loops back on itself
    #[error("Cyclic extends chain: {}", .chain.join(" -> "))]
    CyclicExtends { chain: Vec<String> },

    /// The resolved job has no image to run
    #[error("Missing Docker image for job '{job}'")]
    MissingImage { job: String },

    /// A job field has an unexpected shape
    #[error("Job '{job}': field '{field}' must be {expected}")]
    InvalidField {
        job: String,
        field: String,
        expected: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid_field(
        job: impl Into<String>,
        field: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::InvalidField {
            job: job.into(),
            field: field.into(),
            expected,
        }
    }
}
