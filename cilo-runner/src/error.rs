//! Error types for the Cilo runner

use cilo_core::ConfigError;
use thiserror::Error;

/// Errors reported by a container runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime command could not be started
    #[error("Failed to execute '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The runtime command ran and reported failure
    #[error("'{command}' exited with status {}: {stderr}", exit_code_text(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A pull progress line could not be decoded
    #[error("Failed to decode pull progress")]
    Decode(#[from] serde_json::Error),

    /// The registry reported an error in the pull stream
    #[error("Registry error: {0}")]
    Registry(String),

    /// The handle does not refer to a container this runtime is tracking
    #[error("Unknown container: {0}")]
    UnknownContainer(String),

    /// Reading from or waiting on the runtime process failed
    #[error("I/O error talking to the container runtime")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a job run, tagged with the stage that failed
#[derive(Debug, Error)]
pub enum JobError {
    /// Job resolution or validation failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The image could not be pulled
    #[error("Failed to pull image '{image}'")]
    Pull {
        image: String,
        #[source]
        source: RuntimeError,
    },

    /// The container could not be created
    #[error("Failed to provision container")]
    Provision(#[source] RuntimeError),

    /// Starting, attaching to or waiting on the container failed
    #[error("Failed to run container")]
    Run(#[source] RuntimeError),

    /// The job script exited unsuccessfully
    #[error("Job script failed with exit code {}", exit_code_text(.code))]
    ScriptFailed { code: Option<i32> },

    /// Host-side file or stream handling failed
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl JobError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Short name of the stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            JobError::Config(_) => "resolution",
            JobError::Pull { .. } => "pull",
            JobError::Provision(_) => "provisioning",
            JobError::Run(_) | JobError::ScriptFailed { .. } => "execution",
            JobError::Io { .. } => "io",
        }
    }

    /// Process exit code to report for this error
    ///
    /// A failed script propagates its own non-zero code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            JobError::ScriptFailed { code: Some(code) } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn exit_code_text(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (terminated by signal)".to_string(), |c| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(
            JobError::from(ConfigError::JobNotFound("x".to_string())).stage(),
            "resolution"
        );
        assert_eq!(
            JobError::Pull {
                image: "alpine".to_string(),
                source: RuntimeError::Registry("denied".to_string()),
            }
            .stage(),
            "pull"
        );
        assert_eq!(JobError::ScriptFailed { code: Some(2) }.stage(), "execution");
    }

    #[test]
    fn test_exit_code() {
        assert_eq!(JobError::ScriptFailed { code: Some(3) }.exit_code(), 3);
        assert_eq!(JobError::ScriptFailed { code: None }.exit_code(), 1);
        assert_eq!(
            JobError::Provision(RuntimeError::UnknownContainer("c".to_string())).exit_code(),
            1
        );
    }

    #[test]
    fn test_messages() {
        let err = RuntimeError::CommandFailed {
            command: "docker pull nope".to_string(),
            code: Some(1),
            stderr: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "'docker pull nope' exited with status 1: not found");

        let err = JobError::ScriptFailed { code: None };
        assert!(err.to_string().contains("terminated by signal"));
    }
}
