//! Container runtime capability
//!
//! The runner never talks to a container engine directly; it goes through
//! [`ContainerRuntime`]. The production implementation drives the `docker`
//! or `podman` command line ([`CliRuntime`]).

mod cli;
#[cfg(test)]
pub(crate) mod fake;

pub use cli::CliRuntime;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;

use crate::error::RuntimeError;

/// One decoded line of an image pull
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProgressEvent {
    pub status: String,
    pub progress: String,
}

impl ProgressEvent {
    pub fn new(status: impl Into<String>, progress: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            progress: progress.into(),
        }
    }
}

/// Stream of pull progress
///
/// The stream ends when the pull ends. An `Err` item is the pull's
/// terminal error.
pub struct ProgressStream {
    receiver: mpsc::Receiver<Result<ProgressEvent, RuntimeError>>,
}

impl ProgressStream {
    /// Creates a stream fed through the returned sender
    pub fn channel(buffer: usize) -> (mpsc::Sender<Result<ProgressEvent, RuntimeError>>, Self) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (sender, Self { receiver })
    }

    /// Creates an already complete stream from a list of items
    pub fn from_items(items: Vec<Result<ProgressEvent, RuntimeError>>) -> Self {
        let (sender, stream) = Self::channel(items.len());
        for item in items {
            // Capacity covers every item, and the receiver is alive.
            let _ = sender.try_send(item);
        }
        stream
    }

    /// Receives the next item, or `None` once the pull is over
    pub async fn next(&mut self) -> Option<Result<ProgressEvent, RuntimeError>> {
        self.receiver.recv().await
    }
}

/// Bind mount from the host into a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

/// Everything needed to create a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    /// `KEY=VALUE` entries
    pub env: Vec<String>,
    pub working_dir: String,
    pub mounts: Vec<Mount>,
}

/// A created container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
}

/// Output streams of a started container
pub struct AttachedOutput {
    pub stdout: Box<dyn AsyncRead + Send + Unpin>,
    pub stderr: Box<dyn AsyncRead + Send + Unpin>,
}

/// How the container's main process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Container runtime operations used to run a job
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Returns a human-readable runtime version, failing if the runtime is unusable
    async fn version(&self) -> Result<String, RuntimeError>;

    /// Starts pulling an image and returns its progress stream
    async fn pull_image(&self, reference: &str) -> Result<ProgressStream, RuntimeError>;

    /// Creates (but does not start) a container
    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerHandle, RuntimeError>;

    /// Starts a container and attaches to its stdout and stderr
    async fn start(&self, handle: &ContainerHandle) -> Result<AttachedOutput, RuntimeError>;

    /// Waits for a started container to exit
    async fn wait(&self, handle: &ContainerHandle) -> Result<ExitStatus, RuntimeError>;

    /// Force-removes a container
    async fn remove(&self, handle: &ContainerHandle) -> Result<(), RuntimeError>;
}
