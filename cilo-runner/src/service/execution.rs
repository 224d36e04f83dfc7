//! Job execution service
//!
//! Runs a resolved job end to end:
//! - strips the configured registry mirror from the job's image
//! - pulls the image, rendering progress
//! - writes the assembled script to a temporary file
//! - creates a container with the job's environment, the repository
//!   bound at the working directory and the script bound read-only
//! - starts it, relays stdout and stderr line by line, waits for exit
//! - removes the container
//!
//! Any failure aborts the run. A non-zero exit of the script is a failure.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cilo_core::ResolvedJob;
use cilo_core::env::dedup_first_wins;
use cilo_core::mirror::strip_mirror;
use cilo_core::script::assemble_script;

use crate::config::Config;
use crate::error::JobError;
use crate::runtime::{
    AttachedOutput, ContainerHandle, ContainerRuntime, ContainerSpec, ExitStatus, Mount,
};
use crate::service::pull::pull_image;
use crate::service::relay::relay_lines;
use crate::service::script_file::ScriptFile;

/// Working directory of the job inside the container; the repository is mounted here
pub const WORKING_DIR: &str = "/tmp/repo";

/// Where the run's output goes
pub struct OutputSinks {
    /// Image pull progress
    pub progress: Box<dyn Write + Send>,
    /// Container stdout
    pub stdout: Box<dyn AsyncWrite + Send + Unpin>,
    /// Container stderr
    pub stderr: Box<dyn AsyncWrite + Send + Unpin>,
}

impl OutputSinks {
    /// The invoking process's own stdout and stderr
    pub fn stdio() -> Self {
        Self {
            progress: Box::new(std::io::stdout()),
            stdout: Box::new(tokio::io::stdout()),
            stderr: Box::new(tokio::io::stderr()),
        }
    }
}

/// Executes resolved jobs against a container runtime
pub struct JobExecutor {
    runtime: Arc<dyn ContainerRuntime>,
    config: Config,
    script_dir: PathBuf,
}

impl JobExecutor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: Config) -> Self {
        Self {
            runtime,
            config,
            script_dir: std::env::temp_dir(),
        }
    }

    /// Directory the generated script is written to (defaults to the system temp dir)
    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = dir.into();
        self
    }

    /// Image reference that will be pulled and run for a job
    pub fn image_for<'a>(&self, job: &'a ResolvedJob) -> Result<&'a str, JobError> {
        let image = job.require_image()?;
        Ok(strip_mirror(image, &self.config.docker.mirrors))
    }

    /// Runs a job with the repository at `repo` mounted as its working directory
    pub async fn run(
        &self,
        job: &ResolvedJob,
        repo: &Path,
        sinks: OutputSinks,
    ) -> Result<ExitStatus, JobError> {
        let image = self.image_for(job)?;

        let repo = std::fs::canonicalize(repo).map_err(|e| {
            JobError::io(
                format!("Repository directory {} is not accessible", repo.display()),
                e,
            )
        })?;

        pull_image(self.runtime.as_ref(), image, sinks.progress).await?;

        info!("Executing script from job {} ...", job.name);
        let script = ScriptFile::create_in(&self.script_dir, &assemble_script(job))?;

        info!("Preparing environment variables ...");
        let env = dedup_first_wins(&job.variables);
        for entry in &env {
            info!("set {}", entry);
        }

        let spec = ContainerSpec {
            name: container_name(&job.name),
            image: image.to_string(),
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                script.container_path().to_string(),
            ],
            env,
            working_dir: WORKING_DIR.to_string(),
            mounts: vec![
                Mount {
                    source: repo,
                    target: WORKING_DIR.to_string(),
                    read_only: false,
                },
                Mount {
                    source: script.host_path().to_path_buf(),
                    target: script.container_path().to_string(),
                    read_only: true,
                },
            ],
        };

        let handle = self
            .runtime
            .create_container(&spec)
            .await
            .map_err(JobError::Provision)?;

        let outcome = self.attach_and_wait(&handle, sinks.stdout, sinks.stderr).await;

        if let Err(e) = self.runtime.remove(&handle).await {
            warn!("Failed to remove container {}: {}", handle.name, e);
        }

        let status = outcome?;
        if !status.success() {
            return Err(JobError::ScriptFailed { code: status.code });
        }

        info!("Job {} completed successfully", job.name);
        Ok(status)
    }

    /// Starts the container, relays both streams concurrently and waits for exit
    async fn attach_and_wait(
        &self,
        handle: &ContainerHandle,
        mut stdout: Box<dyn AsyncWrite + Send + Unpin>,
        mut stderr: Box<dyn AsyncWrite + Send + Unpin>,
    ) -> Result<ExitStatus, JobError> {
        let AttachedOutput {
            stdout: container_stdout,
            stderr: container_stderr,
        } = self.runtime.start(handle).await.map_err(JobError::Run)?;

        let stdout_task =
            tokio::spawn(async move { relay_lines(container_stdout, &mut stdout).await });
        let stderr_task =
            tokio::spawn(async move { relay_lines(container_stderr, &mut stderr).await });

        let status = match self.runtime.wait(handle).await {
            Ok(status) => status,
            Err(e) => {
                stdout_task.abort();
                stderr_task.abort();
                return Err(JobError::Run(e));
            }
        };

        join_relay(stdout_task, "stdout").await?;
        join_relay(stderr_task, "stderr").await?;

        Ok(status)
    }
}

async fn join_relay(
    task: JoinHandle<std::io::Result<u64>>,
    stream: &str,
) -> Result<(), JobError> {
    let context = || format!("Failed to relay container {}", stream);

    match task.await {
        Ok(Ok(lines)) => {
            debug!("Relayed {} line(s) of {}", lines, stream);
            Ok(())
        }
        Ok(Err(e)) => Err(JobError::io(context(), e)),
        Err(e) => Err(JobError::io(context(), std::io::Error::other(e))),
    }
}

/// Container name for a job: `cilo-<job>-<random>`
///
/// Characters a container name cannot hold are replaced with `-`.
fn container_name(job: &str) -> String {
    let sanitized: String = job
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    let suffix = Uuid::new_v4().simple().to_string();

    if sanitized.is_empty() {
        format!("cilo-{}", &suffix[..8])
    } else {
        format!("cilo-{}-{}", sanitized, &suffix[..8])
    }
}
